//! Condition 3: the site must belong to the named school, not a different one.
//!
//! The relaxed policy (default) accepts a title match or a single body
//! mention. The strict policy is the earlier generation: three body mentions,
//! or one mention backed by the title; a title-only match with a silent body
//! is rejected.

use crate::page::PageFacts;
use crate::record::ConditionOutcome;
use crate::rules::{RuleSet, SchoolPolicy};

/// Body mentions that satisfy the strict policy on their own.
const STRICT_BODY_MENTIONS: usize = 3;

/// School name with the institution-type suffixes removed, e.g.
/// "北京大学" → "北京". Used as a secondary title probe.
fn short_form(school: &str) -> String {
    school
        .replace("大学", "")
        .replace("学院", "")
        .replace("学校", "")
}

pub fn check(rules: &RuleSet, school: &str, facts: Option<&PageFacts>) -> ConditionOutcome {
    let Some(facts) = facts else {
        return ConditionOutcome::fail("无法获取网页内容，无法验证学校");
    };

    let short = short_form(school);
    let title_has_school = facts.title.contains(school)
        || (!short.is_empty() && facts.title.contains(short.as_str()));
    let mentions = facts.body_text.matches(school).count();

    match rules.policy.school {
        SchoolPolicy::Relaxed => {
            if title_has_school {
                return ConditionOutcome::pass("通过目标学校验证（标题包含学校名）");
            }
            if mentions >= 1 {
                return ConditionOutcome::pass(format!(
                    "通过目标学校验证（正文中学校名出现{}次）",
                    mentions
                ));
            }
            ConditionOutcome::fail(format!(
                "学校名称在正文中出现0次，且标题未包含学校名: {}",
                facts.title
            ))
        }
        SchoolPolicy::Strict => {
            if mentions >= STRICT_BODY_MENTIONS {
                return ConditionOutcome::pass(format!(
                    "通过目标学校验证（正文中学校名出现{}次）",
                    mentions
                ));
            }
            if mentions >= 1 && title_has_school {
                return ConditionOutcome::pass(format!(
                    "通过目标学校验证（标题+正文共同验证，正文出现{}次）",
                    mentions
                ));
            }
            if title_has_school && mentions == 0 {
                return ConditionOutcome::fail("标题包含学校名，但正文中未出现学校名称");
            }
            ConditionOutcome::fail(format!(
                "学校名称在正文中仅出现{}次，且标题未包含学校名: {}",
                mentions, facts.title
            ))
        }
    }
}
