//! Condition 1: the site must be school-level, not a college subsite.
//!
//! Two phases sharing one failure mode: the URL phase runs before any fetch
//! and looks for college path segments; the content phase runs on the fetched
//! page and looks for the college name dominating title or body.

use crate::page::PageFacts;
use crate::record::ConditionOutcome;
use crate::rules::RuleSet;

/// Body mentions of the college name above this count mark a college-scoped
/// page. Exclusive: exactly this many still passes.
const COLLEGE_MENTION_LIMIT: usize = 5;

/// URL phase: any configured college path segment in the lowercased URL fails.
pub fn check_url(rules: &RuleSet, url: &str) -> ConditionOutcome {
    let url_lower = url.to_lowercase();
    if let Some(pattern) = rules
        .patterns
        .college_paths
        .iter()
        .find(|p| url_lower.contains(p.as_str()))
    {
        return ConditionOutcome::fail(format!("URL包含学院路径特征: {}", pattern));
    }
    ConditionOutcome::pass("通过校级检查（URL无学院特征）")
}

/// Content phase: the college name in the title, or mentioned more than
/// [`COLLEGE_MENTION_LIMIT`] times in the body, marks a college page.
pub fn check_content(college: &str, facts: Option<&PageFacts>) -> ConditionOutcome {
    let facts = match facts {
        Some(facts) if !college.is_empty() => facts,
        _ => return ConditionOutcome::pass("通过校级检查（无需内容比对）"),
    };

    if facts.title.contains(college) {
        return ConditionOutcome::fail(format!("标题包含学院名: {}", facts.title));
    }

    let mentions = facts.body_text.matches(college).count();
    if mentions > COLLEGE_MENTION_LIMIT {
        return ConditionOutcome::fail(format!(
            "学院名在正文中出现{}次，疑似学院页面",
            mentions
        ));
    }

    ConditionOutcome::pass("通过校级检查（非学院页面）")
}
