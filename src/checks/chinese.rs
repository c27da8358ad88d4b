//! Condition 2: the site must be the Chinese-language admissions site, not an
//! English or international-student subsite.
//!
//! Two generations of the heuristic exist. The simplified policy (default)
//! only asks whether the title carries CJK characters. The strict policy is
//! the earlier, heavier rule: URL path markers, title English density,
//! international-admission keywords and the body CJK ratio.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::page::PageFacts;
use crate::record::ConditionOutcome;
use crate::rules::{ChinesePolicy, RuleSet};

static CJK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\u{4e00}-\u{9fff}]").expect("CJK character class compiles"));

/// English words whose presence marks a title as the English edition when
/// Latin characters already outnumber CJK ones.
const ENGLISH_TITLE_HINTS: [&str; 5] = [
    "graduate",
    "admission",
    "international",
    "students",
    "university",
];

/// Minimum share of CJK among word characters in the body (strict policy).
const BODY_CJK_RATIO: f64 = 0.6;

/// Leading span of body text scanned for international keywords, in
/// characters (strict policy).
const KEYWORD_SCAN_CHARS: usize = 500;

pub(crate) fn cjk_count(text: &str) -> usize {
    CJK_RE.find_iter(text).count()
}

pub fn check(rules: &RuleSet, url: &str, facts: Option<&PageFacts>) -> ConditionOutcome {
    match rules.policy.chinese {
        ChinesePolicy::Simplified => check_simplified(facts),
        ChinesePolicy::Strict => check_strict(rules, url, facts),
    }
}

fn check_simplified(facts: Option<&PageFacts>) -> ConditionOutcome {
    let Some(facts) = facts else {
        return ConditionOutcome::fail("无内容，无法判断语言");
    };

    if facts.title.is_empty() {
        return ConditionOutcome::fail("页面标题为空，无法确认中文站");
    }

    let cjk = cjk_count(&facts.title);
    if cjk == 0 {
        return ConditionOutcome::fail(format!("标题不含中文字符: {}", facts.title));
    }

    ConditionOutcome::pass(format!("通过中文检查（标题含{}个中文字符）", cjk))
}

fn check_strict(rules: &RuleSet, url: &str, facts: Option<&PageFacts>) -> ConditionOutcome {
    let url_lower = url.to_lowercase();
    if let Some(pattern) = rules
        .patterns
        .english_paths
        .iter()
        .find(|p| url_lower.contains(p.as_str()))
    {
        return ConditionOutcome::fail(format!("URL包含英文版特征: {}", pattern));
    }

    let Some(facts) = facts else {
        return ConditionOutcome::fail("无内容，无法判断语言");
    };

    if !facts.title.is_empty() {
        let cjk = cjk_count(&facts.title);
        let latin = facts
            .title
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .count();
        let title_lower = facts.title.to_lowercase();
        let hinted = ENGLISH_TITLE_HINTS.iter().any(|w| title_lower.contains(w));
        if latin > cjk && hinted {
            return ConditionOutcome::fail(format!("标题疑似英文版: {}", facts.title));
        }
    }

    let head: String = facts.body_text.chars().take(KEYWORD_SCAN_CHARS).collect();
    for keyword in &rules.patterns.international_keywords {
        if facts.title.contains(keyword.as_str()) || head.matches(keyword.as_str()).count() >= 2 {
            return ConditionOutcome::fail(format!(
                "疑似留学生/国际招生页面，包含关键词: {}",
                keyword
            ));
        }
    }

    let cjk_total = cjk_count(&facts.body_text);
    let word_total = facts
        .body_text
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_')
        .count();
    if word_total > 0 {
        let ratio = cjk_total as f64 / word_total as f64;
        if ratio < BODY_CJK_RATIO {
            return ConditionOutcome::fail(format!("中文内容占比过低: {:.0}%", ratio * 100.0));
        }
    }

    ConditionOutcome::pass("通过中文检查")
}
