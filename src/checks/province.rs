//! Condition 5: multi-campus disambiguation via the footer address.
//!
//! Only invoked for schools on the multi-campus list when the input names a
//! target province. The footer is scanned for address introducers; the
//! captured stretches are matched against every province's multi-character
//! variant spellings. Unlike the other checks this one is ternary: an
//! ambiguous address is neither a pass nor a fail.

use crate::page::PageFacts;
use crate::record::Verdict;
use crate::rules::RuleSet;

/// Address introducers, tried in this order.
const ADDRESS_INTRODUCERS: [&str; 3] = ["地址:", "地址：", "Address:"];

/// Captured stretch after an introducer, in characters.
const ADDRESS_MIN_CHARS: usize = 10;
const ADDRESS_MAX_CHARS: usize = 100;

pub fn check(rules: &RuleSet, target_province: &str, facts: &PageFacts) -> (Verdict, String) {
    let target = normalize_target(target_province);
    let candidates = address_candidates(&facts.footer_text);

    let mut found: Vec<&str> = Vec::new();
    for candidate in &candidates {
        for province in rules.provinces.keys() {
            if found.iter().any(|p| *p == province.as_str()) {
                continue;
            }
            if rules
                .matchable_variants(province)
                .any(|variant| candidate.contains(variant))
            {
                found.push(province);
            }
        }
    }

    match found.as_slice() {
        [] => (Verdict::Uncertain, "无法确定省份".to_string()),
        [only] if *only == target => (
            Verdict::Yes,
            format!("地址省份与目标省份一致（{}）", only),
        ),
        [only] => (
            Verdict::No,
            format!("地址省份为{}，与目标省份{}不一致", only, target),
        ),
        _ if found.iter().any(|p| *p == target) => (
            Verdict::Uncertain,
            format!("地址涉及多个省份（{}），无法确定主校区", found.join("、")),
        ),
        _ => (
            Verdict::No,
            format!(
                "地址涉及省份（{}），均非目标省份{}",
                found.join("、"),
                target
            ),
        ),
    }
}

/// Strip administrative suffixes so "湖北省" and "北京市" hit the bare table
/// keys.
fn normalize_target(province: &str) -> &str {
    province
        .trim()
        .trim_end_matches("自治区")
        .trim_end_matches('省')
        .trim_end_matches('市')
}

/// Stretches of footer text following an address introducer. With no
/// introducer present, the whole footer is the single candidate.
fn address_candidates(footer: &str) -> Vec<String> {
    let mut candidates = Vec::new();
    for introducer in ADDRESS_INTRODUCERS {
        for (index, _) in footer.match_indices(introducer) {
            let tail = footer[index + introducer.len()..].trim_start();
            let captured: String = tail.chars().take(ADDRESS_MAX_CHARS).collect();
            if captured.chars().count() >= ADDRESS_MIN_CHARS {
                candidates.push(captured);
            }
        }
    }
    if candidates.is_empty() {
        candidates.push(footer.to_string());
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::PageFacts;
    use crate::rules::{RuleSet, DEFAULT_RULES};

    fn rules() -> RuleSet {
        toml::from_str(DEFAULT_RULES).unwrap()
    }

    fn facts_with_footer(footer: &str) -> PageFacts {
        PageFacts {
            title: "研究生招生信息网".to_string(),
            body_text: String::new(),
            footer_text: footer.to_string(),
        }
    }

    #[test]
    fn test_single_matching_province_confirms() {
        let facts = facts_with_footer("地址：湖北省武汉市洪山区鲁磨路388号 邮编430074");
        let (verdict, reason) = check(&rules(), "湖北", &facts);
        assert_eq!(verdict, Verdict::Yes, "{}", reason);
    }

    #[test]
    fn test_single_different_province_rejects() {
        let facts = facts_with_footer("地址：北京市海淀区学院路29号 邮编100083");
        let (verdict, reason) = check(&rules(), "湖北", &facts);
        assert_eq!(verdict, Verdict::No, "{}", reason);
        assert!(reason.contains("北京"));
    }

    #[test]
    fn test_two_provinces_including_target_is_uncertain() {
        let facts = facts_with_footer(
            "地址：湖北省武汉市洪山区鲁磨路388号；北京市海淀区学院路29号",
        );
        let (verdict, reason) = check(&rules(), "湖北", &facts);
        assert_eq!(verdict, Verdict::Uncertain, "{}", reason);
        assert!(reason.contains("多个省份"));
    }

    #[test]
    fn test_two_provinces_excluding_target_rejects() {
        let facts = facts_with_footer(
            "地址：北京市海淀区学院路29号；江苏省徐州市大学路1号",
        );
        let (verdict, reason) = check(&rules(), "湖北", &facts);
        assert_eq!(verdict, Verdict::No, "{}", reason);
    }

    #[test]
    fn test_no_province_found_is_uncertain() {
        let facts = facts_with_footer("版权所有 研究生院 鄂ICP备05003325号");
        let (verdict, reason) = check(&rules(), "湖北", &facts);
        // 鄂 is a single-character abbreviation and must not match the
        // ICP filing code.
        assert_eq!(verdict, Verdict::Uncertain, "{}", reason);
        assert_eq!(reason, "无法确定省份");
    }

    #[test]
    fn test_whole_footer_used_when_no_introducer() {
        let facts = facts_with_footer("版权所有 武汉市洪山区某大学研究生院");
        let (verdict, reason) = check(&rules(), "湖北", &facts);
        assert_eq!(verdict, Verdict::Yes, "{}", reason);
    }

    #[test]
    fn test_capital_city_variant_matches_province() {
        let facts = facts_with_footer("地址：哈尔滨市南岗区西大直街92号 邮编150001");
        let (verdict, reason) = check(&rules(), "黑龙江", &facts);
        assert_eq!(verdict, Verdict::Yes, "{}", reason);
    }

    #[test]
    fn test_suffixed_target_is_normalized() {
        let facts = facts_with_footer("地址：湖北省武汉市洪山区鲁磨路388号");
        let (verdict, reason) = check(&rules(), "湖北省", &facts);
        assert_eq!(verdict, Verdict::Yes, "{}", reason);
    }

    #[test]
    fn test_address_candidates_capture_after_each_introducer() {
        let footer = "地址：湖北省武汉市洪山区鲁磨路388号 其他文字 Address: 29 Xueyuan Road, Beijing, China";
        let candidates = address_candidates(footer);
        assert_eq!(candidates.len(), 2);
        assert!(candidates[0].starts_with("湖北省"));
        assert!(candidates[1].starts_with("29 Xueyuan"));
    }

    #[test]
    fn test_address_candidates_fall_back_to_whole_footer() {
        let footer = "武汉市洪山区某大学";
        let candidates = address_candidates(footer);
        assert_eq!(candidates, vec![footer.to_string()]);
    }

    #[test]
    fn test_short_tail_after_introducer_falls_back() {
        // Fewer than 10 characters follow the introducer, so the capture is
        // discarded and the whole footer becomes the candidate.
        let footer = "地址：武汉市";
        let candidates = address_candidates(footer);
        assert_eq!(candidates, vec![footer.to_string()]);
    }
}
