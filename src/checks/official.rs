//! Condition 4: the site must be the school's own, not a third party.
//!
//! Runs twice per record: on the original URL before any fetch (blacklisted
//! or malformed URLs are never visited) and on the post-redirect URL, because
//! a school's own domain may forward to a disallowed one.

use url::Url;

use crate::record::ConditionOutcome;
use crate::rules::RuleSet;

pub fn check(rules: &RuleSet, raw_url: &str) -> ConditionOutcome {
    let host = match Url::parse(raw_url) {
        Ok(parsed) => match parsed.host_str() {
            Some(host) => host.to_lowercase(),
            None => return ConditionOutcome::fail(format!("URL缺少主机名: {}", raw_url)),
        },
        // Malformed input degrades to a failed check, never an error.
        Err(e) => return ConditionOutcome::fail(format!("URL解析失败: {}", e)),
    };

    // Blacklist first: a known aggregator should be called out as such even
    // when its host would also fail the .edu.cn test.
    if let Some(third_party) = rules
        .patterns
        .third_party_domains
        .iter()
        .find(|domain| host.contains(domain.as_str()))
    {
        return ConditionOutcome::fail(format!("第三方网站: {}（命中 {}）", host, third_party));
    }

    if !host.ends_with(".edu.cn") {
        return ConditionOutcome::fail(format!("非.edu.cn域名: {}", host));
    }

    ConditionOutcome::pass(format!("通过官网验证（{}）", host))
}
