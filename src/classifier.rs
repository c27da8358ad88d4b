//! Sequencing of the condition checks for one candidate record.
//!
//! Fixed, short-circuiting order: official-domain and URL-level college
//! checks run before any fetch (blacklisted or malformed URLs are never
//! visited), then the page is fetched once, the official check is repeated
//! against the post-redirect URL, and the content checks follow. Every
//! traversed state appends one labeled reason to the audit trail, so the
//! trail is a complete ordered log of the checks actually performed.

use tracing::{debug, info};

use crate::checks::{chinese, college, official, province, school};
use crate::fetch::Fetcher;
use crate::page;
use crate::record::{CandidateRecord, Verdict, VerdictRecord};
use crate::rules::RuleSet;

/// Failed-condition labels surfaced in the output file.
pub mod failure {
    pub const OFFICIAL: &str = "条件4：必须是官网";
    pub const OFFICIAL_AFTER_REDIRECT: &str = "条件4：跳转后非官网";
    pub const COLLEGE_URL: &str = "条件1：必须是校级（URL包含学院特征）";
    pub const COLLEGE_CONTENT: &str = "条件1：必须是校级（内容偏向学院）";
    pub const UNREACHABLE: &str = "无法访问网页";
    pub const CHINESE: &str = "条件2：必须是中文研招网";
    pub const SCHOOL: &str = "条件3：非目标院校";
    pub const PROVINCE: &str = "条件5：非目标省份";
    pub const PROVINCE_UNCERTAIN: &str = "条件5：无法确定省份";
}

pub struct Classifier<F: Fetcher> {
    rules: RuleSet,
    fetcher: F,
}

impl<F: Fetcher> Classifier<F> {
    pub fn new(rules: RuleSet, fetcher: F) -> Self {
        Self { rules, fetcher }
    }

    /// Classify one record. Never errors: every failure mode maps onto a
    /// verdict so one bad record cannot abort the batch.
    pub fn classify(&mut self, record: &CandidateRecord) -> VerdictRecord {
        info!("checking {} - {}", record.school, record.url);
        let mut trail: Vec<String> = Vec::new();

        let outcome = official::check(&self.rules, &record.url);
        trail.push(format!("[条件4-官网] {}", outcome.reason));
        if !outcome.passed {
            return VerdictRecord::no(record, failure::OFFICIAL, trail);
        }

        let outcome = college::check_url(&self.rules, &record.url);
        trail.push(format!("[条件1-URL层面] {}", outcome.reason));
        if !outcome.passed {
            return VerdictRecord::no(record, failure::COLLEGE_URL, trail);
        }

        let snapshot = self.fetcher.fetch(&record.url);
        if snapshot.status_code != 200 {
            trail.push(format!("[网页访问] 失败 (状态码: {})", snapshot.status_code));
            // A page we could not retrieve is not evidence against the
            // school.
            return VerdictRecord::uncertain(record, failure::UNREACHABLE, trail);
        }
        trail.push("[网页访问] 成功".to_string());

        if snapshot.final_url != record.url {
            trail.push(format!("[URL跳转] {} -> {}", record.url, snapshot.final_url));
            let outcome = official::check(&self.rules, &snapshot.final_url);
            if !outcome.passed {
                trail.push(format!("[条件4-官网] {}", outcome.reason));
                return VerdictRecord::no(record, failure::OFFICIAL_AFTER_REDIRECT, trail);
            }
        }

        let facts = page::extract(&snapshot.html);

        let outcome = chinese::check(&self.rules, &snapshot.final_url, Some(&facts));
        trail.push(format!("[条件2-中文] {}", outcome.reason));
        if !outcome.passed {
            return VerdictRecord::no(record, failure::CHINESE, trail);
        }

        let outcome = school::check(&self.rules, &record.school, Some(&facts));
        trail.push(format!("[条件3-目标学校] {}", outcome.reason));
        if !outcome.passed {
            return VerdictRecord::no(record, failure::SCHOOL, trail);
        }

        let outcome = college::check_content(&record.college, Some(&facts));
        trail.push(format!("[条件1-内容层面] {}", outcome.reason));
        if !outcome.passed {
            return VerdictRecord::no(record, failure::COLLEGE_CONTENT, trail);
        }

        if self.rules.is_multi_campus(&record.school) && !record.province.trim().is_empty() {
            let (verdict, reason) = province::check(&self.rules, &record.province, &facts);
            trail.push(format!("[条件5-省份] {}", reason));
            match verdict {
                Verdict::Yes => {}
                Verdict::No => return VerdictRecord::no(record, failure::PROVINCE, trail),
                Verdict::Uncertain => {
                    return VerdictRecord::uncertain(record, failure::PROVINCE_UNCERTAIN, trail)
                }
            }
        }

        debug!("all checks passed for {}", record.url);
        VerdictRecord::yes(record, trail)
    }

    /// Release the fetcher's resources. The caller invokes this once per
    /// batch; `Drop` on the underlying session is the backstop for early
    /// exits.
    pub fn close(&mut self) {
        self.fetcher.close();
    }
}
