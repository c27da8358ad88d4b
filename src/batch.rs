//! Input/output glue around the classifier.
//!
//! Supports:
//! - CSV input with a 省份/学校/学院/URL header or the same four columns
//!   headerless
//! - UTF-8 byte-order marks on input, and a BOM on CSV output so the
//!   Chinese columns open cleanly in Excel
//! - Row-at-a-time result writing (a mid-batch abort keeps completed work)
//! - A per-run statistics block printed at the end

use anyhow::{Context, Result};
use csv::{ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::warn;

use crate::record::{CandidateRecord, Verdict, VerdictRecord};

pub const OUTPUT_HEADERS: [&str; 7] = [
    "省份",
    "学校",
    "学院",
    "URL",
    "判断结果",
    "未通过的条件",
    "详细原因",
];

/// Read and parse the input file. This is the only batch-fatal error source:
/// everything after it degrades per record.
pub fn read_candidates(path: &Path) -> Result<Vec<CandidateRecord>> {
    let raw = fs::read_to_string(path)
        .context(format!("Failed to read input file: {}", path.display()))?;
    let content = raw.strip_prefix('\u{feff}').unwrap_or(&raw);
    parse_candidates(content)
}

/// Parse CSV content into candidate records. The first line is treated as a
/// header when it carries the 省份 column name; otherwise the four columns
/// are taken positionally.
pub fn parse_candidates(content: &str) -> Result<Vec<CandidateRecord>> {
    let has_header = content
        .lines()
        .next()
        .map_or(false, |line| line.contains("省份"));

    let mut reader = ReaderBuilder::new()
        .has_headers(has_header)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let row = result.context("Failed to parse CSV record")?;
        let field = |i: usize| row.get(i).map(str::trim).unwrap_or("").to_string();

        let record = CandidateRecord {
            province: field(0),
            school: field(1),
            college: field(2),
            url: field(3),
        };

        if record.url.is_empty() {
            warn!("skipping row {}: no URL", index + 1);
            continue;
        }
        records.push(record);
    }

    Ok(records)
}

/// CSV result writer, flushed after every row.
pub struct ResultWriter {
    writer: csv::Writer<fs::File>,
}

impl ResultWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let mut file = fs::File::create(path)
            .context(format!("Failed to create output file: {}", path.display()))?;
        file.write_all("\u{feff}".as_bytes())?;

        let mut writer = WriterBuilder::new().from_writer(file);
        writer.write_record(OUTPUT_HEADERS)?;
        writer.flush()?;

        Ok(Self { writer })
    }

    pub fn append(&mut self, record: &CandidateRecord, verdict: &VerdictRecord) -> Result<()> {
        let verdict_text = verdict.verdict.to_string();
        let reasons = verdict.joined_reasons();
        self.writer.write_record([
            record.province.as_str(),
            record.school.as_str(),
            record.college.as_str(),
            record.url.as_str(),
            verdict_text.as_str(),
            verdict.failed_condition.as_str(),
            reasons.as_str(),
        ])?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonRow<'a> {
    province: &'a str,
    school: &'a str,
    college: &'a str,
    url: &'a str,
    verdict: Verdict,
    failed_condition: &'a str,
    reasons: &'a [String],
}

/// Pretty-printed JSON export of the whole result list.
pub fn export_json(results: &[(CandidateRecord, VerdictRecord)], path: &Path) -> Result<()> {
    let rows: Vec<JsonRow<'_>> = results
        .iter()
        .map(|(record, verdict)| JsonRow {
            province: &record.province,
            school: &record.school,
            college: &record.college,
            url: &record.url,
            verdict: verdict.verdict,
            failed_condition: &verdict.failed_condition,
            reasons: &verdict.reasons,
        })
        .collect();

    let json = serde_json::to_string_pretty(&rows).context("Failed to serialize results")?;
    fs::write(path, json)
        .context(format!("Failed to write results to: {}", path.display()))?;
    Ok(())
}

/// Per-run counters, printed as the closing statistics block.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub total: usize,
    pub yes: usize,
    pub no: usize,
    pub uncertain: usize,
    /// Failed-condition histogram over 否 records.
    pub failed_conditions: BTreeMap<String, usize>,
}

impl RunSummary {
    pub fn record(&mut self, verdict: &VerdictRecord) {
        self.total += 1;
        match verdict.verdict {
            Verdict::Yes => self.yes += 1,
            Verdict::No => {
                self.no += 1;
                *self
                    .failed_conditions
                    .entry(verdict.failed_condition.clone())
                    .or_insert(0) += 1;
            }
            Verdict::Uncertain => self.uncertain += 1,
        }
    }

    pub fn print(&self) {
        if self.total == 0 {
            return;
        }

        let percent = |count: usize| count as f64 / self.total as f64 * 100.0;

        println!("\n=== 判断结果统计 ===");
        println!("是: {} 条 ({:.1}%)", self.yes, percent(self.yes));
        println!("否: {} 条 ({:.1}%)", self.no, percent(self.no));
        println!("不确定: {} 条 ({:.1}%)", self.uncertain, percent(self.uncertain));

        if !self.failed_conditions.is_empty() {
            println!("\n【未通过条件统计】");
            for (condition, count) in &self.failed_conditions {
                println!("  {}: {} 条", condition, count);
            }
        }
        println!("====================\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ============ Input Parsing Tests ============

    #[test]
    fn test_parse_headered_csv() {
        let content = "省份,学校,学院,URL\n北京,北京大学,,https://yzb.pku.edu.cn\n湖北,武汉大学,文学院,https://gs.whu.edu.cn";
        let records = parse_candidates(content).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].province, "北京");
        assert_eq!(records[0].school, "北京大学");
        assert_eq!(records[0].college, "");
        assert_eq!(records[0].url, "https://yzb.pku.edu.cn");
        assert_eq!(records[1].college, "文学院");
    }

    #[test]
    fn test_parse_headerless_csv() {
        let content = "北京,北京大学,,https://yzb.pku.edu.cn";
        let records = parse_candidates(content).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].school, "北京大学");
    }

    #[test]
    fn test_parse_strips_byte_order_mark() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        fs::write(
            &path,
            "\u{feff}省份,学校,学院,URL\n北京,北京大学,,https://yzb.pku.edu.cn",
        )
        .unwrap();

        let records = read_candidates(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].province, "北京");
    }

    #[test]
    fn test_parse_skips_rows_without_url() {
        let content = "省份,学校,学院,URL\n北京,北京大学,,https://yzb.pku.edu.cn\n湖北,武汉大学,,";
        let records = parse_candidates(content).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_parse_trims_whitespace() {
        let content = "北京 , 北京大学 ,, https://yzb.pku.edu.cn ";
        let records = parse_candidates(content).unwrap();
        assert_eq!(records[0].province, "北京");
        assert_eq!(records[0].url, "https://yzb.pku.edu.cn");
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(parse_candidates("").unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_rows_kept() {
        let content = "北京,北京大学,,https://yzb.pku.edu.cn\n北京,北京大学,,https://yzb.pku.edu.cn";
        let records = parse_candidates(content).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], records[1]);
    }

    // ============ Output Tests ============

    fn sample_pair() -> (CandidateRecord, VerdictRecord) {
        let record = CandidateRecord {
            province: "北京".to_string(),
            school: "北京大学".to_string(),
            college: String::new(),
            url: "https://yzb.pku.edu.cn".to_string(),
        };
        let verdict = VerdictRecord::yes(&record, vec!["[条件4-官网] 通过官网验证".to_string()]);
        (record, verdict)
    }

    #[test]
    fn test_csv_output_has_bom_header_and_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");

        let (record, verdict) = sample_pair();
        let mut writer = ResultWriter::create(&path).unwrap();
        writer.append(&record, &verdict).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with('\u{feff}'));
        let mut lines = content.trim_start_matches('\u{feff}').lines();
        assert_eq!(lines.next().unwrap(), OUTPUT_HEADERS.join(","));
        let row = lines.next().unwrap();
        assert!(row.contains("是"));
        assert!(row.contains("https://yzb.pku.edu.cn"));
    }

    #[test]
    fn test_json_export_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        export_json(&[sample_pair()], &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value[0]["verdict"], "是");
        assert_eq!(value[0]["school"], "北京大学");
        assert_eq!(value[0]["failed_condition"], "");
    }

    // ============ Summary Tests ============

    #[test]
    fn test_summary_counts_and_histogram() {
        let record = CandidateRecord {
            province: String::new(),
            school: "某大学".to_string(),
            college: String::new(),
            url: "https://x.example.edu.cn".to_string(),
        };

        let mut summary = RunSummary::default();
        summary.record(&VerdictRecord::yes(&record, vec![]));
        summary.record(&VerdictRecord::no(&record, "条件4：必须是官网", vec![]));
        summary.record(&VerdictRecord::no(&record, "条件4：必须是官网", vec![]));
        summary.record(&VerdictRecord::uncertain(&record, "无法访问网页", vec![]));

        assert_eq!(summary.total, 4);
        assert_eq!(summary.yes, 1);
        assert_eq!(summary.no, 2);
        assert_eq!(summary.uncertain, 1);
        assert_eq!(summary.failed_conditions["条件4：必须是官网"], 2);
        // Uncertain records stay out of the failure histogram.
        assert_eq!(summary.failed_conditions.len(), 1);
    }
}
