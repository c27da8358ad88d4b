use clap::Parser;
use std::path::PathBuf;

use crate::fetch;

#[derive(Parser, Debug)]
#[command(name = "yanzhao-checker")]
#[command(about = "Strict batch verifier for official school-level graduate admissions websites")]
#[command(version)]
pub struct Cli {
    /// Create a default rule file at ./config/rules.toml and exit
    #[arg(long)]
    pub init: bool,

    /// Input CSV with 省份,学校,学院,URL columns (header optional, BOM tolerated)
    #[arg(short, long, required_unless_present = "init")]
    pub input: Option<PathBuf>,

    /// Output file for the verdicts
    #[arg(short, long, default_value = "判断结果.csv")]
    pub output: PathBuf,

    /// Output format: 'csv' (default) or 'json'
    #[arg(short = 'f', long, default_value = "csv")]
    pub format: String,

    /// Alternate rule file (defaults to ./config/rules.toml, falling back to
    /// the embedded tables)
    #[arg(long)]
    pub rules: Option<PathBuf>,

    /// Maximum fetch attempts per URL
    #[arg(long, default_value_t = fetch::DEFAULT_MAX_RETRIES)]
    pub max_retries: u32,

    /// Override the Chinese-language policy from the rule file:
    /// 'simplified' or 'strict'
    #[arg(long, value_name = "POLICY")]
    pub chinese_policy: Option<String>,

    /// Override the target-school policy from the rule file:
    /// 'relaxed' or 'strict'
    #[arg(long, value_name = "POLICY")]
    pub school_policy: Option<String>,

    /// Verbose logging (use -v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn validate(&self) -> Result<(), String> {
        if !["csv", "json"].contains(&self.format.as_str()) {
            return Err("Output format must be 'csv' or 'json'".to_string());
        }

        if self.max_retries == 0 {
            return Err("Max retries must be greater than 0".to_string());
        }

        if let Some(policy) = &self.chinese_policy {
            if !["simplified", "strict"].contains(&policy.as_str()) {
                return Err("Chinese policy must be 'simplified' or 'strict'".to_string());
            }
        }

        if let Some(policy) = &self.school_policy {
            if !["relaxed", "strict"].contains(&policy.as_str()) {
                return Err("School policy must be 'relaxed' or 'strict'".to_string());
            }
        }

        Ok(())
    }
}
