//! Rule tables driving the condition checks.
//!
//! All classification vocabulary (path patterns, keyword lists, the
//! third-party blacklist, the multi-campus school list and the province
//! variant map) is loaded from `./config/rules.toml` and treated as
//! read-only for the whole run. The default tables are embedded in the
//! binary so the tool works without a config directory.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Rule file path relative to the working directory.
pub const RULES_PATH: &str = "./config/rules.toml";

/// Default rule tables shipped with the binary.
pub const DEFAULT_RULES: &str = include_str!("../config/rules.toml");

#[derive(Error, Debug)]
pub enum RulesError {
    #[error("Rules file not found at {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to read rules file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse rules file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Rule table '{0}' cannot be empty")]
    EmptyTable(&'static str),

    #[error("Province '{province}' has no multi-character variant; single-character spellings are never matched")]
    NoUsableVariant { province: String },
}

/// Which generation of the Chinese-language heuristic to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChinesePolicy {
    /// Title must contain at least one CJK character.
    Simplified,
    /// URL path markers, title English density, international keywords and
    /// the body CJK ratio all weigh in.
    Strict,
}

/// Which generation of the target-school heuristic to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchoolPolicy {
    /// Title match or a single body mention suffices.
    Relaxed,
    /// Three body mentions, or one mention plus a title match.
    Strict,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_chinese_policy")]
    pub chinese: ChinesePolicy,
    #[serde(default = "default_school_policy")]
    pub school: SchoolPolicy,
}

fn default_chinese_policy() -> ChinesePolicy {
    ChinesePolicy::Simplified
}

fn default_school_policy() -> SchoolPolicy {
    SchoolPolicy::Relaxed
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            chinese: default_chinese_policy(),
            school: default_school_policy(),
        }
    }
}

/// Pattern and keyword tables consumed by the condition checks.
#[derive(Debug, Clone, Deserialize)]
pub struct PatternTables {
    pub college_paths: Vec<String>,
    pub english_paths: Vec<String>,
    pub international_keywords: Vec<String>,
    pub third_party_domains: Vec<String>,
    pub multi_campus_schools: Vec<String>,
}

/// The complete, immutable rule set for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleSet {
    #[serde(default)]
    pub policy: PolicyConfig,
    pub patterns: PatternTables,
    /// Province name → variant spellings (bare name, suffixed name, capital
    /// city, capital city with 市, single-character abbreviation).
    pub provinces: BTreeMap<String, Vec<String>>,
}

impl RuleSet {
    /// Load rules from an explicit path, from `./config/rules.toml` if it
    /// exists, or from the embedded defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, RulesError> {
        let content = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(RulesError::FileNotFound(p.to_path_buf()));
                }
                fs::read_to_string(p)?
            }
            None => {
                let default_path = Path::new(RULES_PATH);
                if default_path.exists() {
                    fs::read_to_string(default_path)?
                } else {
                    DEFAULT_RULES.to_string()
                }
            }
        };

        let rules: RuleSet = toml::from_str(&content)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Reject rule sets the checks cannot work with.
    pub fn validate(&self) -> Result<(), RulesError> {
        if self.patterns.college_paths.is_empty() {
            return Err(RulesError::EmptyTable("patterns.college_paths"));
        }
        if self.patterns.english_paths.is_empty() {
            return Err(RulesError::EmptyTable("patterns.english_paths"));
        }
        if self.patterns.international_keywords.is_empty() {
            return Err(RulesError::EmptyTable("patterns.international_keywords"));
        }
        if self.patterns.third_party_domains.is_empty() {
            return Err(RulesError::EmptyTable("patterns.third_party_domains"));
        }
        if self.provinces.is_empty() {
            return Err(RulesError::EmptyTable("provinces"));
        }

        for (province, variants) in &self.provinces {
            if !variants.iter().any(|v| v.chars().count() > 1) {
                return Err(RulesError::NoUsableVariant {
                    province: province.clone(),
                });
            }
        }

        Ok(())
    }

    /// Write the embedded default tables to the standard location.
    pub fn create_default_rules() -> Result<PathBuf, RulesError> {
        let path = Path::new(RULES_PATH);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut file = fs::File::create(path)?;
        file.write_all(DEFAULT_RULES.as_bytes())?;

        Ok(path.to_path_buf())
    }

    /// Whether the school name names (or is a campus of) a configured
    /// multi-campus university.
    pub fn is_multi_campus(&self, school: &str) -> bool {
        self.patterns
            .multi_campus_schools
            .iter()
            .any(|name| school.contains(name.as_str()))
    }

    /// Variant spellings usable for address matching. Single-character
    /// abbreviations stay out: ICP filing codes and similar short substrings
    /// would otherwise false-match.
    pub fn matchable_variants(&self, province: &str) -> impl Iterator<Item = &str> {
        self.provinces
            .get(province)
            .into_iter()
            .flatten()
            .map(String::as_str)
            .filter(|v| v.chars().count() > 1)
    }
}
