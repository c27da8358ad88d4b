pub mod batch;
pub mod checks;
pub mod classifier;
pub mod cli;
pub mod fetch;
pub mod page;
pub mod record;
pub mod rules;

pub use classifier::Classifier;
pub use fetch::{BrowserFetcher, Fetcher};
pub use record::{CandidateRecord, PageSnapshot, Verdict, VerdictRecord};
pub use rules::RuleSet;
