use std::process;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use yanzhao_checker::batch::{self, ResultWriter, RunSummary};
use yanzhao_checker::classifier::Classifier;
use yanzhao_checker::cli::Cli;
use yanzhao_checker::fetch::BrowserFetcher;
use yanzhao_checker::record::{CandidateRecord, VerdictRecord};
use yanzhao_checker::rules::{ChinesePolicy, RuleSet, SchoolPolicy};

/// Set by the Ctrl+C handler; the batch loop checks it between records so the
/// browser session is released instead of being killed mid-fetch.
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(msg) = cli.validate() {
        eprintln!("错误: {}", msg);
        process::exit(2);
    }

    if cli.init {
        let path = RuleSet::create_default_rules().context("Failed to create default rule file")?;
        println!("已生成默认规则文件: {}", path.display());
        println!("编辑该文件调整规则表后重新运行。");
        return Ok(());
    }

    let mut rules = RuleSet::load(cli.rules.as_deref())?;
    apply_policy_overrides(&mut rules, &cli);

    let Some(input) = cli.input.as_ref() else {
        bail!("--input is required unless --init is given");
    };

    let candidates = batch::read_candidates(input)?;
    if candidates.is_empty() {
        bail!("输入文件中没有可处理的记录: {}", input.display());
    }
    info!("读取到 {} 条记录", candidates.len());

    ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst))
        .context("Failed to install Ctrl+C handler")?;

    let fetcher = BrowserFetcher::new(cli.max_retries);
    let mut classifier = Classifier::new(rules, fetcher);

    let progress = ProgressBar::new(candidates.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-"),
    );

    let mut csv_writer = match cli.format.as_str() {
        "csv" => Some(ResultWriter::create(&cli.output)?),
        _ => None,
    };
    let mut json_rows: Vec<(CandidateRecord, VerdictRecord)> = Vec::new();
    let mut summary = RunSummary::default();

    for record in &candidates {
        if INTERRUPTED.load(Ordering::SeqCst) {
            warn!("收到中断信号，提前结束批处理");
            break;
        }

        progress.set_message(record.school.clone());
        let verdict = classifier.classify(record);
        summary.record(&verdict);

        if let Some(writer) = csv_writer.as_mut() {
            writer.append(record, &verdict)?;
        } else {
            json_rows.push((record.clone(), verdict));
        }
        progress.inc(1);
    }
    progress.finish_and_clear();

    classifier.close();

    if cli.format == "json" {
        batch::export_json(&json_rows, &cli.output)?;
    }

    info!("判断完成，结果已保存至: {}", cli.output.display());
    summary.print();
    Ok(())
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "yanzhao_checker=info",
        1 => "yanzhao_checker=debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn apply_policy_overrides(rules: &mut RuleSet, cli: &Cli) {
    if let Some(policy) = cli.chinese_policy.as_deref() {
        rules.policy.chinese = match policy {
            "strict" => ChinesePolicy::Strict,
            _ => ChinesePolicy::Simplified,
        };
    }
    if let Some(policy) = cli.school_policy.as_deref() {
        rules.policy.school = match policy {
            "strict" => SchoolPolicy::Strict,
            _ => SchoolPolicy::Relaxed,
        };
    }
}
