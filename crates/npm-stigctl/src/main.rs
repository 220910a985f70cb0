//! npm-stigctl — STIG library indexing and ad-hoc compliance evaluation CLI.
//!
//! A small clap-driven utility wrapping `npm-core`'s STIG engine — a thin inspection tool over
//! the core library. `evaluate` runs on a tokio runtime only because persisting results touches
//! the async Postgres pool; `index` never needs it.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use npm_core::stig::indexer;

#[derive(Parser)]
#[command(name = "npm-stigctl", about = "STIG library indexer and compliance evaluator", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Increase logging verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors.
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Rescan a directory of STIG/SRG zips and (re)write the JSON catalogue cache.
    Index {
        /// Directory containing `*.zip` STIG/SRG benchmarks.
        library_path: PathBuf,

        /// Rescan even if a cache file already exists.
        #[arg(long)]
        force_rescan: bool,

        /// Print the catalogue as JSON instead of a summary table.
        #[arg(long)]
        json: bool,
    },
    /// Evaluate one STIG/SRG benchmark's rules against a JunOS configuration file.
    Evaluate {
        /// Path to the benchmark's ZIP+XCCDF archive.
        zip: PathBuf,

        /// Path to a JunOS configuration text file.
        config: PathBuf,

        /// Print results as JSON instead of a summary table.
        #[arg(long)]
        json: bool,

        /// Postgres connection string. When set, the job and its per-rule results are persisted
        /// to `stig.targets`/`stig.audit_jobs`/`stig.audit_results`; omit for a print-only run.
        #[arg(long, env = "NPM_DATABASE_URL")]
        database_url: Option<String>,

        /// Max connections held in the pool, if `--database-url` is set.
        #[arg(long, env = "NPM_DB_POOL_SIZE", default_value_t = 5)]
        pool_size: usize,
    },
}

fn main() {
    let cli = Cli::parse();
    npm_core::config::init_logging(cli.verbose, cli.quiet);

    let result = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
        .block_on(async move {
            match cli.command {
                Command::Index { library_path, force_rescan, json } => run_index(&library_path, force_rescan, json),
                Command::Evaluate { zip, config, json, database_url, pool_size } => {
                    run_evaluate(&zip, &config, json, database_url.as_deref(), pool_size).await
                }
            }
        });

    if let Err(e) = result {
        tracing::error!(error = %e, "command failed");
        std::process::exit(1);
    }
}

fn run_index(library_path: &std::path::Path, force_rescan: bool, json: bool) -> Result<(), String> {
    let catalog = indexer::get_or_scan(library_path, force_rescan).map_err(|e| e.to_string())?;

    if json {
        let body = serde_json::to_string_pretty(&SerializableCatalog(&catalog)).map_err(|e| e.to_string())?;
        println!("{body}");
        return Ok(());
    }

    println!("{} benchmark(s) indexed under {}", catalog.len(), library_path.display());
    for entry in catalog.entries() {
        let platforms = entry
            .platforms
            .iter()
            .map(|p| format!("{p:?}"))
            .collect::<Vec<_>>()
            .join(",");
        println!(
            "  {:<28} v{:<6} rel.{:<4} rules={:<5} high={:<4} platforms=[{}]",
            entry.benchmark_id, entry.version, entry.release, entry.rules_count, entry.high_count, platforms
        );
    }
    Ok(())
}

async fn run_evaluate(
    zip: &std::path::Path,
    config: &std::path::Path,
    json: bool,
    database_url: Option<&str>,
    pool_size: usize,
) -> Result<(), String> {
    let (entry, rules) = indexer::parse_zip(zip).map_err(|e| e.to_string())?;
    let config_text = std::fs::read_to_string(config).map_err(|e| e.to_string())?;

    let results = npm_core::stig::audit_config(&config_text, &rules);

    if let Some(database_url) = database_url {
        persist_audit_run(database_url, pool_size, config, &entry, &results).await?;
    }

    if json {
        let body = serde_json::to_string_pretty(&SerializableResults(&results)).map_err(|e| e.to_string())?;
        println!("{body}");
        return Ok(());
    }

    let pass = results.iter().filter(|r| matches!(r.status, npm_core::stig::evaluator::CheckStatus::Pass)).count();
    let fail = results.iter().filter(|r| matches!(r.status, npm_core::stig::evaluator::CheckStatus::Fail)).count();
    println!("{} ({} rules): {} pass, {} fail, {} other", entry.benchmark_id, results.len(), pass, fail, results.len() - pass - fail);
    for r in &results {
        println!("  [{}] {:<12} {} — {}", npm_core::stig::status_str(r.status), r.severity, r.rule_id, r.title);
    }
    Ok(())
}

/// Records the evaluate run as a completed `stig.audit_jobs` row with one `stig.audit_results`
/// row per rule, keyed under a `stig.targets` row named for the config file evaluated.
async fn persist_audit_run(
    database_url: &str,
    pool_size: usize,
    config: &std::path::Path,
    entry: &indexer::StigEntry,
    results: &[npm_core::stig::AuditResult],
) -> Result<(), String> {
    let pool = npm_core::db::build_pool(database_url, pool_size).map_err(|e| e.to_string())?;
    let repo = npm_core::db::StigRepo::new(pool);

    let target_name = format!("{}:{}", entry.benchmark_id, config.display());
    let platform = entry.platforms.first().map(|p| format!("{p:?}")).unwrap_or_else(|| "Other".to_string());
    let target_id = repo
        .get_or_create_target(&target_name, "0.0.0.0", &platform, "config")
        .await
        .map_err(|e| e.to_string())?;

    let started_at = chrono::Utc::now();
    let job_id = repo.record_audit_job(target_id, started_at).await.map_err(|e| e.to_string())?;

    for r in results {
        repo.record_audit_result(job_id, &r.rule_id, npm_core::stig::status_str(r.status), &r.finding)
            .await
            .map_err(|e| e.to_string())?;
    }

    repo.complete_audit_job(job_id, chrono::Utc::now()).await.map_err(|e| e.to_string())?;
    tracing::info!(job_id = %job_id, target = %target_name, rules = results.len(), "persisted audit job");
    Ok(())
}

struct SerializableCatalog<'a>(&'a indexer::StigCatalog);

impl serde::Serialize for SerializableCatalog<'_> {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&self.0.entries().collect::<Vec<_>>(), s)
    }
}

struct SerializableResults<'a>(&'a [npm_core::stig::AuditResult]);

impl serde::Serialize for SerializableResults<'_> {
    fn serialize<S: serde::Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeSeq;
        let mut seq = s.serialize_seq(Some(self.0.len()))?;
        for r in self.0 {
            seq.serialize_element(&serde_json::json!({
                "rule_id": r.rule_id,
                "title": r.title,
                "severity": r.severity,
                "status": npm_core::stig::status_str(r.status),
                "finding": r.finding,
            }))?;
        }
        seq.end()
    }
}
