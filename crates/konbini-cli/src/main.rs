//! Crawl pipeline entry point.
//!
//! `konbini <site> --stage <stage>` runs one isolated site job in this
//! process; `konbini all --stage <stage>` spawns every configured job as its
//! own process, aggregates their stats blocks, classifies run health, and
//! notifies.

use std::process::ExitCode;

use clap::Parser;

use konbini_core::Stage;

mod analyzer;
mod job;
mod notify;
mod outcome;
mod run;
mod runner;

#[derive(Debug, Parser)]
#[command(name = "konbini")]
#[command(about = "Convenience-store crawl pipeline")]
pub struct Cli {
    /// Job name to run, or "all" to run every configured job with
    /// aggregation and health analysis
    pub site: String,

    /// Operating stage: dev, prod, or test
    #[arg(long, value_parser = parse_stage)]
    pub stage: Stage,

    /// Wipe every persisted collection before an "all" run
    #[arg(long)]
    pub clear_all: bool,
}

fn parse_stage(s: &str) -> Result<Stage, String> {
    Stage::parse(s).ok_or_else(|| format!("expected dev, prod, or test, got '{s}'"))
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match run::execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            // Also lands in the job log when file logging is active.
            tracing::error!(error = format!("{e:#}"), "run failed");
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_job_invocation() {
        let cli = Cli::try_parse_from(["konbini", "gs25web", "--stage", "prod"]).unwrap();
        assert_eq!(cli.site, "gs25web");
        assert_eq!(cli.stage, Stage::Prod);
        assert!(!cli.clear_all);
    }

    #[test]
    fn parses_all_with_clear_all() {
        let cli = Cli::try_parse_from(["konbini", "all", "--stage", "dev", "--clear-all"]).unwrap();
        assert_eq!(cli.site, "all");
        assert_eq!(cli.stage, Stage::Dev);
        assert!(cli.clear_all);
    }

    #[test]
    fn stage_is_required() {
        assert!(Cli::try_parse_from(["konbini", "all"]).is_err());
    }

    #[test]
    fn unknown_stage_is_rejected() {
        assert!(Cli::try_parse_from(["konbini", "all", "--stage", "staging"]).is_err());
    }
}
