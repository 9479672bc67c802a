//! dining-oracle - correctness oracle CLI for dining-philosophers subjects
//!
//! ## Commands
//!
//! - `run`: execute the scenario suite against a subject binary
//! - `list`: print the declared scenario catalog

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dining_oracle::{catalog, init_tracing, RaceAudit, Scenario, Suite};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser)]
#[command(name = "dining-oracle")]
#[command(author = "Stevedores Org")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Black-box correctness oracle for dining-philosophers simulations",
    long_about = None
)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines and a JSON report
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute the scenario suite against a subject binary
    Run {
        /// Path to the subject binary
        #[arg(short, long)]
        binary: PathBuf,

        /// Run only the named scenarios (repeatable)
        #[arg(short, long)]
        scenario: Vec<String>,

        /// Maximum scenarios to run concurrently
        #[arg(short, long, default_value_t = 1)]
        jobs: usize,

        /// Skip the dynamic race detector run (part of the suite by default)
        #[arg(long)]
        no_race: bool,

        /// Override the race detector command (whitespace-separated)
        #[arg(long)]
        race_tool: Option<String>,
    },

    /// Print the declared scenario catalog
    List,
}

/// Restrict the catalog to the requested scenario names, erroring on
/// anything unknown so typos never silently shrink coverage.
fn select_scenarios(filters: &[String]) -> Result<Vec<Scenario>> {
    let scenarios = catalog();
    if filters.is_empty() {
        return Ok(scenarios);
    }
    for name in filters {
        if !scenarios.iter().any(|s| &s.name == name) {
            bail!("unknown scenario: {name}");
        }
    }
    Ok(scenarios
        .into_iter()
        .filter(|s| filters.contains(&s.name))
        .collect())
}

fn race_audit_from(race_tool: Option<&str>) -> RaceAudit {
    match race_tool {
        Some(cmd) => RaceAudit::with_tool(cmd.split_whitespace().map(str::to_string).collect()),
        None => RaceAudit::helgrind(),
    }
}

/// Bounded subject invocation for the detector run; the subject defaults to
/// running endlessly, so the audit must always pass an explicit duration.
fn race_audit_args() -> Vec<String> {
    vec![
        "--philosophers".to_string(),
        "5".to_string(),
        "--duration".to_string(),
        "2".to_string(),
    ]
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    init_tracing(cli.json, level);

    match cli.command {
        Commands::List => {
            for scenario in catalog() {
                println!("{:<24} {}", scenario.name, scenario.args().join(" "));
            }
            Ok(())
        }
        Commands::Run {
            binary,
            scenario,
            jobs,
            no_race,
            race_tool,
        } => {
            let scenarios = select_scenarios(&scenario)?;
            let mut report = Suite::run(&binary, scenarios, jobs)
                .await
                .context("suite execution failed")?;

            if !no_race {
                let audit = race_audit_from(race_tool.as_deref());
                let audit_report = Suite::race_audit(&audit, &binary, &race_audit_args())
                    .await
                    .context("race audit failed")?;
                report.scenarios.push(audit_report);
            }

            if cli.json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.render());
            }

            if !report.success() {
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run_command() {
        let cli = Cli::try_parse_from([
            "dining-oracle",
            "run",
            "--binary",
            "./bin/diningPhilosophers",
            "--scenario",
            "normal_run",
            "--jobs",
            "4",
        ])
        .expect("parse failed");

        match cli.command {
            Commands::Run {
                binary,
                scenario,
                jobs,
                no_race,
                ..
            } => {
                assert_eq!(binary, PathBuf::from("./bin/diningPhilosophers"));
                assert_eq!(scenario, vec!["normal_run".to_string()]);
                assert_eq!(jobs, 4);
                assert!(!no_race, "race audit must be on by default");
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_cli_no_race_opts_out_of_audit() {
        let cli = Cli::try_parse_from([
            "dining-oracle",
            "run",
            "--binary",
            "./bin/diningPhilosophers",
            "--no-race",
        ])
        .expect("parse failed");

        match cli.command {
            Commands::Run { no_race, .. } => assert!(no_race),
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_race_audit_args_bound_the_subject_run() {
        let args = race_audit_args();
        assert!(args.windows(2).any(|w| w == ["--duration", "2"]));
    }

    #[test]
    fn test_select_scenarios_default_is_full_catalog() {
        let scenarios = select_scenarios(&[]).expect("select failed");
        assert_eq!(scenarios.len(), catalog().len());
    }

    #[test]
    fn test_select_scenarios_filters_by_name() {
        let scenarios =
            select_scenarios(&["normal_run".to_string(), "bad_duration".to_string()])
                .expect("select failed");
        assert_eq!(scenarios.len(), 2);
    }

    #[test]
    fn test_select_scenarios_rejects_unknown_name() {
        assert!(select_scenarios(&["no_such_scenario".to_string()]).is_err());
    }

    #[test]
    fn test_race_tool_override_splits_command() {
        let audit = race_audit_from(Some("valgrind --tool=drd --error-exitcode=66"));
        let verdict_name = dining_oracle::Verifier::name(&audit);
        assert_eq!(verdict_name, "race-audit");
    }
}
