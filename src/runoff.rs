use log::{debug, info, warn};

use runoff_engine::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::runoff::config_reader::*;

pub mod config_reader;

#[derive(Debug, Snafu)]
pub enum RunoffError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON: {source}"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive number"))]
    ParsingJsonNumber {},
    #[snafu(display("Error writing the summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Tabulation failed: {source}"))]
    Tabulation { source: TabulationError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RunoffResult<T> = Result<T, RunoffError>;

fn validate_rules(rules_config: &Option<RulesConfig>) -> RunoffResult<TabulationRules> {
    let rc = match rules_config {
        Some(x) => x,
        None => return Ok(TabulationRules::DEFAULT_RULES),
    };
    let res = TabulationRules {
        tiebreak_mode: match rc.tiebreak_mode.as_deref() {
            None | Some("preferenceOffset") => TieBreakMode::PreferenceOffset,
            Some("lookBehind") => TieBreakMode::LookBehind,
            Some("lookAhead") => TieBreakMode::LookAhead,
            Some("registrationTime") => TieBreakMode::RegistrationTime,
            Some("deterministicRandom") => match rc.random_seed()? {
                Some(seed) => TieBreakMode::DeterministicRandom(seed),
                None => {
                    whatever!("Tiebreak mode deterministicRandom requires a randomSeed")
                }
            },
            Some(x) => {
                whatever!("Cannot use tiebreak mode {:?}", x)
            }
        },
        rank_validation: match rc.rank_validation.as_deref() {
            None | Some("permissive") => RankValidation::Permissive,
            Some("strict") => RankValidation::Strict,
            Some(x) => {
                whatever!("Cannot use rank validation {:?}", x)
            }
        },
    };
    Ok(res)
}

fn build_summary_js(config: &ElectionConfig, result: &ElectionResult) -> JSValue {
    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        winner: result.winner_id().to_string(),
    };
    json!({
        "config": c,
        "results": result })
}

// An explicit --out wins over the output directory of the configuration.
fn output_path(config_path: &str, config: &ElectionConfig, out: Option<String>) -> Option<String> {
    match out {
        Some(x) if x.is_empty() => None,
        Some(x) => Some(x),
        None => config.output_settings.output_directory.as_ref().map(|dir| {
            let root_p = Path::new(config_path).parent().unwrap_or_else(|| Path::new(""));
            let p: PathBuf = [
                root_p,
                Path::new(dir),
                Path::new(&format!("{}_summary.json", config.output_settings.contest_name)),
            ]
            .iter()
            .collect();
            p.display().to_string()
        }),
    }
}

pub fn run_election(
    config_path: &str,
    out: Option<String>,
    check_summary_path: Option<String>,
) -> RunoffResult<()> {
    let config = read_config(config_path)?;
    info!(
        "run_election: contest {:?}: {} candidates",
        config.output_settings.contest_name,
        config.candidates.len()
    );

    let rules = validate_rules(&config.rules)?;
    let result =
        runoff_engine::run_election(&config.candidates, &rules).context(TabulationSnafu {})?;
    info!(
        "run_election: winner {} after {} rounds",
        result.winner_id(),
        result.rounds().len()
    );

    // Assemble the final json
    let result_js = build_summary_js(&config, &result);
    let pretty_js_stats = serde_json::to_string_pretty(&result_js).context(ParsingJsonSnafu {})?;

    match output_path(config_path, &config, out) {
        Some(p) if p != "stdout" => {
            debug!("run_election: writing summary to {}", p);
            fs::write(&p, &pretty_js_stats).context(WritingSummarySnafu { path: p.as_str() })?;
        }
        _ => {
            println!("{}", pretty_js_stats);
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(&summary_p)?;
        if summary_ref != result_js {
            let pretty_js_summary_ref =
                serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
        info!("run_election: summary matches {}", summary_p);
    }

    Ok(())
}

#[cfg(test)]
fn test_wrapper(test_name: &str) -> RunoffResult<()> {
    let _ = env_logger::builder().is_test(true).try_init();
    let test_dir = format!("{}/testdata/{}", env!("CARGO_MANIFEST_DIR"), test_name);
    info!("Running test {}", test_name);
    run_election(
        &format!("{}/{}_config.json", test_dir, test_name),
        Some("stdout".to_string()),
        Some(format!("{}/{}_expected_summary.json", test_dir, test_name)),
    )
}
