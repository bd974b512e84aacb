use anyhow::{Context, bail};
use clap::Parser;
use colored::Colorize;
use std::sync::Arc;

use fleet_booking::api::schedule_dto::AssignmentDto;
use fleet_booking::domain::conflict::resolution_listener::{LoggingListener, StatisticsListener};
use fleet_booking::domain::utils::statistics::StatsCollector;
use fleet_booking::loader::parser::{parse_json_file, write_json_file};
use fleet_booking::{Assignment, ConflictEpisode, Decision, ResolutionOutcome, SubmitOutcome, generate_fleet_model};

/// Checks a trip request against the committed schedule and resolves conflicts.
#[derive(Parser, Debug)]
#[command(name = "fleet-booking", version)]
struct Cli {
    /// Fleet catalog (vehicles and drivers) as JSON.
    #[arg(long)]
    fleet: String,

    /// Committed schedule as JSON.
    #[arg(long)]
    schedule: String,

    /// Candidate assignment as JSON.
    #[arg(long)]
    candidate: String,

    /// Optional suggestion policy as JSON.
    #[arg(long)]
    policy: Option<String>,

    /// What to do if the candidate conflicts: `apply:<n>`, `keep` or `dismiss`.
    #[arg(long)]
    decision: Option<String>,

    /// Write one CSV row per episode step to this file.
    #[arg(long)]
    stats: Option<String>,

    /// Write the updated schedule back to the schedule file.
    #[arg(long)]
    write: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let model = generate_fleet_model(&cli.fleet, &cli.schedule, cli.policy.as_deref()).context("Failed to load the fleet model")?;

    let candidate_dto: AssignmentDto = parse_json_file(&cli.candidate).with_context(|| format!("Failed to read candidate '{}'", cli.candidate))?;
    let candidate = Assignment::try_from(candidate_dto).context("Invalid candidate")?;

    let collector = match &cli.stats {
        Some(path) => Some(Arc::new(StatsCollector::init(Some(path.clone())).with_context(|| format!("Failed to open statistics file '{}'", path))?)),
        None => None,
    };

    let mut workflow = model.workflow().with_listener(Box::new(LoggingListener));
    if let Some(collector) = &collector {
        workflow.add_listener(Box::new(StatisticsListener::new(collector.clone())));
    }

    let schedule_changed = match workflow.submit(candidate)? {
        SubmitOutcome::Committed(assignment) => {
            println!("{} {} booked {} with driver {} for {}.", "✔".green(), assignment.id, assignment.vehicle_id, assignment.driver_id, assignment.window);
            true
        }
        SubmitOutcome::Pending(episode) => {
            print_episode(&episode);
            match &cli.decision {
                Some(raw) => {
                    let decision = parse_decision(raw, &episode)?;
                    let outcome = workflow.apply_resolution(&episode, decision)?;
                    print_outcome(&outcome);
                    outcome.assignment().is_some()
                }
                None => {
                    println!("\nRe-run with {} to resolve.", "--decision apply:<n>|keep|dismiss".bold());
                    false
                }
            }
        }
    };

    if cli.write && schedule_changed {
        write_json_file(&cli.schedule, &model.store.to_dto()).with_context(|| format!("Failed to write schedule '{}'", cli.schedule))?;
        log::info!("Schedule written to '{}'.", cli.schedule);
    }

    if let Some(collector) = collector {
        collector.shutdown();
    }
    Ok(())
}

/// `apply:<n>` picks the n-th suggestion as listed, counting from 1.
fn parse_decision(raw: &str, episode: &ConflictEpisode) -> anyhow::Result<Decision> {
    match raw {
        "keep" => Ok(Decision::KeepFlagged),
        "dismiss" => Ok(Decision::Dismiss),
        _ => {
            let Some(index) = raw.strip_prefix("apply:") else {
                bail!("Unknown decision '{}', expected apply:<n>, keep or dismiss", raw);
            };
            let n: usize = index.parse().with_context(|| format!("Suggestion number '{}' is not a number", index))?;
            match n.checked_sub(1).and_then(|i| episode.suggestions.get(i)) {
                Some(suggestion) => Ok(Decision::ApplySuggestion(suggestion.id.clone())),
                None => bail!("There is no suggestion {} ({} offered)", n, episode.suggestions.len()),
            }
        }
    }
}

fn print_episode(episode: &ConflictEpisode) {
    println!("{} {} conflicts with {} booking(s):", "✘".red(), episode.candidate.id, episode.conflicts.len());
    for conflict in &episode.conflicts {
        println!("  - {}", conflict.describe().red());
    }

    if episode.suggestions.is_empty() {
        println!("{}", "No conflict-free alternative found. You can still keep the booking flagged or dismiss it.".yellow());
        return;
    }

    println!("Suggestions:");
    for (i, suggestion) in episode.suggestions.iter().enumerate() {
        println!("  {}. {}", i + 1, suggestion.label.bold());
        println!("     {}", suggestion.rationale);
    }
}

fn print_outcome(outcome: &ResolutionOutcome) {
    match outcome {
        ResolutionOutcome::Applied(assignment) => {
            println!("{} {} booked {} with driver {} for {}.", "✔".green(), assignment.id, assignment.vehicle_id, assignment.driver_id, assignment.window);
        }
        ResolutionOutcome::KeptFlagged(assignment) => {
            println!("{} {} kept despite the conflict and flagged for reconciliation.", "!".yellow(), assignment.id);
        }
        ResolutionOutcome::Dismissed => println!("Request dismissed, the schedule is unchanged."),
        ResolutionOutcome::StillPending(episode) => {
            println!("{}", "The schedule changed in the meantime, please decide again.".yellow());
            print_episode(episode);
        }
    }
}
