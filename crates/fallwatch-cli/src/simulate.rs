//! `fallwatch simulate`: replay a built-in synthetic scenario.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, TimeZone, Utc};
use clap::Args;
use colored::Colorize;
use fallwatch_alerting::{
    AckAction, Acknowledgment, AlertLifecycleManager, ConsoleChannel, MemoryChannel,
    NotificationDispatcher,
};
use fallwatch_risk::history::seconds;
use fallwatch_risk::synthetic::{Scenario, ScenarioKind};
use serde::Serialize;
use tokio::sync::mpsc;

use crate::input::SampleRecord;
use crate::output::{summary_rows, table, EventRow, MetricRow, TransitionRow};
use crate::session::Monitor;
use crate::settings::AppConfig;
use crate::OutputFormat;

/// Arguments for the simulate command
#[derive(Args, Debug)]
pub struct SimulateArgs {
    /// Scenario: hard-fall, slow-lie-down, upright-still or upright-jump
    pub scenario: ScenarioKind,

    /// Local hour at which the scenario starts
    #[arg(long, default_value = "2", value_parser = clap::value_parser!(u32).range(0..24))]
    pub hour: u32,

    /// Frame rate in Hz
    #[arg(long, default_value = "10.0")]
    pub rate: f64,

    /// Length in seconds (scenario default when omitted)
    #[arg(short, long)]
    pub duration: Option<f64>,

    /// Configuration file
    #[arg(short, long, env = "FALLWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Acknowledge each alert with "OK" this many seconds after it is raised
    #[arg(long)]
    pub ack_after: Option<f64>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Print notifications as they are delivered
    #[arg(short, long)]
    pub verbose: bool,

    /// Write the generated samples as JSON lines instead of evaluating them
    #[arg(long)]
    pub emit_samples: bool,
}

/// Machine-readable simulation result
#[derive(Serialize)]
struct SimulationReport {
    scenario: String,
    start: DateTime<Utc>,
    final_state: String,
    transitions: Vec<TransitionRow>,
    events: Vec<EventRow>,
    notifications: usize,
    summary: Vec<MetricRow>,
}

/// Execute the simulate command
pub async fn execute(args: SimulateArgs) -> Result<()> {
    let config = AppConfig::load(args.config.as_deref())?;
    let offset = config
        .risk
        .local_offset()
        .ok_or_else(|| anyhow!("utc_offset_minutes out of range"))?;
    let start = offset
        .with_ymd_and_hms(2024, 5, 1, args.hour, 0, 0)
        .single()
        .context("invalid start time")?
        .with_timezone(&Utc);

    let mut scenario = Scenario::new(args.scenario, start).with_rate(args.rate);
    if let Some(duration) = args.duration {
        scenario = scenario.with_duration(duration);
    }

    if args.emit_samples {
        for sample in scenario.samples() {
            println!("{}", serde_json::to_string(&SampleRecord::from_sample(&sample))?);
        }
        return Ok(());
    }

    let memory = MemoryChannel::new();
    let mut dispatcher = NotificationDispatcher::new().with_channel(Box::new(memory.clone()));
    if args.verbose {
        dispatcher.add_channel(Box::new(ConsoleChannel));
    }
    let (outbox, notifications) = mpsc::unbounded_channel();
    let delivery = tokio::spawn(async move { dispatcher.run(notifications).await });

    let manager = Arc::new(AlertLifecycleManager::new(config.alerting.clone(), outbox)?);
    let mut monitor = Monitor::new(Arc::new(config.risk.clone()), Arc::clone(&manager))?;
    let acks = manager.ack_sender();

    for sample in scenario.samples() {
        let ts = sample.timestamp();
        monitor.process(sample);
        if let Some(delay) = args.ack_after {
            for record in manager.pending() {
                if ts >= *record.last_sent_at() + seconds(delay) {
                    acks.send(Acknowledgment::new(record.id(), AckAction::Ok, ts))?;
                }
            }
        }
        monitor.poll(ts);
    }

    let stats = monitor.stats().clone();
    let final_state = monitor.state();
    let pending = manager.pending_count();
    let feedback = manager.feedback();
    drop(acks);
    drop(monitor);
    drop(manager);
    let delivered = delivery.await.context("notification task panicked")?;

    let origin = Some(start);
    let transitions: Vec<_> = stats
        .transitions
        .iter()
        .map(|t| TransitionRow::new(t, origin))
        .collect();
    let events: Vec<_> = stats.events.iter().map(|e| EventRow::new(e, origin)).collect();
    let summary = summary_rows(&stats, final_state, pending, feedback);

    match args.format {
        OutputFormat::Json => {
            let report = SimulationReport {
                scenario: args.scenario.to_string(),
                start,
                final_state: final_state.to_string(),
                transitions,
                events,
                notifications: memory.len(),
                summary,
            };
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Table => {
            println!(
                "{} Scenario {} from {} ({} notifications)",
                "[SIMULATION]".yellow().bold(),
                args.scenario.to_string().cyan(),
                start.format("%Y-%m-%d %H:%M UTC"),
                delivered
            );
            println!();
            if transitions.is_empty() {
                println!("{}", "No state transitions.".dimmed());
            } else {
                println!("{}", "Transitions".bold());
                println!("{}", table(transitions));
            }
            if !events.is_empty() {
                println!("{}", "Events".bold());
                println!("{}", table(events));
            }
            println!("{}", "Summary".bold());
            println!("{}", table(summary));
        }
    }
    Ok(())
}
