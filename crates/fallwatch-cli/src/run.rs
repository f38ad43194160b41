//! `fallwatch run`: evaluate a JSON-lines sample stream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use colored::Colorize;
use fallwatch_alerting::{AckAction, Acknowledgment, AlertId, AlertLifecycleManager, AlertRecord};
use fallwatch_risk::history::seconds;
use fallwatch_risk::{Clock, ManualClock};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Notify;

use crate::input::SampleRecord;
use crate::output::{color_status, print_transition, summary_rows, table};
use crate::session::{build_dispatcher, Monitor};
use crate::settings::AppConfig;

/// Longest pause between samples in `--realtime` mode.
const MAX_REALTIME_GAP: Duration = Duration::from_secs(5);

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// JSON-lines sample file (reads stdin when omitted or "-")
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = "FALLWATCH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read acknowledgments from stdin: "ok", "false" or "stop", optionally
    /// followed by an alert id (defaults to the newest pending alert)
    #[arg(long)]
    pub interactive: bool,

    /// Replay at the pace of the sample timestamps
    #[arg(long)]
    pub realtime: bool,

    /// Override the journal path
    #[arg(long)]
    pub journal: Option<PathBuf>,

    /// Disable the alert journal
    #[arg(long, conflicts_with = "journal")]
    pub no_journal: bool,

    /// Do not print notifications to the terminal
    #[arg(short, long)]
    pub quiet: bool,
}

impl RunArgs {
    fn reads_stdin(&self) -> bool {
        self.input
            .as_ref()
            .map_or(true, |p| p.as_os_str() == "-")
    }
}

/// Execute the run command
pub async fn execute(args: RunArgs) -> Result<()> {
    if args.interactive && args.reads_stdin() {
        bail!("--interactive reads acknowledgments from stdin; pass samples with --input <file>");
    }

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(path) = &args.journal {
        config.journal.path = path.clone();
    }
    if args.no_journal {
        config.journal.enabled = false;
    }

    let console = config.runtime.console_notifications && !args.quiet;
    let (dispatcher, outbox, notifications) = build_dispatcher(&config, console);
    tracing::info!(channels = ?dispatcher.channel_names(), "Notification channels ready");
    let delivery = tokio::spawn(async move { dispatcher.run(notifications).await });

    let manager = Arc::new(AlertLifecycleManager::new(config.alerting.clone(), outbox)?);
    let mut monitor = Monitor::new(Arc::new(config.risk.clone()), Arc::clone(&manager))?;
    let clock = ManualClock::new(Utc::now());

    let local_stop = Arc::new(Notify::new());
    let ack_task = args.interactive.then(|| {
        tokio::spawn(read_acknowledgments(
            Arc::clone(&manager),
            clock.clone(),
            Arc::clone(&local_stop),
        ))
    });

    let reader: Box<dyn AsyncBufRead + Unpin + Send> = match &args.input {
        Some(path) if !args.reads_stdin() => Box::new(BufReader::new(
            tokio::fs::File::open(path)
                .await
                .with_context(|| format!("opening {}", path.display()))?,
        )),
        _ => Box::new(BufReader::new(tokio::io::stdin())),
    };
    let mut lines = reader.lines();

    println!(
        "{} Monitoring started (state {})",
        "[FallWatch]".bright_cyan().bold(),
        monitor.state()
    );

    let mut ticker = tokio::time::interval(Duration::from_millis(config.runtime.poll_interval_ms));
    let mut line_no = 0_u64;
    let mut last_sample: Option<(DateTime<Utc>, Instant)> = None;
    let mut status = monitor.status();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading samples")? else {
                    break;
                };
                line_no += 1;
                let record = match SampleRecord::parse_line(&line) {
                    Ok(Some(record)) => record,
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(line = line_no, error = %e, "Skipping sample line");
                        continue;
                    }
                };
                let sample = match record.to_sample() {
                    Ok(sample) => sample,
                    Err(e) => {
                        tracing::warn!(line = line_no, error = %format!("{e:#}"), "Skipping sample");
                        continue;
                    }
                };
                let ts = sample.timestamp();

                if args.realtime {
                    if let Some((prev, _)) = last_sample {
                        let gap = (ts - prev).to_std().unwrap_or_default().min(MAX_REALTIME_GAP);
                        tokio::time::sleep(gap).await;
                    }
                }
                if let Some(occupied) = record.occupied {
                    monitor.set_occupancy(occupied, ts);
                }

                clock.set(ts);
                last_sample = Some((ts, Instant::now()));
                let report = monitor.process(sample);
                for transition in &report.transitions {
                    print_transition(transition, None);
                }
                monitor.poll(ts);
            }
            _ = ticker.tick() => {
                // Between samples, time advances with the wall clock.
                if let Some((ts, arrived)) = last_sample {
                    let now = ts + seconds(arrived.elapsed().as_secs_f64());
                    clock.set(now);
                    monitor.poll(now);
                }
            }
            _ = local_stop.notified() => {
                println!("{} Stop requested; shutting down", "[FallWatch]".bright_cyan().bold());
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                println!("{} Interrupted; shutting down", "[FallWatch]".bright_cyan().bold());
                break;
            }
        }

        let current = monitor.status();
        if current != status {
            println!(
                "{} Status: {}",
                "[FallWatch]".bright_cyan().bold(),
                color_status(current)
            );
            status = current;
        }
        if monitor.stop_requested() {
            println!("{} Stop requested; shutting down", "[FallWatch]".bright_cyan().bold());
            break;
        }
    }

    monitor.poll(clock.now());
    if let Some(task) = ack_task {
        task.abort();
        let _ = task.await;
    }

    println!();
    println!("{}", "Session summary".bold().cyan());
    println!(
        "{}",
        table(summary_rows(
            monitor.stats(),
            monitor.state(),
            manager.pending_count(),
            manager.feedback(),
        ))
    );

    drop(monitor);
    drop(manager);
    let delivered = delivery.await.context("notification task panicked")?;
    tracing::info!(delivered, "Notifications processed");
    Ok(())
}

/// A line typed by the caregiver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AckCommand {
    /// Forward to the alert manager.
    Respond(Acknowledgment),
    /// "stop" with no alert pending; handled by the session itself.
    StopMonitoring,
}

/// Parses an acknowledgment typed by the caregiver.
///
/// Without an explicit id the newest pending alert is acknowledged; "stop"
/// with nothing pending stops monitoring directly.
pub fn parse_ack_command(
    line: &str,
    pending: &[AlertRecord],
    now: DateTime<Utc>,
) -> Result<Option<AckCommand>> {
    let mut words = line.split_whitespace();
    let Some(action) = words.next() else {
        return Ok(None);
    };
    let action: AckAction = action.parse().map_err(|e: String| anyhow!(e))?;
    let alert_id = match words.next() {
        Some(id) => id
            .parse::<AlertId>()
            .with_context(|| format!("invalid alert id '{id}'"))?,
        None => match pending.last() {
            Some(record) => record.id(),
            None if action == AckAction::Stop => return Ok(Some(AckCommand::StopMonitoring)),
            None => bail!("no pending alert to acknowledge"),
        },
    };
    Ok(Some(AckCommand::Respond(Acknowledgment::new(alert_id, action, now))))
}

async fn read_acknowledgments(
    manager: Arc<AlertLifecycleManager>,
    clock: ManualClock,
    local_stop: Arc<Notify>,
) -> Result<()> {
    let sender = manager.ack_sender();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_ack_command(&line, &manager.pending(), clock.now()) {
            Ok(Some(AckCommand::Respond(ack))) => {
                if sender.send(ack).is_err() {
                    break;
                }
            }
            Ok(Some(AckCommand::StopMonitoring)) => {
                local_stop.notify_one();
                break;
            }
            Ok(None) => {}
            Err(e) => eprintln!("{} {e:#}", "[WARN]".yellow()),
        }
    }
    Ok(())
}
