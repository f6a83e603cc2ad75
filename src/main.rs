use std::{path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use ready_check_helper::{
    layout::locate_entry,
    protocol::{load_capture, take_bootstrap_frame},
    replay::{replay_capture, ReplayHost},
    reporting::group_by_party,
    worker::{spawn_ready_check_worker, ChannelReportSink, WorkerMessage},
    GameStateProvider, NotReadyReport, ReadyCheckConfig, ReadyCheckController,
};
use tokio::{sync::mpsc, time::sleep};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let (config, config_path) = ReadyCheckConfig::load_or_create()?;
    info!(path = %config_path.display(), "loaded config");

    let capture_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: ready-check-helper <capture.jsonl>")?;
    let mut messages = load_capture(&capture_path)?;

    let host = ReplayHost::default();
    if let Some(state) = take_bootstrap_frame(&mut messages) {
        host.apply(state);
    }

    let (report_tx, report_rx) = crossbeam_channel::unbounded::<NotReadyReport>();
    let max_listed = config.max_unready_to_list_in_chat;
    let report_grace = config.report_delay() + config.tick_interval();
    let controller = ReadyCheckController::new(
        config,
        host.clone(),
        Arc::new(ChannelReportSink::new(report_tx)),
    )
    .with_context(|| format!("cannot replay {}", capture_path.display()))?;
    let handle = controller.handle();

    let (tx, rx) = mpsc::unbounded_channel::<WorkerMessage>();
    let worker = spawn_ready_check_worker(controller, rx);

    replay_capture(messages, &host, &tx).await?;
    sleep(report_grace).await;
    drop(tx);
    worker.await.context("ready check worker panicked")?;

    for report in report_rx.try_iter() {
        if let Some(message) = report.message(max_listed) {
            println!("[{}] {message}", report.at.format("%H:%M:%S"));
        }
    }

    let Some(results) = handle.snapshot() else {
        println!("no ready check results");
        return Ok(());
    };
    let roster = host.roster();
    for (group_index, entries) in group_by_party(&results) {
        println!("group {group_index}");
        for entry in entries {
            let slot = roster
                .as_ref()
                .and_then(|roster| locate_entry(roster, &entry))
                .map(|layout| format!("{}:{}", layout.group_number, layout.member_index))
                .unwrap_or_else(|| "-".to_owned());
            let state = format!("{:?}", entry.ready_state);
            println!("  {:<24} {state:<18} {slot}", entry.name);
        }
    }

    Ok(())
}
