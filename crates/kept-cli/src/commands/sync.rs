use kept_core::SyncEvent;

use crate::commands::common::{
    format_mutation_lines, format_sync_timestamp, GlobalOptions, Session,
};
use crate::error::CliError;

pub async fn run_sync(options: &GlobalOptions) -> Result<(), CliError> {
    let session = Session::open(options, false).await?;
    let pending = session.client.queue().pending_count().await;
    if session.client.is_offline() {
        println!("Offline; {pending} change(s) stay queued");
        return Ok(());
    }
    if pending == 0 {
        println!("Nothing to sync");
        return Ok(());
    }

    let engine = session.sync_engine();
    let mut events = engine.subscribe();
    let report = engine.sync_now().await;

    while let Ok(event) = events.try_recv() {
        if let SyncEvent::Dropped(mutation) = event {
            eprintln!(
                "Dropped {} {} {} after {} failed attempt(s)",
                mutation.kind.as_str(),
                mutation.resource,
                mutation.record_id().unwrap_or("-"),
                mutation.retries + 1
            );
        }
    }

    println!(
        "Sync completed: {} succeeded, {} failed ({} dropped)",
        report.success, report.failed, report.dropped
    );
    Ok(())
}

pub async fn run_queue(as_json: bool, options: &GlobalOptions) -> Result<(), CliError> {
    let session = Session::open(options, false).await?;
    let mutations = session.client.queue().get_queued_mutations().await;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&mutations)?);
        return Ok(());
    }
    if mutations.is_empty() {
        println!("No queued changes.");
        return Ok(());
    }
    for line in format_mutation_lines(&mutations) {
        println!("{line}");
    }
    Ok(())
}

pub async fn run_status(options: &GlobalOptions) -> Result<(), CliError> {
    let session = Session::open(options, false).await?;
    let pending = session.client.queue().pending_count().await;
    let last_sync = session.client.cache().last_sync_at().await;

    println!("Profile:    {}", session.profile_name);
    println!("Backend:    {}", session.config.api_base_url);
    println!(
        "Mode:       {}",
        if session.network.is_online() {
            "online"
        } else {
            "offline"
        }
    );
    println!("Pending:    {pending}");
    println!(
        "Last sync:  {}",
        last_sync.map_or_else(|| "never".to_string(), format_sync_timestamp)
    );
    Ok(())
}

pub async fn run_reset(confirmed: bool, options: &GlobalOptions) -> Result<(), CliError> {
    if !confirmed {
        println!("This forgets the local cache and every queued change. Re-run with --yes.");
        return Ok(());
    }
    let session = Session::open(options, false).await?;
    let pending = session.client.queue().pending_count().await;
    session.client.reset().await;
    println!("Local data cleared ({pending} queued change(s) discarded)");
    Ok(())
}
