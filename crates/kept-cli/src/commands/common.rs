use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use kept_core::db::LibSqlKeyValueStore;
use kept_core::models::{Event, FileRecord, QueuedMutation};
use kept_core::optimistic::is_temporary_id;
use kept_core::{
    ClientConfig, ConnectivityState, HttpBackend, Note, OfflineClient, SyncEngine,
};

use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

pub type Client = OfflineClient<HttpBackend, LibSqlKeyValueStore>;

/// Flags shared by every subcommand.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub db_path: Option<PathBuf>,
    pub profile: Option<String>,
    pub offline: bool,
}

/// An opened local store plus the backend of the resolved profile.
pub struct Session {
    pub client: Client,
    pub network: ConnectivityState,
    pub config: ClientConfig,
    pub profile_name: String,
    user_id: Option<String>,
}

impl Session {
    /// Open the session. With `auto_sync`, queued changes left by earlier
    /// offline runs are replayed first when the backend is reachable.
    pub async fn open(options: &GlobalOptions, auto_sync: bool) -> Result<Self, CliError> {
        let profiles = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = profiles.resolve_profile_name(options.profile.as_deref());
        let profile = profiles.profile(&profile_name).cloned().unwrap_or_default();
        let config = profile.client_config().ok_or(CliError::NotConfigured)??;

        let backend = HttpBackend::from_config(&config)?;
        let store = LibSqlKeyValueStore::open_path(resolve_db_path(options.db_path.clone())).await?;
        let online = !(options.offline || offline_from_env());
        let network = ConnectivityState::new(online);
        let client = OfflineClient::new(
            Arc::new(backend),
            Arc::new(store),
            Arc::new(network.clone()),
        );
        let pending = client.init().await;

        let user_id =
            normalize_text_option(env::var("KEPT_USER_ID").ok()).or(profile.user_id.clone());
        let session = Self {
            client,
            network,
            config,
            profile_name,
            user_id,
        };

        if auto_sync && session.config.auto_sync && online && pending > 0 {
            let report = session.sync_engine().sync_now().await;
            tracing::info!(
                "Replayed queued changes: {} succeeded, {} failed",
                report.success,
                report.failed
            );
        }
        Ok(session)
    }

    pub fn user_id(&self) -> Result<&str, CliError> {
        self.user_id.as_deref().ok_or(CliError::NoUser)
    }

    pub fn sync_engine(&self) -> SyncEngine<HttpBackend, LibSqlKeyValueStore> {
        SyncEngine::new(&self.client).with_max_retries(self.config.max_retries)
    }

    /// Whether a write to `id` was only applied locally.
    pub fn writes_locally(&self, id: &str) -> bool {
        self.client.is_offline() || is_temporary_id(id)
    }
}

/// Print a written record's ID, or report a local-only write that found no
/// cached record to patch.
pub fn print_written<R: kept_core::models::Resource>(
    session: &Session,
    kind: &'static str,
    id: &str,
    written: Option<R>,
) -> Result<(), CliError> {
    match written {
        Some(record) => {
            println!("{}", record.id());
            Ok(())
        }
        None if session.writes_locally(id) => {
            println!("{id} (queued)");
            Ok(())
        }
        None => Err(CliError::NotFound(kind, id.to_string())),
    }
}

/// Surface a failed online write, which the accessor has already queued.
pub fn queued_on_failure<T>(result: kept_core::Result<T>) -> Result<T, CliError> {
    result.map_err(|error| {
        if matches!(
            error,
            kept_core::Error::Remote(_) | kept_core::Error::Http(_)
        ) {
            eprintln!("Change queued; it will be retried on the next `kept sync`.");
        }
        CliError::Core(error)
    })
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("KEPT_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(default_db_path)
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(env::temp_dir)
        .join("kept")
        .join("kept.db")
}

fn offline_from_env() -> bool {
    env::var("KEPT_OFFLINE").is_ok_and(|value| is_truthy(&value))
}

pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn normalize_id(id: &str) -> Result<String, CliError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(CliError::EmptyId);
    }
    Ok(id.to_string())
}

pub fn normalize_title(title: &str) -> Result<String, CliError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(CliError::EmptyTitle);
    }
    Ok(title.to_string())
}

/// Accepts `YYYY-MM-DD` (midnight UTC) or an RFC 3339 timestamp.
pub fn parse_date(raw: &str) -> Result<DateTime<Utc>, CliError> {
    let raw = raw.trim();
    if let Ok(date_time) = DateTime::parse_from_rfc3339(raw) {
        return Ok(date_time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|date_time| date_time.and_utc())
        .ok_or_else(|| CliError::InvalidDate(raw.to_string()))
}

pub fn format_note_lines(notes: &[Note]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    notes
        .iter()
        .map(|note| {
            let preview = note.title_preview(40);
            let relative_time = format_relative_time(note.updated_at, now_ms);
            let line = format!("{:<28}  {preview:<40}  {relative_time}", note.id);
            if note.is_archived {
                format!("{line}  [archived]")
            } else {
                line
            }
        })
        .collect()
}

pub fn format_event_lines(events: &[Event]) -> Vec<String> {
    events
        .iter()
        .map(|event| {
            let mut line = format!(
                "{:<28}  {}  {:<30}",
                event.id,
                event.date.format("%Y-%m-%d %H:%M"),
                event.title
            );
            if event.repeat != kept_core::models::RepeatInterval::None {
                line.push_str(&format!("  ({})", event.repeat));
            }
            if event.is_archived {
                line.push_str("  [archived]");
            }
            line
        })
        .collect()
}

pub fn format_file_lines(files: &[FileRecord]) -> Vec<String> {
    files
        .iter()
        .map(|file| {
            format!(
                "{:<28}  {:<32}  {:>10}  {}",
                file.id,
                file.name,
                format_size(file.size_bytes),
                file.mime_type
            )
        })
        .collect()
}

pub fn format_mutation_lines(mutations: &[QueuedMutation]) -> Vec<String> {
    let now_ms = Utc::now().timestamp_millis();
    mutations
        .iter()
        .map(|mutation| {
            format!(
                "{}  {:<6}  {:<5}  {:<28}  retries={}  {}",
                mutation.id,
                mutation.kind.as_str(),
                mutation.resource,
                mutation.record_id().unwrap_or("-"),
                mutation.retries,
                format_relative_time(mutation.timestamp, now_ms)
            )
        })
        .collect()
}

#[allow(clippy::cast_precision_loss)]
pub fn format_size(size_bytes: i64) -> String {
    const KIB: i64 = 1024;
    const MIB: i64 = KIB * 1024;
    if size_bytes < KIB {
        format!("{size_bytes} B")
    } else if size_bytes < MIB {
        format!("{:.1} KiB", size_bytes as f64 / KIB as f64)
    } else {
        format!("{:.1} MiB", size_bytes as f64 / MIB as f64)
    }
}

pub fn format_sync_timestamp(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
