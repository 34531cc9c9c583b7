use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use clap::Parser;
use kept_core::models::{MutationKind, QueuedMutation, ResourceKind};
use kept_core::Note;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::cli::{Cli, Commands, CompletionShell, NoteCommands};
use crate::commands::common::{
    format_mutation_lines, format_note_lines, format_relative_time, format_size,
    format_sync_timestamp, is_truthy, normalize_id, normalize_title, parse_date,
    resolve_db_path,
};
use crate::commands::completions::render_completions;
use crate::commands::config::{merge_profile, ProfileUpdate};
use crate::commands::files::build_upload;
use crate::config_profiles::CliProfile;
use crate::error::CliError;

fn note(id: &str, title: &str, archived: bool) -> Note {
    Note {
        id: id.to_string(),
        user_id: "user-1".to_string(),
        title: title.to_string(),
        content: String::new(),
        is_archived: archived,
        created_at: 0,
        updated_at: Utc::now().timestamp_millis(),
    }
}

#[test]
fn parse_date_accepts_plain_dates_and_rfc3339() {
    assert_eq!(
        parse_date("2026-03-02").unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()
    );
    assert_eq!(
        parse_date(" 2026-03-02T09:30:00+02:00 ").unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 2, 7, 30, 0).unwrap()
    );
    assert!(matches!(
        parse_date("next tuesday"),
        Err(CliError::InvalidDate(_))
    ));
}

#[test]
fn normalize_id_and_title_reject_blank_values() {
    assert_eq!(normalize_id("  note-1 ").unwrap(), "note-1");
    assert!(matches!(normalize_id("   "), Err(CliError::EmptyId)));
    assert_eq!(normalize_title(" Groceries ").unwrap(), "Groceries");
    assert!(matches!(normalize_title(""), Err(CliError::EmptyTitle)));
}

#[test]
fn is_truthy_accepts_common_spellings() {
    assert!(is_truthy("1"));
    assert!(is_truthy(" TRUE "));
    assert!(is_truthy("yes"));
    assert!(!is_truthy("0"));
    assert!(!is_truthy(""));
}

#[test]
fn format_relative_time_buckets() {
    let now = 10 * 365 * 24 * 60 * 60 * 1000_i64;
    assert_eq!(format_relative_time(now - 5_000, now), "just now");
    assert_eq!(format_relative_time(now - 5 * 60_000, now), "5m ago");
    assert_eq!(format_relative_time(now - 3 * 60 * 60_000, now), "3h ago");
    assert_eq!(format_relative_time(now - 2 * 24 * 60 * 60_000, now), "2d ago");
}

#[test]
fn format_sync_timestamp_renders_utc() {
    assert_eq!(format_sync_timestamp(0), "1970-01-01 00:00:00 UTC");
}

#[test]
fn format_size_uses_binary_units() {
    assert_eq!(format_size(512), "512 B");
    assert_eq!(format_size(1536), "1.5 KiB");
    assert_eq!(format_size(3 * 1024 * 1024), "3.0 MiB");
}

#[test]
fn format_note_lines_marks_archived_notes() {
    let lines = format_note_lines(&[note("note-1", "Groceries", false), note("note-2", "Old", true)]);
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("note-1"));
    assert!(lines[0].contains("Groceries"));
    assert!(!lines[0].contains("[archived]"));
    assert!(lines[1].ends_with("[archived]"));
}

#[test]
fn format_mutation_lines_show_target_and_retries() {
    let mutation = QueuedMutation {
        id: "m-1".to_string(),
        kind: MutationKind::Delete,
        resource: ResourceKind::Event,
        data: json!({ "id": "event-9" }),
        timestamp: Utc::now().timestamp_millis(),
        retries: 2,
    };

    let lines = format_mutation_lines(&[mutation]);
    assert!(lines[0].starts_with("m-1  delete  event"));
    assert!(lines[0].contains("event-9"));
    assert!(lines[0].contains("retries=2"));
}

#[test]
fn merge_profile_prefers_explicit_values() {
    let existing = CliProfile {
        api_base_url: Some("https://old.example.com".to_string()),
        user_id: Some("old-user".to_string()),
        access_token: Some("old-token".to_string()),
        max_retries: Some(4),
    };

    let merged = merge_profile(
        &existing,
        ProfileUpdate {
            api_base_url: Some("https://api.example.com/".to_string()),
            user_id: Some("user-1".to_string()),
            access_token: None,
            max_retries: None,
        },
    )
    .unwrap();

    assert_eq!(merged.api_base_url.as_deref(), Some("https://api.example.com"));
    assert_eq!(merged.user_id.as_deref(), Some("user-1"));
    assert_eq!(merged.access_token.as_deref(), Some("old-token"));
    assert_eq!(merged.max_retries, Some(4));
}

#[test]
fn merge_profile_rejects_invalid_values() {
    let invalid_url = merge_profile(
        &CliProfile::default(),
        ProfileUpdate {
            api_base_url: Some("api.example.com".to_string()),
            ..ProfileUpdate::default()
        },
    );
    assert!(matches!(invalid_url, Err(CliError::Config(_))));

    let zero_retries = merge_profile(
        &CliProfile::default(),
        ProfileUpdate {
            api_base_url: Some("https://api.example.com".to_string()),
            max_retries: Some(0),
            ..ProfileUpdate::default()
        },
    );
    assert!(matches!(zero_retries, Err(CliError::Config(_))));
}

#[test]
fn build_upload_guesses_name_and_mime_type() {
    let path = std::env::temp_dir().join(format!(
        "kept-upload-test-{}.png",
        std::process::id()
    ));
    std::fs::write(&path, [0x89, b'P', b'N', b'G']).unwrap();

    let upload = build_upload("user-1", &path, None, None).unwrap();
    assert_eq!(upload.mime_type, "image/png");
    assert_eq!(upload.bytes.len(), 4);
    assert!(upload.name.starts_with("kept-upload-test-"));

    let renamed = build_upload(
        "user-1",
        &path,
        Some("diagram.png".to_string()),
        Some("application/octet-stream".to_string()),
    )
    .unwrap();
    assert_eq!(renamed.name, "diagram.png");
    assert_eq!(renamed.mime_type, "application/octet-stream");

    let _ = std::fs::remove_file(path);
}

#[test]
fn build_upload_reports_missing_files() {
    let missing = PathBuf::from("/definitely/not/here.txt");
    assert!(matches!(
        build_upload("user-1", &missing, None, None),
        Err(CliError::Io(_))
    ));
}

#[test]
fn resolve_db_path_prefers_explicit_path() {
    let explicit = PathBuf::from("/tmp/kept-explicit.db");
    assert_eq!(resolve_db_path(Some(explicit.clone())), explicit);
}

#[test]
fn cli_parses_global_flags_after_subcommand() {
    let cli = Cli::try_parse_from([
        "kept", "notes", "add", "Groceries", "--content", "milk", "--offline",
    ])
    .unwrap();

    assert!(cli.offline);
    match cli.command {
        Commands::Notes {
            command: NoteCommands::Add { title, content },
        } => {
            assert_eq!(title, "Groceries");
            assert_eq!(content.as_deref(), Some("milk"));
        }
        _ => panic!("expected notes add"),
    }
}

#[test]
fn cli_rejects_unknown_subcommands() {
    assert!(Cli::try_parse_from(["kept", "tasks", "list"]).is_err());
}

#[test]
fn completions_mention_binary_name() {
    let script = String::from_utf8(render_completions(CompletionShell::Bash)).unwrap();
    assert!(script.contains("kept"));
}
