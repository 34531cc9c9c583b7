use kept_core::models::{NewNote, NotePatch};
use kept_core::optimistic::is_temporary_id;

use crate::cli::NoteCommands;
use crate::commands::common::{
    format_note_lines, normalize_id, normalize_title, print_written, queued_on_failure,
    GlobalOptions, Session,
};
use crate::error::CliError;

pub async fn run_notes(command: NoteCommands, options: &GlobalOptions) -> Result<(), CliError> {
    let session = Session::open(options, true).await?;
    let notes = session.client.notes();

    match command {
        NoteCommands::List { args } => {
            let mut items = notes.list(session.user_id()?).await?;
            if !args.all {
                items.retain(|note| !note.is_archived);
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for line in format_note_lines(&items) {
                    println!("{line}");
                }
            }
        }
        NoteCommands::Show { id, json } => {
            let id = normalize_id(&id)?;
            let note = notes
                .get(&id)
                .await?
                .ok_or_else(|| CliError::NotFound("Note", id.clone()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&note)?);
            } else {
                println!("{}", note.title);
                if !note.content.trim().is_empty() {
                    println!();
                    println!("{}", note.content);
                }
            }
        }
        NoteCommands::Add { title, content } => {
            let input = NewNote::new(session.user_id()?, normalize_title(&title)?)
                .with_content(content.unwrap_or_default());
            let note = queued_on_failure(notes.create(&input).await)?;
            println!("{}", note.id);
            if is_temporary_id(&note.id) {
                eprintln!("Saved offline; run `kept sync` once connected.");
            }
        }
        NoteCommands::Edit { id, title, content } => {
            let id = normalize_id(&id)?;
            if title.is_none() && content.is_none() {
                return Err(CliError::EmptyPatch);
            }
            let patch = NotePatch {
                title: title.as_deref().map(normalize_title).transpose()?,
                content,
                is_archived: None,
            };
            let updated = queued_on_failure(notes.update(&id, &patch).await)?;
            print_written(&session, "Note", &id, updated)?;
        }
        NoteCommands::Archive { id } => {
            let id = normalize_id(&id)?;
            let archived = queued_on_failure(notes.archive(&id).await)?;
            print_written(&session, "Note", &id, archived)?;
        }
        NoteCommands::Restore { id } => {
            let id = normalize_id(&id)?;
            let restored = queued_on_failure(notes.restore(&id).await)?;
            print_written(&session, "Note", &id, restored)?;
        }
        NoteCommands::Delete { id } => {
            let id = normalize_id(&id)?;
            queued_on_failure(notes.delete(&id).await)?;
            println!("{id}");
        }
    }

    Ok(())
}
