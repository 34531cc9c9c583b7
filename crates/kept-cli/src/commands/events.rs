use chrono::Utc;
use kept_core::models::{EventPatch, NewEvent, RepeatInterval};
use kept_core::optimistic::is_temporary_id;

use crate::cli::EventCommands;
use crate::commands::common::{
    format_event_lines, normalize_id, normalize_title, parse_date, print_written,
    queued_on_failure, GlobalOptions, Session,
};
use crate::error::CliError;

pub async fn run_events(command: EventCommands, options: &GlobalOptions) -> Result<(), CliError> {
    let session = Session::open(options, true).await?;
    let events = session.client.events();

    match command {
        EventCommands::List { args } => {
            let mut items = events.list(session.user_id()?).await?;
            if !args.all {
                items.retain(|event| !event.is_archived);
            }
            items.sort_by_key(|event| event.date);
            if args.json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for line in format_event_lines(&items) {
                    println!("{line}");
                }
            }
        }
        EventCommands::Show { id, json } => {
            let id = normalize_id(&id)?;
            let event = events
                .get(&id)
                .await?
                .ok_or_else(|| CliError::NotFound("Event", id.clone()))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&event)?);
                return Ok(());
            }
            println!("{}", event.title);
            println!("Date:    {}", event.date.format("%Y-%m-%d %H:%M UTC"));
            println!("Repeats: {}", event.repeat);
            if let Some(next) = event.next_occurrence(Utc::now()) {
                println!("Next:    {}", next.format("%Y-%m-%d %H:%M UTC"));
            }
            if !event.description.trim().is_empty() {
                println!();
                println!("{}", event.description);
            }
        }
        EventCommands::Add {
            title,
            date,
            description,
            repeat,
        } => {
            let input = NewEvent {
                user_id: session.user_id()?.to_string(),
                title: normalize_title(&title)?,
                description: description.unwrap_or_default(),
                date: parse_date(&date)?,
                repeat: repeat.parse::<RepeatInterval>()?,
            };
            let event = queued_on_failure(events.create(&input).await)?;
            println!("{}", event.id);
            if is_temporary_id(&event.id) {
                eprintln!("Saved offline; run `kept sync` once connected.");
            }
        }
        EventCommands::Edit {
            id,
            title,
            description,
            date,
            repeat,
        } => {
            let id = normalize_id(&id)?;
            let patch = EventPatch {
                title: title.as_deref().map(normalize_title).transpose()?,
                description,
                date: date.as_deref().map(parse_date).transpose()?,
                repeat: repeat
                    .as_deref()
                    .map(str::parse::<RepeatInterval>)
                    .transpose()?,
                is_archived: None,
            };
            if patch == EventPatch::default() {
                return Err(CliError::EmptyPatch);
            }
            let updated = queued_on_failure(events.update(&id, &patch).await)?;
            print_written(&session, "Event", &id, updated)?;
        }
        EventCommands::Archive { id } => {
            let id = normalize_id(&id)?;
            let archived = queued_on_failure(events.archive(&id).await)?;
            print_written(&session, "Event", &id, archived)?;
        }
        EventCommands::Restore { id } => {
            let id = normalize_id(&id)?;
            let restored = queued_on_failure(events.restore(&id).await)?;
            print_written(&session, "Event", &id, restored)?;
        }
        EventCommands::Delete { id } => {
            let id = normalize_id(&id)?;
            queued_on_failure(events.delete(&id).await)?;
            println!("{id}");
        }
    }

    Ok(())
}
