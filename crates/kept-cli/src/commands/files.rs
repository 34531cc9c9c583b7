use std::path::Path;

use kept_core::models::{FilePatch, FileUpload};

use crate::cli::FileCommands;
use crate::commands::common::{
    format_file_lines, normalize_id, normalize_title, print_written, queued_on_failure,
    GlobalOptions, Session,
};
use crate::error::CliError;

pub async fn run_files(command: FileCommands, options: &GlobalOptions) -> Result<(), CliError> {
    let session = Session::open(options, true).await?;
    let files = session.client.files();

    match command {
        FileCommands::List { json } => {
            let items = files.list(session.user_id()?).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&items)?);
            } else {
                for line in format_file_lines(&items) {
                    println!("{line}");
                }
            }
        }
        FileCommands::Upload { path, name, mime } => {
            let upload = build_upload(session.user_id()?, &path, name, mime)?;
            let record = files.upload(&upload).await?;
            println!("{}", record.id);
        }
        FileCommands::Url { id } => {
            let id = normalize_id(&id)?;
            let file = files
                .get(&id)
                .await?
                .ok_or_else(|| CliError::NotFound("File", id.clone()))?;
            println!("{}", files.download_url(&file.path).await?);
        }
        FileCommands::Rename { id, name } => {
            let id = normalize_id(&id)?;
            let patch = FilePatch {
                name: Some(normalize_title(&name)?),
                path: None,
            };
            let renamed = queued_on_failure(files.update(&id, &patch).await)?;
            print_written(&session, "File", &id, renamed)?;
        }
        FileCommands::Delete { id } => {
            let id = normalize_id(&id)?;
            queued_on_failure(files.delete(&id).await)?;
            println!("{id}");
        }
    }

    Ok(())
}

/// Read a local file into an upload request, guessing the name and MIME type
/// from the path when they are not given.
pub fn build_upload(
    user_id: &str,
    path: &Path,
    name: Option<String>,
    mime: Option<String>,
) -> Result<FileUpload, CliError> {
    let name = name
        .or_else(|| {
            path.file_name()
                .map(|file_name| file_name.to_string_lossy().into_owned())
        })
        .unwrap_or_default();
    let mime = mime.unwrap_or_else(|| {
        mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });
    let bytes = std::fs::read(path)?;
    Ok(FileUpload::new(user_id, name, mime, bytes)?)
}
