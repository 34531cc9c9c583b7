use std::env;

use kept_core::util::is_http_url;

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfile, CliProfilesConfig};
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            api_base_url,
            user_id,
            access_token,
            max_retries,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            ProfileUpdate {
                api_base_url,
                user_id,
                access_token,
                max_retries,
            },
            no_activate,
        ),
        ConfigCommands::Show { profile } => run_config_show(profile.as_deref().or(global_profile)),
    }
}

/// Values passed to `config init`; `None` keeps what the profile already has.
#[derive(Debug, Default)]
pub struct ProfileUpdate {
    pub api_base_url: Option<String>,
    pub user_id: Option<String>,
    pub access_token: Option<String>,
    pub max_retries: Option<u32>,
}

pub fn run_config_init(
    profile_name: Option<&str>,
    update: ProfileUpdate,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let existing = config.profile(&profile_name).cloned().unwrap_or_default();

    let merged = merge_profile(&existing, update)?;
    *config.profile_mut_or_default(&profile_name) = merged;
    if !no_activate || config.active_profile.is_none() {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!("Saved profile '{profile_name}' to {}", path.display());
    Ok(())
}

/// Explicit values win, then `KEPT_API_BASE_URL`/`KEPT_USER_ID`, then the
/// existing profile.
pub fn merge_profile(existing: &CliProfile, update: ProfileUpdate) -> Result<CliProfile, CliError> {
    let api_base_url = normalize_text_option(update.api_base_url)
        .or_else(|| normalize_text_option(env::var("KEPT_API_BASE_URL").ok()))
        .or_else(|| existing.api_base_url.clone());
    if let Some(url) = api_base_url.as_deref() {
        if !is_http_url(url) {
            return Err(CliError::Config(
                "API base URL must include http:// or https://".to_string(),
            ));
        }
    }
    if update.max_retries == Some(0) {
        return Err(CliError::Config(
            "max retries must be at least 1".to_string(),
        ));
    }

    Ok(CliProfile {
        api_base_url: api_base_url.map(|url| url.trim_end_matches('/').to_string()),
        user_id: normalize_text_option(update.user_id)
            .or_else(|| normalize_text_option(env::var("KEPT_USER_ID").ok()))
            .or_else(|| existing.user_id.clone()),
        access_token: normalize_text_option(update.access_token)
            .or_else(|| existing.access_token.clone()),
        max_retries: update.max_retries.or(existing.max_retries),
    })
}

fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let Some(profile) = config.profile(&profile_name) else {
        println!("Profile '{profile_name}' is not configured");
        return Ok(());
    };

    println!("Profile:      {profile_name}");
    println!(
        "API base URL: {}",
        profile.api_base_url.as_deref().unwrap_or("(unset)")
    );
    println!("User ID:      {}", profile.user_id.as_deref().unwrap_or("(unset)"));
    println!(
        "Access token: {}",
        if profile.access_token.is_some() {
            "[REDACTED]"
        } else {
            "(unset)"
        }
    );
    if let Some(max_retries) = profile.max_retries {
        println!("Max retries:  {max_retries}");
    }
    Ok(())
}
