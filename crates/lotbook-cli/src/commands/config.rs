use std::env;

use crate::cli::ConfigCommands;
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::credentials::resolve_token;
use crate::error::CliError;

pub fn run_config(command: ConfigCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            profile,
            gist_id,
            filename,
            api_base_url,
            no_activate,
        } => run_config_init(
            profile.as_deref().or(global_profile),
            gist_id,
            filename,
            api_base_url,
            no_activate,
        ),
        ConfigCommands::Show { profile } => run_config_show(profile.as_deref().or(global_profile)),
    }
}

#[allow(clippy::needless_pass_by_value)]
pub fn run_config_init(
    profile_name: Option<&str>,
    gist_id: Option<String>,
    filename: Option<String>,
    api_base_url: Option<String>,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let gist_id = normalize_text_option(gist_id)
        .or_else(|| normalize_text_option(env::var("LOTBOOK_GIST_ID").ok()));
    let filename = normalize_text_option(filename);
    let api_base_url = normalize_text_option(api_base_url)
        .or_else(|| normalize_text_option(env::var("LOTBOOK_API_BASE_URL").ok()));

    let profile = config.profile_mut_or_default(&profile_name);
    if let Some(value) = gist_id {
        profile.gist_id = Some(value);
    }
    if let Some(value) = filename {
        profile.filename = Some(value);
    }
    if let Some(value) = api_base_url {
        profile.api_base_url = Some(value);
    }
    profile.validate().map_err(CliError::Config)?;
    let missing_gist = profile.gist_id().is_none();

    if !no_activate {
        config.active_profile = Some(profile_name.clone());
    }

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    if missing_gist {
        println!("Profile '{profile_name}' is missing: gist_id");
    } else if resolve_token(&profile_name)?.is_none() {
        println!("Profile '{profile_name}' has no token yet. Run `lotbook token set`.");
    } else {
        println!("Profile '{profile_name}' is ready. Run `lotbook sync`.");
    }

    Ok(())
}

pub fn run_config_show(profile_name: Option<&str>) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);
    let profile = config.profile(&profile_name).cloned().unwrap_or_default();
    let token = resolve_token(&profile_name)?;

    println!("Profile:  {profile_name}");
    println!(
        "Gist id:  {}",
        profile.gist_id().unwrap_or_else(|| "(not set)".to_string())
    );
    println!("Filename: {}", profile.filename());
    println!("API:      {}", profile.api_base_url());
    println!(
        "Token:    {}",
        token.map_or_else(
            || "(not set)".to_string(),
            |(_, source)| format!("set ({})", source.describe())
        )
    );
    Ok(())
}
