use crate::cli::TokenCommands;
use crate::commands::common::read_piped_stdin;
use crate::config_profiles::{normalize_text_option, CliProfilesConfig};
use crate::credentials::{resolve_token, TokenStore, TOKEN_ENV_VAR};
use crate::error::CliError;

pub fn run_token(command: TokenCommands, global_profile: Option<&str>) -> Result<(), CliError> {
    match command {
        TokenCommands::Set { profile, token } => {
            let profile_name = resolve_profile(profile.as_deref().or(global_profile))?;
            let token = match normalize_text_option(token) {
                Some(token) => token,
                None => read_piped_stdin()?.ok_or_else(|| {
                    CliError::Credentials(
                        "pass --token or pipe the token on stdin".to_string(),
                    )
                })?,
            };
            TokenStore::new(&profile_name).save(&token)?;
            println!("Token stored for profile '{profile_name}'");
            Ok(())
        }
        TokenCommands::Status { profile } => {
            let profile_name = resolve_profile(profile.as_deref().or(global_profile))?;
            match resolve_token(&profile_name)? {
                Some((_, source)) => {
                    println!("Token available for '{profile_name}' from {}", source.describe());
                }
                None => println!("No token for '{profile_name}'"),
            }
            Ok(())
        }
        TokenCommands::Clear { profile } => {
            let profile_name = resolve_profile(profile.as_deref().or(global_profile))?;
            TokenStore::new(&profile_name).clear()?;
            println!("Token cleared for profile '{profile_name}'");
            if std::env::var_os(TOKEN_ENV_VAR).is_some() {
                println!("{TOKEN_ENV_VAR} is still set in the environment");
            }
            Ok(())
        }
    }
}

fn resolve_profile(explicit: Option<&str>) -> Result<String, CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    Ok(config.resolve_profile_name(explicit))
}
