//! CLI-specific configuration: thin wrappers around `hechte_config` that
//! apply global flag overrides.
//!
//! Core never sees these types -- it receives a pre-built `ClientConfig`.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use hechte_config::{Config, ConfigError, Profile};
use hechte_core::{ClientConfig, Timeline};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use hechte_config::{config_path, load_config, load_config_or_default, save_config};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    hechte_config::active_profile_name(global.profile.as_deref(), config)
}

/// The active profile, or an empty one when none is configured.
///
/// Naming a profile explicitly that does not exist is an error.
pub fn active_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    if let Some(profile) = config.profiles.get(&name) {
        return Ok((name, profile.clone()));
    }
    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            available: available_profiles(config),
            name,
        });
    }
    Ok((name, Profile::default()))
}

pub fn available_profiles(config: &Config) -> String {
    let mut names: Vec<_> = config.profiles.keys().cloned().collect();
    if names.is_empty() {
        return "(none)".into();
    }
    names.sort();
    names.join(", ")
}

/// Translate the config file, active profile and global flags into a
/// `ClientConfig`.
///
/// A profile without credentials still resolves, with an empty username
/// and password; use [`ensure_account`] before polling a timeline that
/// needs one. This is the single boundary where CLI config types cross
/// into core types.
pub fn resolve_client_config(global: &GlobalOpts) -> Result<(String, ClientConfig), CliError> {
    let cfg = load_config()?;
    let (profile_name, mut profile) = active_profile(global, &cfg)?;

    // Flags win over the profile
    if let Some(ref url) = global.base_url {
        profile.base_url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let client =
        match hechte_config::profile_to_client_config(&profile, &profile_name, &cfg.defaults) {
            Ok(client) => client,
            Err(ConfigError::NoCredentials { .. }) => anonymous_client_config(&profile, &cfg)?,
            Err(err) => return Err(err.into()),
        };

    tracing::debug!(
        profile = %profile_name,
        base_url = %client.base_url,
        username = %client.username,
        "resolved client config"
    );
    Ok((profile_name, client))
}

fn anonymous_client_config(profile: &Profile, cfg: &Config) -> Result<ClientConfig, CliError> {
    Ok(ClientConfig {
        base_url: hechte_config::parse_base_url(&profile.base_url)?,
        username: String::new(),
        password: SecretString::from(String::new()),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(cfg.defaults.timeout)),
        poller: hechte_config::poller_config(profile, &cfg.defaults)?,
    })
}

pub fn is_anonymous(client: &ClientConfig) -> bool {
    client.username.is_empty() || client.password.expose_secret().is_empty()
}

/// Fail unless `client` can read `timeline`. Only the public timeline
/// is readable without an account.
pub fn ensure_account(
    profile_name: &str,
    client: &ClientConfig,
    timeline: Timeline,
) -> Result<(), CliError> {
    if timeline != Timeline::Everyone && is_anonymous(client) {
        return Err(CliError::NoCredentials {
            profile: profile_name.into(),
        });
    }
    Ok(())
}
