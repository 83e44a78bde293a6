use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

pub const SETTINGS_FILE: &str = "settings.json";
pub const CLIENT_ID_VAR: &str = "MONZO_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "MONZO_CLIENT_SECRET";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed settings file {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to read {0} from stdin: {1}")]
    Prompt(&'static str, #[source] std::io::Error),
    #[error("{0} must not be empty")]
    Empty(&'static str),
}

/// OAuth client credentials registered with the Monzo developer portal.
///
/// Field names match the `settings.json` files written by earlier versions
/// (`ClientId` / `ClientSecret`).
#[derive(Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "PascalCase")]
pub struct Settings {
    pub client_id: String,
    pub client_secret: String,
}

// Keep the secret out of logs
impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

impl Settings {
    pub fn new(client_id: &str, client_secret: &str) -> Result<Self, SettingsError> {
        let settings = Self {
            client_id: client_id.trim().to_string(),
            client_secret: client_secret.trim().to_string(),
        };
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.client_id.is_empty() {
            return Err(SettingsError::Empty("clientId"));
        }
        if self.client_secret.is_empty() {
            return Err(SettingsError::Empty("clientSecret"));
        }
        Ok(())
    }

    /// Credentials from the environment, when both variables are set
    pub fn from_env() -> Option<Result<Self, SettingsError>> {
        let client_id = std::env::var(CLIENT_ID_VAR).ok()?;
        let client_secret = std::env::var(CLIENT_SECRET_VAR).ok()?;
        Some(Self::new(&client_id, &client_secret))
    }

    /// `Ok(None)` when the file does not exist
    pub fn read_file(path: &Path) -> Result<Option<Self>, SettingsError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(SettingsError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let settings: Settings =
            serde_json::from_str(&content).map_err(|source| SettingsError::Malformed {
                path: path.to_path_buf(),
                source,
            })?;
        settings.validate()?;
        Ok(Some(settings))
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self).map_err(|source| SettingsError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, format!("{json}\n")).map_err(|source| SettingsError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Ask for the credentials interactively
    pub fn prompt<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<Self, SettingsError> {
        let client_id = prompt_line(input, output, "clientId")?;
        let client_secret = prompt_line(input, output, "clientSecret")?;
        Self::new(&client_id, &client_secret)
    }
}

fn prompt_line<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    label: &'static str,
) -> Result<String, SettingsError> {
    write!(output, "Enter {}: ", label).map_err(|e| SettingsError::Prompt(label, e))?;
    output.flush().map_err(|e| SettingsError::Prompt(label, e))?;
    let mut line = String::new();
    input
        .read_line(&mut line)
        .map_err(|e| SettingsError::Prompt(label, e))?;
    Ok(line.trim().to_string())
}

/// Resolve credentials: environment, then `settings.json` in `dir`, then an
/// interactive prompt whose answers are saved to `settings.json`.
pub fn load_settings<R: BufRead, W: Write>(
    dir: &Path,
    input: &mut R,
    output: &mut W,
) -> Result<Settings, SettingsError> {
    if let Some(settings) = Settings::from_env() {
        debug!("Using client credentials from {}", CLIENT_ID_VAR);
        return settings;
    }

    let path = dir.join(SETTINGS_FILE);
    if let Some(settings) = Settings::read_file(&path)? {
        debug!("Loaded settings from {}", path.display());
        return Ok(settings);
    }

    let settings = Settings::prompt(input, output)?;
    settings.save(&path)?;
    info!("Saved settings to {}", path.display());
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_read_legacy_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, r#"{"ClientId":"oauthclient_1","ClientSecret":"s3cret"}"#).unwrap();

        let settings = Settings::read_file(&path).unwrap().unwrap();
        assert_eq!(settings.client_id, "oauthclient_1");
        assert_eq!(settings.client_secret, "s3cret");
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let result = Settings::read_file(&dir.path().join(SETTINGS_FILE)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "{not json").unwrap();

        let err = Settings::read_file(&path).unwrap_err();
        assert!(matches!(err, SettingsError::Malformed { .. }));
    }

    #[test]
    fn test_prompt_trims_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        let mut input = Cursor::new("  oauthclient_2 \nsecret_2\r\n");
        let mut output = Vec::new();

        let settings = Settings::prompt(&mut input, &mut output).unwrap();
        settings.save(&path).unwrap();

        let prompt = String::from_utf8(output).unwrap();
        assert!(prompt.contains("Enter clientId: "));
        assert!(prompt.contains("Enter clientSecret: "));
        assert_eq!(settings.client_id, "oauthclient_2");
        assert_eq!(settings.client_secret, "secret_2");
        assert_eq!(Settings::read_file(&path).unwrap(), Some(settings));
    }

    #[test]
    fn test_empty_values_rejected() {
        let mut input = Cursor::new("\n\n");
        let mut output = Vec::new();
        let err = Settings::prompt(&mut input, &mut output).unwrap_err();
        assert!(matches!(err, SettingsError::Empty("clientId")));

        assert!(matches!(Settings::new("id", "  "), Err(SettingsError::Empty("clientSecret"))));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let settings = Settings::new("id", "hunter2").unwrap();
        let shown = format!("{:?}", settings);
        assert!(shown.contains("id"));
        assert!(!shown.contains("hunter2"));
    }
}
