/// `load_config` module: reads and writes the project's `.phrase` JSON file.
///
/// The file holds the project secret next to the shared [`Config`] fields, flat
/// in one JSON object:
///
/// ```json
/// {
///   "secret": "abcd1234",
///   "default_locale": "en",
///   "domain": "phrase",
///   "format": "yml"
/// }
/// ```
///
/// # Responsibilities
/// - A missing file is not an error: every field takes its default.
/// - Fill in the defaults for `domain` (`phrase`) and `default_locale` (`en`).
/// - Fall back to the `PHRASE_SECRET` environment variable when no secret is
///   stored.
/// - Write the file back for `init`, omitting empty optional fields.
///
/// # Errors
/// Unreadable or malformed files surface as `anyhow::Error` at the CLI boundary.
use anyhow::Result;
use phrase_sync_core::config::Config;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{error, info};

pub const DEFAULT_CONFIG_PATH: &str = ".phrase";
pub const SECRET_ENV: &str = "PHRASE_SECRET";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project auth token.
    #[serde(default)]
    pub secret: String,
    #[serde(flatten)]
    pub config: Config,
}

/// Load the project config from `path`, applying defaults.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<ProjectConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let mut project = if path_ref.exists() {
        let content = match fs::read_to_string(path_ref) {
            Ok(content) => content,
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
                return Err(anyhow::anyhow!(
                    "Failed to read config file {}: {e}",
                    path_ref.display()
                ));
            }
        };
        match serde_json::from_str::<ProjectConfig>(&content) {
            Ok(project) => {
                info!(config_path = ?path_ref, "Parsed config JSON successfully");
                project
            }
            Err(e) => {
                error!(error = ?e, config_path = ?path_ref, "Failed to parse config JSON");
                return Err(anyhow::anyhow!(
                    "Failed to parse config JSON in {}: {e}",
                    path_ref.display()
                ));
            }
        }
    } else {
        info!(config_path = ?path_ref, "No config file found, using defaults");
        ProjectConfig::default()
    };

    project.config = project.config.with_defaults();
    if project.secret.is_empty() {
        if let Ok(secret) = std::env::var(SECRET_ENV) {
            info!(env = SECRET_ENV, "Using secret from environment");
            project.secret = secret;
        }
    }
    project.config.trace_loaded();
    Ok(project)
}

/// Write the project config to `path` as pretty JSON, replacing the file.
pub fn save_config<P: AsRef<Path>>(path: P, project: &ProjectConfig) -> Result<()> {
    let path_ref = path.as_ref();
    let json = serde_json::to_string_pretty(project)?;
    write_private(path_ref, json.as_bytes()).map_err(|e| {
        error!(error = ?e, config_path = ?path_ref, "Failed to save config file");
        anyhow::anyhow!("Error encountered while saving the file: {e}")
    })?;
    info!(config_path = ?path_ref, "Saved configuration");
    Ok(())
}

#[cfg(unix)]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .mode(0o660)
        .open(path)?;
    file.write_all(bytes)
}

#[cfg(not(unix))]
fn write_private(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    fs::write(path, bytes)
}
