use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info};

pub const DEFAULT_DOMAIN: &str = "phrase";
pub const DEFAULT_LOCALE: &str = "en";

/// Project-wide defaults shared by pull and push.
///
/// `locale_directory` and `locale_filename` are templates (see
/// [`crate::placeholder`]); an empty value means "use the format's rule".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub default_locale: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub domain: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub format: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub target_directory: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub locale_directory: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub locale_filename: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub encoding: String,
}

impl Config {
    /// Fill in the defaults for domain and default locale.
    pub fn with_defaults(mut self) -> Self {
        if self.domain.is_empty() {
            self.domain = DEFAULT_DOMAIN.to_string();
        }
        if self.default_locale.is_empty() {
            self.default_locale = DEFAULT_LOCALE.to_string();
        }
        self
    }

    pub fn trace_loaded(&self) {
        info!(
            format = %self.format,
            domain = %self.domain,
            default_locale = %self.default_locale,
            "Loaded Config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

/// A [`Config`] specialized for one locale. All path fields are concrete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleConfig {
    pub config: Config,
    pub locale_directory: String,
    pub locale_filename: String,
    pub target_directory: String,
}

impl LocaleConfig {
    /// Directory the locale file lives in.
    pub fn folder(&self) -> PathBuf {
        PathBuf::from(&self.target_directory).join(&self.locale_directory)
    }

    /// Full destination path of the locale file.
    pub fn path(&self) -> PathBuf {
        self.folder().join(&self.locale_filename)
    }
}
