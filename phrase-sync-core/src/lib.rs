#![doc = "phrase-sync-core: core logic library for phrase-sync."]

//! This crate holds everything that decides *where* localization files go and
//! *how* they move: the format registry, path and locale resolution, UTF-16
//! normalization, and the pull/push orchestrators.
//! It never speaks HTTP; the service is reached through
//! [`contract::TranslationService`], implemented by the `phrase-sync` crate and
//! by mocks in tests.

pub mod config;
pub mod contract;
pub mod encoding;
pub mod error;
pub mod formats;
pub mod paths;
pub mod placeholder;
pub mod pull;
pub mod push;

pub use config::{Config, LocaleConfig};
pub use contract::{Locale, TranslationService};
pub use error::{SyncError, UnitError};
pub use formats::{FormatKind, FormatRegistry, FormatSpec};
pub use paths::PathResolver;
pub use pull::{DownloadSpec, PullOrchestrator, PullReport};
pub use push::{PushOrchestrator, PushReport, UploadSpec};
