//! Registry of localization file formats.
//!
//! Every format id maps to a [`FormatSpec`]: which extensions it accepts,
//! whether it keeps one file per locale, and how it names the directory and
//! file of a locale. The naming rule is one of a closed set of [`FormatKind`]s;
//! the generic kind resolves templates, the platform kinds (Android XML, Apple
//! strings/stringsdict) compute names from the locale's region subtag.
//!
//! The registry is built once with [`FormatRegistry::standard`] and handed to
//! whoever needs it; it is never mutated afterwards.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::config::Config;
use crate::contract::{find_default_locale_name, Locale, ServiceError, TranslationService};
use crate::error::SyncError;
use crate::placeholder::Placeholders;

/// How a format lays out per-locale files.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    /// Templates only. Cannot recover a locale from a path.
    Default,
    /// Android resources: `values-de-rDE/strings.xml`.
    Xml,
    /// Apple strings: `de-DE.lproj/Localizable.strings`.
    Strings,
    /// Apple stringsdict: `de-DE.lproj/Localizable.stringsdict`.
    Stringsdict,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    pub id: String,
    pub kind: FormatKind,
    pub extensions: Vec<String>,
    pub locale_aware: bool,
    pub locale_as_extension: bool,
    pub directory_template: String,
    pub filename_template: String,
    pub target_directory: String,
}

static XML_DEFAULT_LOCALE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|/)values/strings\.xml").expect("xml default-locale pattern")
});
static XML_LOCALE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|/)values-([a-z\-_]*)/strings\.xml").expect("xml locale pattern")
});
static LPROJ_LOCALE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|/)([a-z\-_]*)\.lproj/").expect("lproj locale pattern")
});

impl FormatSpec {
    /// A template-driven format: `./phrase.<locale.name>.<ext>`.
    fn generic(id: &str, extension: &str, locale_aware: bool) -> Self {
        FormatSpec {
            id: id.to_string(),
            kind: FormatKind::Default,
            extensions: vec![extension.to_string()],
            locale_aware,
            locale_as_extension: false,
            directory_template: "./".to_string(),
            filename_template: format!("phrase.<locale.name>.{extension}"),
            target_directory: String::new(),
        }
    }

    fn with_kind(mut self, kind: FormatKind) -> Self {
        self.kind = kind;
        self
    }

    fn with_extensions(mut self, extensions: &[&str]) -> Self {
        self.extensions = extensions.iter().map(|e| e.to_string()).collect();
        self
    }

    fn with_templates(mut self, directory: &str, filename: &str) -> Self {
        self.directory_template = directory.to_string();
        self.filename_template = filename.to_string();
        self
    }

    fn with_target(mut self, target: &str) -> Self {
        self.target_directory = target.to_string();
        self
    }

    pub fn accepts_extension(&self, extension: &str) -> bool {
        self.extensions.iter().any(|e| e == extension)
    }

    /// Directory of the locale's file, relative to the target directory.
    pub fn directory_for_locale(&self, config: &Config, locale: &Locale) -> String {
        match self.kind {
            FormatKind::Default => {
                Placeholders::new(config, locale).resolve(&self.directory_template)
            }
            FormatKind::Xml if locale.is_default => "values".to_string(),
            FormatKind::Xml => format!("values-{}", android_region(locale.identifier())),
            FormatKind::Strings | FormatKind::Stringsdict => {
                format!("{}.lproj", apple_region(locale.identifier()))
            }
        }
    }

    /// File name of the locale's file.
    pub fn filename_for_locale(&self, config: &Config, locale: &Locale) -> String {
        match self.kind {
            FormatKind::Default => {
                Placeholders::new(config, locale).resolve(&self.filename_template)
            }
            FormatKind::Xml => "strings.xml".to_string(),
            FormatKind::Strings => "Localizable.strings".to_string(),
            FormatKind::Stringsdict => "Localizable.stringsdict".to_string(),
        }
    }

    /// Recover the locale a file belongs to from its path.
    ///
    /// `Ok(None)` means the path does not encode a locale. Only the Android
    /// default-locale directory needs the service, to ask which locale is the
    /// project default; that lookup is the only source of errors.
    pub async fn extract_locale_from_path<S>(
        &self,
        path: &Path,
        service: &S,
    ) -> Result<Option<String>, ServiceError>
    where
        S: TranslationService + ?Sized,
    {
        let path = path.to_string_lossy().replace('\\', "/");
        let extracted = match self.kind {
            FormatKind::Default => None,
            FormatKind::Xml => {
                if XML_DEFAULT_LOCALE_PATH.is_match(&path) {
                    return find_default_locale_name(service).await;
                }
                XML_LOCALE_PATH
                    .captures(&path)
                    .map(|caps| unregion_android(&caps[1]))
            }
            FormatKind::Strings | FormatKind::Stringsdict => LPROJ_LOCALE_PATH
                .captures(&path)
                .map(|caps| caps[1].to_string()),
        };
        debug!(format = %self.id, path = %path, locale = ?extracted, "Extracted locale from path");
        Ok(extracted.filter(|locale| !locale.is_empty()))
    }
}

/// `de-DE` → `de-rDE`, `de` → `de`.
fn android_region(identifier: &str) -> String {
    match split_region(identifier) {
        Some((primary, region)) => format!("{primary}-r{}", region.to_uppercase()),
        None => identifier.to_string(),
    }
}

/// `de-rDE` → `de-DE`, anything else unchanged.
fn unregion_android(tag: &str) -> String {
    match (tag.split("-r").next(), tag.split("-r").last()) {
        (Some(primary), Some(region)) if tag.contains("-r") => format!("{primary}-{region}"),
        _ => tag.to_string(),
    }
}

/// `fr-fr` → `fr-FR`; Chinese keeps a title-cased script/region: `ZH-cn` → `zh-Cn`.
fn apple_region(identifier: &str) -> String {
    let Some((primary, region)) = split_region(identifier) else {
        return identifier.to_string();
    };
    if primary.to_lowercase().starts_with("zh") {
        let mut chars = region.chars();
        let titled: String = match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        };
        format!("{}-{titled}", primary.to_lowercase())
    } else {
        format!("{primary}-{}", region.to_uppercase())
    }
}

/// First and last `-` separated subtags, when there is more than one.
fn split_region(identifier: &str) -> Option<(&str, &str)> {
    if !identifier.contains('-') {
        return None;
    }
    let primary = identifier.split('-').next()?;
    let region = identifier.split('-').last()?;
    Some((primary, region))
}

/// Lower-cased extension of a path without the dot, empty when there is none.
pub fn file_extension(path: &Path) -> String {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default()
}

/// Immutable table of every supported format, keyed by id.
#[derive(Debug, Clone)]
pub struct FormatRegistry {
    formats: BTreeMap<String, FormatSpec>,
}

impl FormatRegistry {
    /// Build a registry from a list of formats. Later duplicates of an id are
    /// rejected so ids stay unique.
    pub fn new(formats: impl IntoIterator<Item = FormatSpec>) -> Self {
        let mut table = BTreeMap::new();
        for spec in formats {
            debug_assert!(
                !spec.extensions.is_empty() || spec.locale_as_extension,
                "format {} needs an extension",
                spec.id
            );
            table.entry(spec.id.clone()).or_insert(spec);
        }
        FormatRegistry { formats: table }
    }

    /// Every format the service can export and import.
    pub fn standard() -> Self {
        use FormatSpec as F;
        FormatRegistry::new([
            F::generic("json", "json", false),
            F::generic("csv", "csv", false),
            F::generic("gettext", "po", true)
                .with_templates("./<locale.name>/", "<domain>.po")
                .with_target("locales/"),
            F::generic("gettext_template", "pot", false).with_templates("./", "phrase.pot"),
            F::generic("ini", "ini", false),
            F::generic("properties", "properties", true),
            F::generic("properties_xml", "xml", false),
            F::generic("plist", "plist", true),
            F::generic("qph", "qph", true),
            F::generic("ts", "ts", true),
            F::generic("resx", "resx", false),
            F::generic("resx_windowsphone", "resx", false),
            F::generic("windows8_resource", "resw", false),
            F::generic("simple_json", "json", false),
            F::generic("nested_json", "json", false),
            F::generic("node_json", "js", false)
                .with_templates("./", "<locale.name>.js")
                .with_target("locales/"),
            F::generic("strings", "strings", true)
                .with_kind(FormatKind::Strings)
                .with_templates("", "")
                .with_target("./"),
            F::generic("stringsdict", "stringsdict", true)
                .with_kind(FormatKind::Stringsdict)
                .with_templates("", "")
                .with_target("./"),
            F::generic("xml", "xml", true)
                .with_kind(FormatKind::Xml)
                .with_templates("", "")
                .with_target("res/"),
            F::generic("xlf", "xlf", true).with_extensions(&["xlf", "xliff"]),
            F::generic("tmx", "tmx", false),
            F::generic("yml", "yml", true),
            F::generic("yml_symfony", "yml", false),
            F::generic("yml_symfony2", "yml", false),
            F::generic("php_array", "php", false),
            F::generic("angular_translate", "json", false),
            F::generic("laravel", "php", false),
            F::generic("mozilla_properties", "properties", true),
            F::generic("go_i18n", "json", false)
                .with_templates("./", "<locale.name>.all.json")
                .with_target("locales/"),
            FormatSpec {
                locale_as_extension: true,
                ..F::generic("play_properties", "", false)
                    .with_extensions(&[])
                    .with_templates("./", "messages.<locale.code>")
            },
        ])
    }

    pub fn get(&self, id: &str) -> Option<&FormatSpec> {
        self.formats.get(id)
    }

    /// Like [`get`](Self::get), but an unknown id is a configuration error.
    pub fn require(&self, id: &str) -> Result<&FormatSpec, SyncError> {
        self.get(id)
            .ok_or_else(|| SyncError::UnknownFormat(id.to_string()))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FormatSpec> {
        self.formats.values()
    }

    /// Every extension accepted by at least one format.
    pub fn supported_extensions(&self) -> BTreeSet<&str> {
        self.iter()
            .flat_map(|spec| spec.extensions.iter().map(String::as_str))
            .collect()
    }

    /// Whether the given format id names its files after the locale code.
    pub fn renders_locale_as_extension(&self, id: &str) -> bool {
        self.get(id).is_some_and(|spec| spec.locale_as_extension)
    }

    /// Guess a file's format from its extension: an extension that is itself a
    /// format id wins, otherwise the first format (by id) listing it.
    pub fn guess_from_extension(&self, path: &Path) -> Option<&FormatSpec> {
        let extension = file_extension(path);
        if extension.is_empty() {
            return None;
        }
        self.get(&extension)
            .or_else(|| self.iter().find(|spec| spec.accepts_extension(&extension)))
    }
}

impl Default for FormatRegistry {
    fn default() -> Self {
        FormatRegistry::standard()
    }
}
