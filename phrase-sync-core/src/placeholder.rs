//! `<token>` substitution for user-supplied directory and filename templates.

use crate::config::Config;
use crate::contract::Locale;

pub const DOMAIN: &str = "<domain>";
pub const FORMAT: &str = "<format>";
pub const LOCALE_NAME: &str = "<locale.name>";
pub const LOCALE_CODE: &str = "<locale.code>";
pub const LOCALE: &str = "<locale>";

/// Replace every occurrence of each token with its value.
///
/// An empty template stays empty; callers use that as "not overridden".
pub fn resolve(template: &str, substitutions: &[(&str, &str)]) -> String {
    if template.is_empty() {
        return String::new();
    }
    substitutions
        .iter()
        .fold(template.to_string(), |acc, (token, value)| {
            acc.replace(token, value)
        })
}

/// The token values of one project/locale pair.
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    entries: [(&'static str, &'a str); 5],
}

impl<'a> Placeholders<'a> {
    pub fn new(config: &'a Config, locale: &'a Locale) -> Self {
        Placeholders {
            entries: [
                (DOMAIN, config.domain.as_str()),
                (FORMAT, config.format.as_str()),
                (LOCALE_NAME, locale.name.as_str()),
                (LOCALE_CODE, locale.code.as_str()),
                (LOCALE, locale.name.as_str()),
            ],
        }
    }

    pub fn resolve(&self, template: &str) -> String {
        resolve(template, &self.entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Config, Locale) {
        let config = Config {
            domain: "app".into(),
            format: "yml".into(),
            ..Config::default()
        };
        let locale = Locale {
            name: "de".into(),
            code: "de-DE".into(),
            ..Locale::default()
        };
        (config, locale)
    }

    #[test]
    fn replaces_every_token() {
        let (config, locale) = sample();
        let placeholders = Placeholders::new(&config, &locale);
        assert_eq!(
            placeholders.resolve("./<locale>/<domain>.<locale.code>.<format>"),
            "./de/app.de-DE.yml"
        );
        assert_eq!(placeholders.resolve("<locale.name>-<locale.name>"), "de-de");
    }

    #[test]
    fn empty_template_is_not_overridden() {
        let (config, locale) = sample();
        assert_eq!(Placeholders::new(&config, &locale).resolve(""), "");
    }

    #[test]
    fn resolving_twice_changes_nothing() {
        let (config, locale) = sample();
        let placeholders = Placeholders::new(&config, &locale);
        for template in ["<domain>.<locale>.yml", "plain", "<format>/<locale.code>/x"] {
            let once = placeholders.resolve(template);
            assert_eq!(placeholders.resolve(&once), once, "template {template}");
        }
    }
}
