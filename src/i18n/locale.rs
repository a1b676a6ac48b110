//! Locale type: the two content variants served by the site.
//!
//! A `Locale` is the value persisted in the locale store and the key into the
//! translation catalog. Path and metadata lookups go through the registry so
//! that root paths are defined in exactly one place.

use crate::i18n::{LocaleConfig, LocaleRegistry};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A supported locale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    /// English, served from `/`
    En,
    /// Simplified Chinese, served from `/zh/`
    Zh,
}

impl Locale {
    /// Every locale, canonical first.
    pub const ALL: [Locale; 2] = [Locale::En, Locale::Zh];

    /// Parse a stored or configured locale code.
    ///
    /// Only the exact lowercase codes `"en"` and `"zh"` are accepted; anything
    /// else (including region-qualified tags) returns `None`.
    pub fn from_code(code: &str) -> Option<Locale> {
        match code {
            "en" => Some(Locale::En),
            "zh" => Some(Locale::Zh),
            _ => None,
        }
    }

    /// Derive the locale a path is served in.
    ///
    /// Only the reserved `/zh/` prefix is significant; every other path
    /// belongs to the canonical locale.
    pub fn from_path(path: &str) -> Locale {
        LocaleRegistry::get()
            .list_enabled()
            .into_iter()
            .find(|config| !config.is_canonical && path.starts_with(config.root_path))
            .map(|config| config.locale)
            .unwrap_or_else(Locale::canonical)
    }

    /// Whether a browser-reported language tag asks for this locale.
    ///
    /// Matching is by prefix (`zh-CN`, `zh-Hant-TW` and `zh` all select
    /// Chinese) and ignores ASCII case.
    pub fn matches_language_tag(self, tag: &str) -> bool {
        let code = self.code();
        tag.get(..code.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(code))
    }

    /// The canonical locale (English).
    pub fn canonical() -> Locale {
        LocaleRegistry::get().canonical().locale
    }

    /// The other locale, used by the language switcher.
    pub fn other(self) -> Locale {
        match self {
            Locale::En => Locale::Zh,
            Locale::Zh => Locale::En,
        }
    }

    /// ISO 639-1 code (`"en"` or `"zh"`).
    pub fn code(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Zh => "zh",
        }
    }

    /// Registry metadata for this locale.
    pub fn config(self) -> &'static LocaleConfig {
        LocaleRegistry::get().config_for(self)
    }

    /// Root path the locale is served from.
    pub fn root_path(self) -> &'static str {
        self.config().root_path
    }

    /// Native display name (e.g. "中文").
    pub fn native_name(self) -> &'static str {
        self.config().native_name
    }

    /// Whether the locale is written in a logographic script.
    pub fn is_logographic(self) -> bool {
        self.config().logographic
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
