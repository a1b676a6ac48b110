//! Locale registry: Single source of truth for the site's locales.
//!
//! This module provides a centralized registry of the locales the site is
//! published in, with their root paths and display metadata. It uses a
//! singleton pattern with `OnceLock` to ensure thread-safe initialization
//! and access.

use crate::i18n::Locale;
use std::sync::OnceLock;

/// Configuration for a supported locale.
#[derive(Debug, Clone)]
pub struct LocaleConfig {
    /// The locale this entry describes
    pub locale: Locale,

    /// Native name of the locale (e.g., "English", "中文")
    pub native_name: &'static str,

    /// Root path the locale is served from (e.g., "/", "/zh/")
    pub root_path: &'static str,

    /// Whether this is the canonical locale (only one should be true)
    pub is_canonical: bool,

    /// Whether the script is logographic (typed more slowly by the typewriter)
    pub logographic: bool,

    /// Whether this locale is enabled for use
    pub enabled: bool,
}

/// Global locale registry singleton.
pub struct LocaleRegistry {
    locales: Vec<LocaleConfig>,
}

/// Global registry instance (initialized lazily)
static REGISTRY: OnceLock<LocaleRegistry> = OnceLock::new();

impl LocaleRegistry {
    /// Get the global locale registry instance.
    pub fn get() -> &'static LocaleRegistry {
        REGISTRY.get_or_init(|| LocaleRegistry {
            locales: default_locales(),
        })
    }

    /// Get the configuration for a locale.
    ///
    /// Every `Locale` variant has an entry, so this lookup cannot miss.
    pub fn config_for(&self, locale: Locale) -> &LocaleConfig {
        self.locales
            .iter()
            .find(|config| config.locale == locale)
            .unwrap_or(&self.locales[0])
    }

    /// Get all enabled locales.
    pub fn list_enabled(&self) -> Vec<&LocaleConfig> {
        self.locales.iter().filter(|config| config.enabled).collect()
    }

    /// Get the canonical locale configuration.
    ///
    /// # Panics
    /// Panics if the registry does not define exactly one canonical locale
    /// (this indicates a configuration error).
    pub fn canonical(&self) -> &LocaleConfig {
        let canonical: Vec<_> = self
            .locales
            .iter()
            .filter(|config| config.is_canonical)
            .collect();

        match canonical.len() {
            0 => panic!("No canonical locale found in registry"),
            1 => canonical[0],
            _ => panic!("Multiple canonical locales found in registry"),
        }
    }
}

/// Default locale configurations: English (canonical) and Chinese.
fn default_locales() -> Vec<LocaleConfig> {
    vec![
        LocaleConfig {
            locale: Locale::En,
            native_name: "English",
            root_path: "/",
            is_canonical: true,
            logographic: false,
            enabled: true,
        },
        LocaleConfig {
            locale: Locale::Zh,
            native_name: "中文",
            root_path: "/zh/",
            is_canonical: false,
            logographic: true,
            enabled: true,
        },
    ]
}
