use crate::animation::AnimationConfig;
use crate::i18n::{Locale, TranslationCatalog};
use crate::resolver::Resolver;
use crate::store::{FileStore, LocaleStore, MemoryStore, DEFAULT_STORAGE_KEY};
use anyhow::{bail, Context, Result};
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    // Locale preference
    pub storage_key: String,
    pub store_path: Option<PathBuf>,

    // Content
    pub catalog_path: Option<PathBuf>,
    pub published_locales: Vec<Locale>,

    // Motion
    pub reduced_motion: bool,
    pub typewriter_stagger_ms: u64,
    pub typing_ms_latin: u64,
    pub typing_ms_zh: u64,
    pub ripple_ms: u64,
    pub reveal_stagger_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            store_path: None,
            catalog_path: None,
            published_locales: Locale::ALL.to_vec(),
            reduced_motion: false,
            typewriter_stagger_ms: 300,
            typing_ms_latin: 50,
            typing_ms_zh: 100,
            ripple_ms: 600,
            reveal_stagger_ms: 100,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            // Locale preference
            storage_key: std::env::var("SITE_STORAGE_KEY")
                .unwrap_or_else(|_| DEFAULT_STORAGE_KEY.to_string()),
            store_path: std::env::var("SITE_STORE_PATH").ok().map(PathBuf::from),

            // Content
            catalog_path: std::env::var("SITE_CATALOG_PATH").ok().map(PathBuf::from),
            published_locales: match std::env::var("SITE_PUBLISHED_LOCALES") {
                Ok(raw) => parse_locales(&raw).context("Invalid SITE_PUBLISHED_LOCALES")?,
                Err(_) => defaults.published_locales,
            },

            // Motion
            reduced_motion: std::env::var("SITE_REDUCED_MOTION")
                .ok()
                .map(|v| parse_flag(&v))
                .unwrap_or(false),
            typewriter_stagger_ms: std::env::var("SITE_TYPEWRITER_STAGGER")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.typewriter_stagger_ms),
            typing_ms_latin: std::env::var("SITE_TYPING_MS_LATIN")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&ms: &u64| ms > 0)
                .unwrap_or(defaults.typing_ms_latin),
            typing_ms_zh: std::env::var("SITE_TYPING_MS_ZH")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&ms: &u64| ms > 0)
                .unwrap_or(defaults.typing_ms_zh),
            ripple_ms: std::env::var("SITE_RIPPLE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.ripple_ms),
            reveal_stagger_ms: std::env::var("SITE_REVEAL_STAGGER_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.reveal_stagger_ms),
        })
    }

    pub fn animation(&self) -> AnimationConfig {
        AnimationConfig::standard()
            .with_reduced_motion(self.reduced_motion)
            .with_typewriter_stagger(Duration::from_millis(self.typewriter_stagger_ms))
            .with_typing_intervals(
                Duration::from_millis(self.typing_ms_latin),
                Duration::from_millis(self.typing_ms_zh),
            )
            .with_ripple_duration(Duration::from_millis(self.ripple_ms))
            .with_reveal_stagger(Duration::from_millis(self.reveal_stagger_ms))
    }

    pub fn resolver(&self) -> Resolver {
        Resolver::new(self.published_locales.iter().copied())
    }

    /// File-backed store when a path is configured, otherwise in-memory.
    pub fn open_store(&self) -> Rc<dyn LocaleStore> {
        match &self.store_path {
            Some(path) => Rc::new(FileStore::new(path, &self.storage_key)),
            None => Rc::new(MemoryStore::with_key(&self.storage_key)),
        }
    }

    pub fn load_catalog(&self) -> Result<TranslationCatalog> {
        match &self.catalog_path {
            Some(path) => TranslationCatalog::from_path(path)
                .with_context(|| format!("Failed to load catalog from {}", path.display())),
            None => TranslationCatalog::builtin().context("Failed to load built-in catalog"),
        }
    }
}

/// Parse a comma-separated list of locale codes.
fn parse_locales(raw: &str) -> Result<Vec<Locale>> {
    let mut locales = Vec::new();
    for code in raw.split(',').map(str::trim).filter(|code| !code.is_empty()) {
        match Locale::from_code(code) {
            Some(locale) if !locales.contains(&locale) => locales.push(locale),
            Some(_) => {}
            None => bail!("Unknown locale code '{}'", code),
        }
    }
    Ok(locales)
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const KEYS: [&str; 10] = [
        "SITE_STORAGE_KEY",
        "SITE_STORE_PATH",
        "SITE_CATALOG_PATH",
        "SITE_PUBLISHED_LOCALES",
        "SITE_REDUCED_MOTION",
        "SITE_TYPEWRITER_STAGGER",
        "SITE_TYPING_MS_LATIN",
        "SITE_TYPING_MS_ZH",
        "SITE_RIPPLE_MS",
        "SITE_REVEAL_STAGGER_MS",
    ];

    fn clear_env() {
        for key in KEYS {
            std::env::remove_var(key);
        }
    }

    // ==================== from_env Tests ====================

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_env();
        let config = Config::from_env().expect("Should load defaults");
        assert_eq!(config.storage_key, "markdownflow_language");
        assert_eq!(config.store_path, None);
        assert_eq!(config.published_locales, vec![Locale::En, Locale::Zh]);
        assert!(!config.reduced_motion);
        assert_eq!(config.animation(), AnimationConfig::standard());
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_env();
        std::env::set_var("SITE_STORAGE_KEY", "lang");
        std::env::set_var("SITE_PUBLISHED_LOCALES", "en");
        std::env::set_var("SITE_REDUCED_MOTION", "TRUE");
        std::env::set_var("SITE_TYPEWRITER_STAGGER", "0");
        std::env::set_var("SITE_TYPING_MS_ZH", "120");

        let config = Config::from_env().expect("Should load overrides");
        clear_env();

        assert_eq!(config.storage_key, "lang");
        assert_eq!(config.published_locales, vec![Locale::En]);
        let animation = config.animation();
        assert!(animation.reduced_motion);
        assert_eq!(animation.typewriter_stagger, Duration::ZERO);
        assert_eq!(animation.typing_interval_logographic, Duration::from_millis(120));
        assert!(!config.resolver().is_published(Locale::Zh));
    }

    #[test]
    #[serial]
    fn test_unparseable_numbers_fall_back() {
        clear_env();
        std::env::set_var("SITE_RIPPLE_MS", "fast");
        let config = Config::from_env().expect("Should load");
        clear_env();
        assert_eq!(config.ripple_ms, 600);
    }

    #[test]
    #[serial]
    fn test_zero_typing_interval_falls_back() {
        clear_env();
        std::env::set_var("SITE_TYPING_MS_LATIN", "0");
        std::env::set_var("SITE_TYPING_MS_ZH", "0");
        let config = Config::from_env().expect("Should load");
        clear_env();

        assert_eq!(config.typing_ms_latin, 50);
        assert_eq!(config.typing_ms_zh, 100);
    }

    #[test]
    #[serial]
    fn test_unknown_published_locale_is_an_error() {
        clear_env();
        std::env::set_var("SITE_PUBLISHED_LOCALES", "en,fr");
        let result = Config::from_env();
        clear_env();

        let err = result.expect_err("Should reject unknown locale");
        assert!(format!("{:#}", err).contains("'fr'"));
    }

    // ==================== Helper Tests ====================

    #[test]
    fn test_parse_locales_dedupes_and_trims() {
        let locales = parse_locales(" zh , en,zh,").expect("Should parse");
        assert_eq!(locales, vec![Locale::Zh, Locale::En]);
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("1"));
        assert!(parse_flag(" yes "));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("false"));
    }

    #[test]
    fn test_open_store_uses_file_when_configured() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let config = Config {
            store_path: Some(dir.path().join("prefs.json")),
            ..Config::default()
        };
        let store = config.open_store();
        store.set(Locale::Zh).expect("Should write");
        assert!(dir.path().join("prefs.json").exists());
        assert_eq!(store.get().expect("Should read").as_deref(), Some("zh"));
    }

    #[test]
    fn test_load_catalog_reports_missing_file() {
        let config = Config {
            catalog_path: Some(PathBuf::from("/nonexistent/translations.json")),
            ..Config::default()
        };
        let err = config.load_catalog().expect_err("Should fail");
        assert!(err.to_string().contains("/nonexistent/translations.json"));
    }
}
