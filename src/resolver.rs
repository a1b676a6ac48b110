//! Locale resolution: which locale a visitor sees, and whether to redirect.
//!
//! Resolution is a pure function of the served path, the stored preference
//! and the browser language. The only side effect it asks for is a single
//! write of the preference (`Resolution::persist`), which the caller performs
//! *before* acting on a redirect. Because every redirect lands on a path whose
//! derived locale equals the preference that will be read back, a second
//! resolution after acting on the first always yields `Stay`.

use crate::i18n::Locale;
use crate::store::{LocaleStore, StoreError};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

/// What the locale store said about the visitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoredPreference {
    /// Storage is blocked; resolve from the path alone and never write
    Unavailable,
    /// First visit, or a value that is not a known locale
    Absent,
    Present(Locale),
}

impl StoredPreference {
    /// Interpret the result of reading the store slot.
    pub fn from_slot(slot: Result<Option<String>, StoreError>) -> Self {
        match slot {
            Ok(None) => StoredPreference::Absent,
            Ok(Some(raw)) => match Locale::from_code(&raw) {
                Some(locale) => StoredPreference::Present(locale),
                None => {
                    debug!("Ignoring unrecognised stored locale '{}'", raw);
                    StoredPreference::Absent
                }
            },
            Err(e @ StoreError::Corrupt { .. }) => {
                warn!("Discarding unreadable locale preference: {}", e);
                StoredPreference::Absent
            }
            Err(e) => {
                warn!("Locale store read failed, using path detection only: {}", e);
                StoredPreference::Unavailable
            }
        }
    }

    /// Read and interpret a store.
    pub fn read(store: &dyn LocaleStore) -> Self {
        Self::from_slot(store.get())
    }
}

/// What the page should do after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "target", rename_all = "lowercase")]
pub enum Action {
    Stay,
    /// Navigate to the given locale root; the current page lifecycle ends
    Redirect(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedirectDecision {
    /// The locale the visitor will end up seeing
    pub locale: Locale,
    #[serde(flatten)]
    pub action: Action,
}

impl RedirectDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self.action, Action::Redirect(_))
    }
}

/// A decision plus the preference write it requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub decision: RedirectDecision,
    /// Locale to store before acting on the decision
    pub persist: Option<Locale>,
}

/// Resolver over a set of published locales.
///
/// A locale root that is not published is never redirected to; the visitor
/// stays on the served page and the served locale is stored instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    published: BTreeSet<Locale>,
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new(Locale::ALL)
    }
}

impl Resolver {
    /// The canonical locale is always published.
    pub fn new(published: impl IntoIterator<Item = Locale>) -> Self {
        let mut published: BTreeSet<Locale> = published.into_iter().collect();
        published.insert(Locale::canonical());
        Self { published }
    }

    pub fn is_published(&self, locale: Locale) -> bool {
        self.published.contains(&locale)
    }

    pub fn resolve(
        &self,
        current_path: &str,
        stored: StoredPreference,
        browser_language: Option<&str>,
    ) -> Resolution {
        let served = Locale::from_path(current_path);

        match stored {
            StoredPreference::Unavailable => stay(served, None),
            StoredPreference::Present(preferred) if preferred == served => stay(served, None),
            StoredPreference::Present(preferred) if self.is_published(preferred) => Resolution {
                decision: RedirectDecision {
                    locale: preferred,
                    action: Action::Redirect(preferred.root_path().to_string()),
                },
                persist: None,
            },
            StoredPreference::Present(_) => stay(served, Some(served)),
            StoredPreference::Absent => {
                let detected = browser_language.and_then(|tag| {
                    Locale::ALL
                        .into_iter()
                        .filter(|locale| *locale != Locale::canonical())
                        .find(|locale| locale.matches_language_tag(tag))
                });
                match detected {
                    Some(locale) if locale != served && self.is_published(locale) => Resolution {
                        decision: RedirectDecision {
                            locale,
                            action: Action::Redirect(locale.root_path().to_string()),
                        },
                        persist: Some(locale),
                    },
                    _ => stay(served, Some(served)),
                }
            }
        }
    }
}

fn stay(locale: Locale, persist: Option<Locale>) -> Resolution {
    Resolution {
        decision: RedirectDecision {
            locale,
            action: Action::Stay,
        },
        persist,
    }
}

/// Resolve with every locale published.
pub fn resolve(
    current_path: &str,
    stored: StoredPreference,
    browser_language: Option<&str>,
) -> Resolution {
    Resolver::default().resolve(current_path, stored, browser_language)
}

/// Read the store, resolve, and perform the required preference write.
///
/// Store failures are logged and never surface: a failed read falls back to
/// path-only detection, a failed write leaves the decision unchanged.
pub fn resolve_with_store(
    resolver: &Resolver,
    store: &dyn LocaleStore,
    current_path: &str,
    browser_language: Option<&str>,
) -> Resolution {
    let stored = StoredPreference::read(store);
    let resolution = resolver.resolve(current_path, stored, browser_language);

    if let Some(locale) = resolution.persist {
        if let Err(e) = store.set(locale) {
            warn!("Failed to persist locale '{}': {}", locale, e);
        }
    }

    info!(
        "Resolved locale for {}: {} ({:?}, stored: {:?})",
        current_path, resolution.decision.locale, resolution.decision.action, stored
    );
    resolution
}

/// The locale and root path the language switcher leads to.
pub fn switch_target(current_path: &str) -> (Locale, &'static str) {
    let target = Locale::from_path(current_path).other();
    (target, target.root_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{DisabledStore, FileStore, MemoryStore};
    use proptest::prelude::*;

    fn redirect(target: &str) -> Action {
        Action::Redirect(target.to_string())
    }

    // ==================== First Visit Tests ====================

    #[test]
    fn test_first_visit_chinese_browser_on_root_redirects() {
        let resolution = resolve("/", StoredPreference::Absent, Some("zh-CN"));
        assert_eq!(resolution.decision.locale, Locale::Zh);
        assert_eq!(resolution.decision.action, redirect("/zh/"));
        assert_eq!(resolution.persist, Some(Locale::Zh));
    }

    #[test]
    fn test_first_visit_english_browser_on_root_stays() {
        let resolution = resolve("/", StoredPreference::Absent, Some("en-US"));
        assert_eq!(resolution.decision.action, Action::Stay);
        assert_eq!(resolution.persist, Some(Locale::En));
    }

    #[test]
    fn test_first_visit_chinese_browser_on_chinese_page_stays() {
        let resolution = resolve("/zh/", StoredPreference::Absent, Some("zh-TW"));
        assert_eq!(resolution.decision.action, Action::Stay);
        assert_eq!(resolution.persist, Some(Locale::Zh));
    }

    #[test]
    fn test_first_visit_english_browser_on_chinese_page_stays() {
        // Browser language only ever pulls visitors towards Chinese
        let resolution = resolve("/zh/", StoredPreference::Absent, Some("en-US"));
        assert_eq!(resolution.decision, RedirectDecision {
            locale: Locale::Zh,
            action: Action::Stay,
        });
        assert_eq!(resolution.persist, Some(Locale::Zh));
    }

    #[test]
    fn test_first_visit_without_browser_language() {
        let resolution = resolve("/", StoredPreference::Absent, None);
        assert_eq!(resolution.decision.action, Action::Stay);
        assert_eq!(resolution.persist, Some(Locale::En));
    }

    // ==================== Returning Visit Tests ====================

    #[test]
    fn test_returning_english_visitor_on_chinese_page_redirects() {
        let resolution = resolve("/zh/", StoredPreference::Present(Locale::En), Some("zh-CN"));
        assert_eq!(resolution.decision.locale, Locale::En);
        assert_eq!(resolution.decision.action, redirect("/"));
        assert_eq!(resolution.persist, None);
    }

    #[test]
    fn test_returning_visitor_on_matching_page_stays() {
        let resolution = resolve("/zh/", StoredPreference::Present(Locale::Zh), Some("en-US"));
        assert_eq!(resolution.decision.action, Action::Stay);
        assert_eq!(resolution.persist, None);
    }

    #[test]
    fn test_stored_preference_beats_browser_language() {
        let resolution = resolve("/", StoredPreference::Present(Locale::En), Some("zh-CN"));
        assert_eq!(resolution.decision.action, Action::Stay);
    }

    // ==================== Degraded Storage Tests ====================

    #[test]
    fn test_unavailable_storage_never_redirects_or_writes() {
        for path in ["/", "/zh/"] {
            let resolution = resolve(path, StoredPreference::Unavailable, Some("zh-CN"));
            assert_eq!(resolution.decision.action, Action::Stay);
            assert_eq!(resolution.decision.locale, Locale::from_path(path));
            assert_eq!(resolution.persist, None);
        }
    }

    #[test]
    fn test_unrecognised_stored_value_is_absent() {
        let store = MemoryStore::new();
        store.set_raw("fr");
        assert_eq!(StoredPreference::read(&store), StoredPreference::Absent);
    }

    #[test]
    fn test_unrecognised_stored_value_is_overwritten() {
        let store = MemoryStore::new();
        store.set_raw("fr");
        let resolution = resolve_with_store(&Resolver::default(), &store, "/", Some("en-GB"));
        assert_eq!(resolution.decision.action, Action::Stay);
        assert_eq!(store.raw().as_deref(), Some("en"));
    }

    #[test]
    fn test_corrupt_store_file_is_absent_and_rewritten() {
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let path = dir.path().join("prefs.json");
        std::fs::write(&path, "{not json").expect("Should write garbage");
        let store = FileStore::new(&path, "markdownflow_language");
        assert_eq!(StoredPreference::read(&store), StoredPreference::Absent);

        let resolution = resolve_with_store(&Resolver::default(), &store, "/", Some("zh-CN"));
        assert_eq!(resolution.decision.action, Action::Redirect("/zh/".to_string()));
        assert_eq!(store.get().expect("Should read repaired file").as_deref(), Some("zh"));
    }

    #[test]
    fn test_resolve_with_disabled_store() {
        let resolution = resolve_with_store(&Resolver::default(), &DisabledStore, "/", Some("zh"));
        assert_eq!(resolution.decision.action, Action::Stay);
        assert_eq!(resolution.decision.locale, Locale::En);
    }

    #[test]
    fn test_resolve_with_store_writes_before_redirect() {
        let store = MemoryStore::new();
        let resolution = resolve_with_store(&Resolver::default(), &store, "/", Some("zh-CN"));
        assert!(resolution.decision.is_redirect());
        assert_eq!(store.raw().as_deref(), Some("zh"));
    }

    // ==================== Published Locale Tests ====================

    #[test]
    fn test_unpublished_browser_locale_stays() {
        let resolver = Resolver::new([Locale::En]);
        let resolution = resolver.resolve("/", StoredPreference::Absent, Some("zh-CN"));
        assert_eq!(resolution.decision.action, Action::Stay);
        assert_eq!(resolution.persist, Some(Locale::En));
    }

    #[test]
    fn test_unpublished_stored_locale_stays_and_overwrites() {
        let resolver = Resolver::new([Locale::En]);
        let resolution = resolver.resolve("/", StoredPreference::Present(Locale::Zh), None);
        assert_eq!(resolution.decision.action, Action::Stay);
        assert_eq!(resolution.persist, Some(Locale::En));
    }

    #[test]
    fn test_canonical_is_always_published() {
        let resolver = Resolver::new(Vec::<Locale>::new());
        assert!(resolver.is_published(Locale::En));
        assert!(!resolver.is_published(Locale::Zh));
    }

    // ==================== Switcher Tests ====================

    #[test]
    fn test_switch_target() {
        assert_eq!(switch_target("/"), (Locale::Zh, "/zh/"));
        assert_eq!(switch_target("/zh/index.html"), (Locale::En, "/"));
    }

    #[test]
    fn test_decision_serializes() {
        let resolution = resolve("/", StoredPreference::Absent, Some("zh-CN"));
        let json = serde_json::to_value(&resolution.decision).expect("Should serialize");
        assert_eq!(
            json,
            serde_json::json!({"locale": "zh", "action": "redirect", "target": "/zh/"})
        );

        let resolution = resolve("/", StoredPreference::Absent, Some("en-US"));
        let json = serde_json::to_value(&resolution.decision).expect("Should serialize");
        assert_eq!(json, serde_json::json!({"locale": "en", "action": "stay"}));
    }

    // ==================== Property Tests ====================

    fn path_strategy() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("/".to_string()),
            Just("/zh/".to_string()),
            Just("/zh".to_string()),
            Just("/index.html".to_string()),
            "/[a-z]{0,6}/?".prop_map(|s| s),
            "/zh/[a-z]{0,6}".prop_map(|s| s),
        ]
    }

    fn stored_strategy() -> impl Strategy<Value = StoredPreference> {
        prop_oneof![
            Just(StoredPreference::Unavailable),
            Just(StoredPreference::Absent),
            Just(StoredPreference::Present(Locale::En)),
            Just(StoredPreference::Present(Locale::Zh)),
        ]
    }

    fn language_strategy() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some("zh-CN".to_string())),
            Just(Some("en-US".to_string())),
            Just(Some("ZH".to_string())),
            "[a-zA-Z-]{0,8}".prop_map(Some),
        ]
    }

    proptest! {
        #[test]
        fn prop_second_resolution_always_stays(
            path in path_strategy(),
            stored in stored_strategy(),
            language in language_strategy(),
            zh_published in any::<bool>(),
        ) {
            let resolver = if zh_published {
                Resolver::default()
            } else {
                Resolver::new([Locale::En])
            };
            let first = resolver.resolve(&path, stored, language.as_deref());

            let next_stored = match (stored, first.persist) {
                (StoredPreference::Unavailable, _) => StoredPreference::Unavailable,
                (_, Some(locale)) => StoredPreference::Present(locale),
                (current, None) => current,
            };
            let next_path = match &first.decision.action {
                Action::Redirect(target) => target.clone(),
                Action::Stay => path.clone(),
            };

            let second = resolver.resolve(&next_path, next_stored, language.as_deref());
            prop_assert_eq!(second.decision.action, Action::Stay);
            prop_assert_eq!(second.decision.locale, first.decision.locale);
        }

        #[test]
        fn prop_resolution_is_deterministic(
            path in path_strategy(),
            stored in stored_strategy(),
            language in language_strategy(),
        ) {
            let a = resolve(&path, stored, language.as_deref());
            let b = resolve(&path, stored, language.as_deref());
            prop_assert_eq!(a, b);
        }
    }
}
