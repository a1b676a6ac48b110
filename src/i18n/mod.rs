//! Internationalization (i18n) module for the bilingual site.
//!
//! # Architecture
//!
//! - `registry`: Single source of truth for the supported locales and their root paths
//! - `locale`: The `Locale` enum persisted by the locale store
//! - `catalog`: The read-only translation catalog consumed by the hydration binder
//! - `validator`: Catalog quality validation
//!
//! # Example
//!
//! ```rust,ignore
//! use markdownflow_site::i18n::{Locale, TranslationCatalog};
//!
//! let catalog = TranslationCatalog::builtin()?;
//! let locale = Locale::from_path("/zh/");
//! let bundle = catalog.bundle(locale);
//! ```

mod catalog;
mod locale;
mod registry;
mod validator;

pub use catalog::{
    CatalogError, ContentBundle, Example, Examples, Feature, Hero, LanguageSwitcher, Navigation,
    Playground, ProjectCard, Projects, Sponsor, Sponsors, TranslationCatalog,
};
pub use locale::Locale;
pub use registry::{LocaleConfig, LocaleRegistry};
pub use validator::{CatalogValidator, ValidationReport};
