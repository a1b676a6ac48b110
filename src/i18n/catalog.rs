//! Translation catalog: the locale-specific structured content of the page.
//!
//! The catalog is authored at build time (`assets/translations.json`) and is
//! read-only at runtime. Rich-text fields (`hero.description`,
//! `playground.cta`) hold trusted markup; every other string is plain text
//! and is written to the document as literal text.

use crate::i18n::Locale;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

/// The catalog shipped with the crate.
const BUILTIN_CATALOG: &str = include_str!("../../assets/translations.json");

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Immutable mapping from locale to its content bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TranslationCatalog {
    bundles: BTreeMap<Locale, ContentBundle>,
}

impl TranslationCatalog {
    /// Parse the catalog embedded in the crate.
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    /// Parse a catalog from JSON text.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a catalog from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| CatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Build a catalog from bundles directly (used by tests and tooling).
    pub fn from_bundles(bundles: impl IntoIterator<Item = (Locale, ContentBundle)>) -> Self {
        Self {
            bundles: bundles.into_iter().collect(),
        }
    }

    /// The bundle for a locale, if the catalog carries one.
    pub fn bundle(&self, locale: Locale) -> Option<&ContentBundle> {
        self.bundles.get(&locale)
    }

    /// Locales present in the catalog, in canonical order.
    pub fn locales(&self) -> impl Iterator<Item = Locale> + '_ {
        self.bundles.keys().copied()
    }
}

/// All locale-specific content for one page variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBundle {
    /// Document title
    pub title: String,

    /// Value for the `<html lang>` attribute
    pub lang: String,

    pub language_switcher: LanguageSwitcher,
    pub navigation: Navigation,
    pub hero: Hero,
    pub features: Vec<Feature>,

    /// Code examples section; pages without one omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examples: Option<Examples>,

    pub playground: Playground,
    pub projects: Projects,

    /// Sponsor logos; pages without sponsors omit it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sponsors: Option<Sponsors>,

    /// Footer line (plain text)
    pub footer: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSwitcher {
    pub label: String,
    /// Root path of the other locale
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Navigation {
    pub documentation: String,
    pub documentation_href: String,
    pub github: String,
    pub playground: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hero {
    pub title: String,
    /// Trusted markup
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub icon: String,
    pub title: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Examples {
    pub title: String,
    pub items: Vec<Example>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    pub title: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Playground {
    /// Trusted markup
    pub cta: String,
    pub subtext: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projects {
    pub title: String,
    pub items: Vec<ProjectCard>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectCard {
    pub name: String,

    /// Display tag (e.g. "FRONTEND", "前端")
    #[serde(rename = "type")]
    pub kind: String,

    /// CSS class paired with the tag (e.g. "frontend")
    #[serde(rename = "type_class")]
    pub kind_class: String,

    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sponsors {
    pub title: String,
    pub items: Vec<Sponsor>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sponsor {
    pub logo: String,
    pub website: String,
    pub alt: String,
}
