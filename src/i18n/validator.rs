//! Catalog quality validation.
//!
//! Checks a translation catalog for problems the hydration binder would
//! tolerate silently at runtime: sequences whose length drifts between
//! locales, markup in plain-text fields (which would be shown literally),
//! malformed rich text, and project type classes that are not valid CSS
//! class names.

use crate::i18n::{ContentBundle, Locale, TranslationCatalog};
use regex::Regex;
use std::sync::OnceLock;

/// Validation report containing errors and warnings about a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// Problems that break a page variant
    pub errors: Vec<String>,

    /// Problems that degrade a page variant
    pub warnings: Vec<String>,
}

impl ValidationReport {
    /// Create a new empty validation report
    pub fn new() -> Self {
        Self {
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Check if the report has any errors
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Check if the report has any warnings
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Check if the report is clean (no errors or warnings)
    pub fn is_clean(&self) -> bool {
        !self.has_errors() && !self.has_warnings()
    }
}

impl Default for ValidationReport {
    fn default() -> Self {
        Self::new()
    }
}

/// Validator for translation catalogs.
pub struct CatalogValidator;

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static ANCHOR_OPEN_REGEX: OnceLock<Regex> = OnceLock::new();
static ANCHOR_CLOSE_REGEX: OnceLock<Regex> = OnceLock::new();
static CLASS_NAME_REGEX: OnceLock<Regex> = OnceLock::new();

impl CatalogValidator {
    /// Validate every bundle in the catalog.
    ///
    /// Errors:
    /// - the canonical locale has no bundle
    /// - a bundle's `lang` differs from its locale code
    /// - a language switcher does not point at the other locale's root
    /// - a project type class is not a valid class name
    ///
    /// Warnings:
    /// - ordered sequences differ in length from the canonical bundle
    /// - a language switcher label does not name the other locale
    /// - plain-text fields contain markup
    /// - rich-text fields have unbalanced links, or `target="_blank"` links
    ///   without `rel="noopener"`
    pub fn validate(catalog: &TranslationCatalog) -> ValidationReport {
        let mut report = ValidationReport::new();
        let canonical_locale = Locale::canonical();
        let canonical = catalog.bundle(canonical_locale);

        if canonical.is_none() {
            report
                .errors
                .push(format!("Missing bundle for canonical locale '{}'", canonical_locale));
        }

        for locale in catalog.locales() {
            let Some(bundle) = catalog.bundle(locale) else {
                continue;
            };

            Self::validate_bundle(locale, bundle, &mut report);

            if let Some(canonical) = canonical.filter(|_| locale != canonical_locale) {
                Self::compare_cardinality(locale, canonical, bundle, &mut report);
            }
        }

        report
    }

    fn validate_bundle(locale: Locale, bundle: &ContentBundle, report: &mut ValidationReport) {
        if bundle.lang != locale.code() {
            report.errors.push(format!(
                "[{}] lang is '{}', expected '{}'",
                locale,
                bundle.lang,
                locale.code()
            ));
        }

        let expected_target = locale.other().root_path();
        if bundle.language_switcher.target != expected_target {
            report.errors.push(format!(
                "[{}] language switcher targets '{}', expected '{}'",
                locale, bundle.language_switcher.target, expected_target
            ));
        }

        let other_name = locale.other().native_name();
        if !bundle.language_switcher.label.contains(other_name) {
            report.warnings.push(format!(
                "[{}] language switcher label '{}' does not name '{}'",
                locale, bundle.language_switcher.label, other_name
            ));
        }

        for (index, project) in bundle.projects.items.iter().enumerate() {
            if !Self::class_name_regex().is_match(&project.kind_class) {
                report.errors.push(format!(
                    "[{}] projects[{}] type_class '{}' is not a valid class name",
                    locale, index, project.kind_class
                ));
            }
        }

        let mut plain: Vec<(String, &str)> = vec![
            ("title".to_string(), bundle.title.as_str()),
            ("hero.title".to_string(), bundle.hero.title.as_str()),
            ("playground.subtext".to_string(), bundle.playground.subtext.as_str()),
            ("footer".to_string(), bundle.footer.as_str()),
        ];
        for (index, feature) in bundle.features.iter().enumerate() {
            plain.push((format!("features[{}].title", index), feature.title.as_str()));
            plain.push((format!("features[{}].description", index), feature.description.as_str()));
        }
        for (index, project) in bundle.projects.items.iter().enumerate() {
            plain.push((format!("projects[{}].description", index), project.description.as_str()));
        }

        for (field, value) in plain {
            if Self::contains_markup(value) {
                report.warnings.push(format!(
                    "[{}] {} contains markup but is written as plain text",
                    locale, field
                ));
            }
        }

        for (field, value) in [
            ("hero.description", &bundle.hero.description),
            ("playground.cta", &bundle.playground.cta),
        ] {
            Self::check_rich_text(locale, field, value, report);
        }
    }

    fn compare_cardinality(
        locale: Locale,
        canonical: &ContentBundle,
        bundle: &ContentBundle,
        report: &mut ValidationReport,
    ) {
        let mut pairs = vec![
            ("features", canonical.features.len(), bundle.features.len()),
            (
                "projects",
                canonical.projects.items.len(),
                bundle.projects.items.len(),
            ),
        ];
        if let (Some(a), Some(b)) = (&canonical.examples, &bundle.examples) {
            pairs.push(("examples", a.items.len(), b.items.len()));
        }
        if let (Some(a), Some(b)) = (&canonical.sponsors, &bundle.sponsors) {
            pairs.push(("sponsors", a.items.len(), b.items.len()));
        }

        for (section, expected, actual) in pairs {
            if expected != actual {
                report.warnings.push(format!(
                    "[{}] {} has {} entries, canonical has {}",
                    locale, section, actual, expected
                ));
            }
        }
    }

    fn check_rich_text(locale: Locale, field: &str, value: &str, report: &mut ValidationReport) {
        let opens: Vec<_> = Self::anchor_open_regex().find_iter(value).collect();
        let closes = Self::anchor_close_regex().find_iter(value).count();

        if opens.len() != closes {
            report.warnings.push(format!(
                "[{}] {} has {} opening and {} closing link tags",
                locale,
                field,
                opens.len(),
                closes
            ));
        }

        for tag in opens {
            let tag = tag.as_str();
            if tag.contains("target=\"_blank\"") && !tag.contains("noopener") {
                report.warnings.push(format!(
                    "[{}] {} opens a new tab without rel=\"noopener\"",
                    locale, field
                ));
            }
        }
    }

    /// Whether a string contains anything that looks like an HTML tag.
    pub fn contains_markup(text: &str) -> bool {
        Self::tag_regex().is_match(text)
    }

    fn tag_regex() -> &'static Regex {
        TAG_REGEX.get_or_init(|| Regex::new(r"</?[a-zA-Z][^>]*>").unwrap())
    }

    fn anchor_open_regex() -> &'static Regex {
        ANCHOR_OPEN_REGEX.get_or_init(|| Regex::new(r"(?i)<a(\s[^>]*)?>").unwrap())
    }

    fn anchor_close_regex() -> &'static Regex {
        ANCHOR_CLOSE_REGEX.get_or_init(|| Regex::new(r"(?i)</a\s*>").unwrap())
    }

    fn class_name_regex() -> &'static Regex {
        CLASS_NAME_REGEX.get_or_init(|| Regex::new(r"^-?[_a-zA-Z][_a-zA-Z0-9-]*$").unwrap())
    }
}
