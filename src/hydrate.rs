//! Hydration binder: writes a content bundle into the page skeleton.
//!
//! Every binding is best-effort. A missing anchor is recorded and skipped,
//! never an error. Ordered collections are bound positionally: entry `i` goes
//! to node `i`, for `i < min(entries, nodes)`, and anything beyond that on
//! either side is left as it was. Rich-text fields are written as trusted
//! markup; every other field is written as literal text.
//!
//! Binding is idempotent: hydrating the same document twice with the same
//! bundle leaves it byte-identical to hydrating it once.

use crate::dom::{Document, NodeId};
use crate::i18n::ContentBundle;
use serde::Serialize;
use tracing::debug;

/// Selectors for the anchors the binder writes to.
pub mod anchors {
    pub const LANGUAGE_SWITCHER: &str = "#language-switcher";
    pub const DOCS_LINK: &str = ".github-link[href*=\"docs\"]";
    pub const GITHUB_LINK: &str = ".github-link[href*=\"github.com\"]";
    pub const PLAYGROUND_LINK: &str = ".playground-link";

    pub const HERO_TITLE: &str = ".hero h2";
    pub const HERO_DESCRIPTION: &str = ".hero p";

    pub const FEATURE: &str = ".feature";
    pub const FEATURE_ICON: &str = ".feature-icon";
    pub const FEATURE_TITLE: &str = "h3";
    pub const FEATURE_DESCRIPTION: &str = "p";

    pub const EXAMPLES_TITLE: &str = ".examples-section h3";
    pub const EXAMPLE: &str = ".example";
    pub const EXAMPLE_TITLE: &str = ".example-title";
    pub const EXAMPLE_CODE: &str = "pre code";

    pub const PLAYGROUND_CTA: &str = ".playground-section .playground-cta";
    pub const PLAYGROUND_SUBTEXT: &str = ".playground-section .playground-subtext";

    pub const PROJECTS_TITLE: &str = ".api-section:last-of-type h3";
    pub const PROJECT_CARD: &str = ".project-card";
    pub const PROJECT_NAME: &str = ".project-name";
    pub const PROJECT_TYPE: &str = ".project-type";
    pub const PROJECT_DESCRIPTION: &str = ".project-description";
    pub const PROJECT_LICENSE: &str = ".project-license";

    pub const SPONSORS_TITLE: &str = ".sponsors-section h3";
    pub const SPONSOR: &str = ".sponsor";
    pub const SPONSOR_LOGO: &str = "img";

    pub const FOOTER: &str = "footer p";
}

/// Class marking elements the typewriter animates.
const TYPEWRITER_CLASS: &str = "typewriter";

/// What a hydration pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HydrationReport {
    /// Number of individual writes performed
    pub applied: usize,
    /// Anchors that were looked up and not found
    pub missing_anchors: Vec<String>,
    /// Catalog entries with no node to bind to
    pub unmatched_entries: usize,
    /// Collection nodes with no catalog entry, left untouched
    pub untouched_nodes: usize,
}

impl HydrationReport {
    /// Whether every anchor and every collection lined up.
    pub fn is_complete(&self) -> bool {
        self.missing_anchors.is_empty() && self.unmatched_entries == 0 && self.untouched_nodes == 0
    }
}

/// Hydrate `document` under `root` from `bundle`.
///
/// The document title and `<html lang>` are always written; every other
/// anchor is looked up beneath `root`.
pub fn hydrate(bundle: &ContentBundle, document: &mut Document, root: NodeId) -> HydrationReport {
    let mut binder = Binder {
        doc: document,
        root,
        report: HydrationReport::default(),
    };

    binder.bind_document(bundle);
    binder.bind_navigation(bundle);
    binder.bind_hero(bundle);
    binder.bind_features(bundle);
    binder.bind_examples(bundle);
    binder.bind_playground(bundle);
    binder.bind_projects(bundle);
    binder.bind_sponsors(bundle);
    binder.text(binder.root, anchors::FOOTER, &bundle.footer);

    debug!(
        "Hydrated {} bindings ({} missing anchors)",
        binder.report.applied,
        binder.report.missing_anchors.len()
    );
    binder.report
}

struct Binder<'a> {
    doc: &'a mut Document,
    root: NodeId,
    report: HydrationReport,
}

impl Binder<'_> {
    fn anchor(&mut self, scope: NodeId, selector: &str) -> Option<NodeId> {
        let node = self.doc.query_selector(scope, selector);
        if node.is_none() {
            debug!("Hydration anchor '{}' not found", selector);
            self.report.missing_anchors.push(selector.to_string());
        }
        node
    }

    fn text(&mut self, scope: NodeId, selector: &str, value: &str) -> Option<NodeId> {
        let node = self.anchor(scope, selector)?;
        self.doc.set_text_content(node, value);
        self.report.applied += 1;
        Some(node)
    }

    fn markup(&mut self, scope: NodeId, selector: &str, value: &str) {
        if let Some(node) = self.anchor(scope, selector) {
            self.doc.set_inner_html(node, value);
            self.report.applied += 1;
        }
    }

    fn attribute(&mut self, node: NodeId, name: &str, value: &str) {
        self.doc.set_attribute(node, name, value);
        self.report.applied += 1;
    }

    /// Pair entries with nodes by position and record the leftovers.
    fn zip<'e, T>(&mut self, selector: &str, entries: &'e [T]) -> Vec<(NodeId, &'e T)> {
        let nodes = self.doc.query_selector_all(self.root, selector);
        self.report.unmatched_entries += entries.len().saturating_sub(nodes.len());
        self.report.untouched_nodes += nodes.len().saturating_sub(entries.len());
        nodes.into_iter().zip(entries).collect()
    }

    fn bind_document(&mut self, bundle: &ContentBundle) {
        self.doc.set_title(&bundle.title);
        self.doc.set_lang(&bundle.lang);
        self.report.applied += 2;
    }

    fn bind_navigation(&mut self, bundle: &ContentBundle) {
        let switcher = &bundle.language_switcher;
        if let Some(node) = self.text(self.root, anchors::LANGUAGE_SWITCHER, &switcher.label) {
            self.attribute(node, "href", &switcher.target);
        }

        let navigation = &bundle.navigation;
        if let Some(node) = self.text(self.root, anchors::DOCS_LINK, &navigation.documentation) {
            self.attribute(node, "href", &navigation.documentation_href);
        }
        self.text(self.root, anchors::GITHUB_LINK, &navigation.github);
        self.text(self.root, anchors::PLAYGROUND_LINK, &navigation.playground);
    }

    fn bind_hero(&mut self, bundle: &ContentBundle) {
        if let Some(title) = self.anchor(self.root, anchors::HERO_TITLE) {
            self.attribute(title, "data-text", &bundle.hero.title);
            // The typewriter owns the live text of its element
            if !self.doc.has_class(title, TYPEWRITER_CLASS) {
                self.doc.set_text_content(title, &bundle.hero.title);
                self.report.applied += 1;
            }
        }
        self.markup(self.root, anchors::HERO_DESCRIPTION, &bundle.hero.description);
    }

    fn bind_features(&mut self, bundle: &ContentBundle) {
        for (node, feature) in self.zip(anchors::FEATURE, &bundle.features) {
            self.text(node, anchors::FEATURE_ICON, &feature.icon);
            self.text(node, anchors::FEATURE_TITLE, &feature.title);
            self.text(node, anchors::FEATURE_DESCRIPTION, &feature.description);
        }
    }

    fn bind_examples(&mut self, bundle: &ContentBundle) {
        let Some(examples) = &bundle.examples else {
            return;
        };
        self.text(self.root, anchors::EXAMPLES_TITLE, &examples.title);
        for (node, example) in self.zip(anchors::EXAMPLE, &examples.items) {
            self.text(node, anchors::EXAMPLE_TITLE, &example.title);
            self.text(node, anchors::EXAMPLE_CODE, &example.code);
        }
    }

    fn bind_playground(&mut self, bundle: &ContentBundle) {
        self.markup(self.root, anchors::PLAYGROUND_CTA, &bundle.playground.cta);
        self.text(self.root, anchors::PLAYGROUND_SUBTEXT, &bundle.playground.subtext);
    }

    fn bind_projects(&mut self, bundle: &ContentBundle) {
        self.text(self.root, anchors::PROJECTS_TITLE, &bundle.projects.title);
        for (node, project) in self.zip(anchors::PROJECT_CARD, &bundle.projects.items) {
            self.text(node, anchors::PROJECT_NAME, &project.name);
            if let Some(tag) = self.text(node, anchors::PROJECT_TYPE, &project.kind) {
                self.doc
                    .set_class_name(tag, &format!("project-type {}", project.kind_class));
                self.report.applied += 1;
            }
            self.text(node, anchors::PROJECT_DESCRIPTION, &project.description);
            if let Some(license) = &project.license {
                self.text(node, anchors::PROJECT_LICENSE, license);
            }
        }
    }

    fn bind_sponsors(&mut self, bundle: &ContentBundle) {
        let Some(sponsors) = &bundle.sponsors else {
            return;
        };
        self.text(self.root, anchors::SPONSORS_TITLE, &sponsors.title);
        for (node, sponsor) in self.zip(anchors::SPONSOR, &sponsors.items) {
            self.attribute(node, "href", &sponsor.website);
            if let Some(logo) = self.anchor(node, anchors::SPONSOR_LOGO) {
                self.attribute(logo, "src", &sponsor.logo);
                self.attribute(logo, "alt", &sponsor.alt);
            }
        }
    }
}
