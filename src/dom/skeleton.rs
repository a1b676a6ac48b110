//! The static landing-page skeleton.
//!
//! This is the markup the site ships before hydration: English placeholder
//! copy, the anchors the hydration binder writes to, and the animation
//! markers (`.reveal`, `.ripple`, `.typewriter`, `.skeleton`). Every element
//! the animations care about gets a layout box so intersection observers have
//! something to work with.

use super::{Document, NodeId, Rect};

/// Number of feature slots in the skeleton.
pub const FEATURE_SLOTS: usize = 4;

/// Number of project card slots in the skeleton.
pub const PROJECT_SLOTS: usize = 6;

/// Number of code example slots in the skeleton.
pub const EXAMPLE_SLOTS: usize = 2;

const PAGE_WIDTH: f64 = 1280.0;
const GUTTER: f64 = 40.0;

/// Build the landing page skeleton.
pub fn landing_page() -> Document {
    let mut doc = Document::new();
    doc.set_lang("en");
    doc.set_title("MarkdownFlow");
    let body = doc.body();

    build_nav(&mut doc, body);

    let main = element(&mut doc, body, "main", "");
    doc.set_attribute(main, "id", "content");
    let mut y = 80.0;

    y = build_hero(&mut doc, main, y);
    y = build_features(&mut doc, main, y);
    y = build_examples(&mut doc, main, y);
    y = build_playground(&mut doc, main, y);
    y = build_diagram(&mut doc, main, y);
    y = build_sponsors(&mut doc, main, y);
    y = build_projects(&mut doc, main, y);
    doc.set_rect(main, Rect::new(0.0, 80.0, PAGE_WIDTH, y - 80.0));

    let footer = element(&mut doc, body, "footer", "");
    doc.set_rect(footer, Rect::new(0.0, y, PAGE_WIDTH, 120.0));
    let line = element(&mut doc, footer, "p", "");
    doc.set_text_content(line, "© 2025 AI Shifu");
    doc.set_rect(body, Rect::new(0.0, 0.0, PAGE_WIDTH, y + 120.0));

    doc
}

fn element(doc: &mut Document, parent: NodeId, tag: &str, class: &str) -> NodeId {
    let node = doc.append_element(parent, tag);
    if !class.is_empty() {
        doc.set_class_name(node, class);
    }
    node
}

fn text(doc: &mut Document, parent: NodeId, tag: &str, class: &str, content: &str) -> NodeId {
    let node = element(doc, parent, tag, class);
    doc.set_text_content(node, content);
    node
}

fn build_nav(doc: &mut Document, body: NodeId) {
    let nav = element(doc, body, "nav", "navbar");
    doc.set_rect(nav, Rect::new(0.0, 0.0, PAGE_WIDTH, 80.0));
    text(doc, nav, "h1", "logo", "MarkdownFlow");

    let links = element(doc, nav, "div", "nav-links");
    let switcher = text(doc, links, "a", "language-link", "中文");
    doc.set_attribute(switcher, "id", "language-switcher");
    doc.set_attribute(switcher, "href", "/zh/");

    let docs = text(doc, links, "a", "github-link", "Docs");
    doc.set_attribute(docs, "href", "/docs/");

    let github = text(doc, links, "a", "github-link", "GitHub");
    doc.set_attribute(github, "href", "https://github.com/ai-shifu/markdown-flow");
    doc.set_attribute(github, "target", "_blank");
    doc.set_attribute(github, "rel", "noopener");

    let playground = text(doc, links, "a", "playground-link ripple", "Playground");
    doc.set_attribute(playground, "href", "https://play.markdownflow.ai/");
    doc.set_rect(playground, Rect::new(1120.0, 20.0, 120.0, 40.0));
}

fn build_hero(doc: &mut Document, main: NodeId, y: f64) -> f64 {
    let hero = element(doc, main, "section", "hero reveal");
    doc.set_rect(hero, Rect::new(0.0, y, PAGE_WIDTH, 600.0));
    let title = element(doc, hero, "h2", "typewriter");
    doc.set_rect(title, Rect::new(GUTTER, y + 160.0, PAGE_WIDTH - 2.0 * GUTTER, 80.0));
    text(doc, hero, "p", "skeleton", "Loading…");
    y + 600.0
}

fn build_features(doc: &mut Document, main: NodeId, y: f64) -> f64 {
    let section = element(doc, main, "section", "features");
    let grid = element(doc, section, "div", "feature-grid");
    let width = (PAGE_WIDTH - GUTTER * (FEATURE_SLOTS as f64 + 1.0)) / FEATURE_SLOTS as f64;
    for index in 0..FEATURE_SLOTS {
        let feature = element(doc, grid, "div", "feature reveal skeleton");
        let x = GUTTER + index as f64 * (width + GUTTER);
        doc.set_rect(feature, Rect::new(x, y + 40.0, width, 240.0));
        text(doc, feature, "div", "feature-icon", "•");
        text(doc, feature, "h3", "", "Feature");
        text(doc, feature, "p", "", "");
    }
    doc.set_rect(section, Rect::new(0.0, y, PAGE_WIDTH, 320.0));
    y + 320.0
}

fn build_examples(doc: &mut Document, main: NodeId, y: f64) -> f64 {
    let section = element(doc, main, "section", "examples-section");
    text(doc, section, "h3", "", "Examples");
    for index in 0..EXAMPLE_SLOTS {
        let example = element(doc, section, "div", "example code-reveal");
        doc.set_rect(
            example,
            Rect::new(GUTTER, y + 80.0 + index as f64 * 220.0, PAGE_WIDTH - 2.0 * GUTTER, 200.0),
        );
        text(doc, example, "div", "example-title", "");
        let pre = element(doc, example, "pre", "");
        text(doc, pre, "code", "", "");
    }
    let height = 80.0 + EXAMPLE_SLOTS as f64 * 220.0;
    doc.set_rect(section, Rect::new(0.0, y, PAGE_WIDTH, height));
    y + height
}

fn build_playground(doc: &mut Document, main: NodeId, y: f64) -> f64 {
    let section = element(doc, main, "section", "playground-section scale-reveal");
    doc.set_rect(section, Rect::new(0.0, y, PAGE_WIDTH, 300.0));
    let cta = text(doc, section, "a", "playground-cta ripple", "Try it");
    doc.set_attribute(cta, "href", "https://play.markdownflow.ai/");
    doc.set_rect(cta, Rect::new(490.0, y + 100.0, 300.0, 60.0));
    text(doc, section, "p", "playground-subtext", "");
    y + 300.0
}

fn build_diagram(doc: &mut Document, main: NodeId, y: f64) -> f64 {
    let section = element(doc, main, "section", "api-section");
    doc.set_rect(section, Rect::new(0.0, y, PAGE_WIDTH, 400.0));
    text(doc, section, "h3", "", "How it works");
    let diagram = element(doc, section, "div", "mermaid");
    doc.set_text_content(
        diagram,
        "flowchart LR\n  A[Prompt document] --> B[MarkdownFlow]\n  B --> C[Personalized content]",
    );
    y + 400.0
}

fn build_sponsors(doc: &mut Document, main: NodeId, y: f64) -> f64 {
    let section = element(doc, main, "section", "sponsors-section");
    doc.set_rect(section, Rect::new(0.0, y, PAGE_WIDTH, 200.0));
    text(doc, section, "h3", "", "Sponsors");
    let link = element(doc, section, "a", "sponsor");
    doc.set_attribute(link, "href", "https://ai-shifu.com");
    let logo = element(doc, link, "img", "");
    doc.set_attribute(logo, "src", "/assets/sponsor.png");
    doc.set_attribute(logo, "alt", "Sponsor");
    y + 200.0
}

fn build_projects(doc: &mut Document, main: NodeId, y: f64) -> f64 {
    let section = element(doc, main, "section", "api-section");
    text(doc, section, "h3", "", "Projects");
    let grid = element(doc, section, "div", "project-grid");
    let columns = 3;
    let width = (PAGE_WIDTH - GUTTER * (columns as f64 + 1.0)) / columns as f64;
    for index in 0..PROJECT_SLOTS {
        let card = element(doc, grid, "div", "project-card reveal");
        let (row, column) = (index / columns, index % columns);
        doc.set_rect(
            card,
            Rect::new(
                GUTTER + column as f64 * (width + GUTTER),
                y + 80.0 + row as f64 * 240.0,
                width,
                220.0,
            ),
        );
        text(doc, card, "div", "project-name", "");
        text(doc, card, "span", "project-type", "");
        text(doc, card, "p", "project-description", "");
        text(doc, card, "div", "project-license", "");
    }
    let height = 80.0 + (PROJECT_SLOTS / columns) as f64 * 240.0;
    doc.set_rect(section, Rect::new(0.0, y, PAGE_WIDTH, height));
    y + height
}
