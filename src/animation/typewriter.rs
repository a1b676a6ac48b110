//! Typewriter sequencer: emits an element's text one character per tick.

use super::scope::TaskScope;
use super::{AnimationConfig, PhaseMap};
use crate::dom::{Document, NodeId, SharedDocument};
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant};
use tracing::debug;

pub(crate) const TYPEWRITER_SELECTOR: &str = ".typewriter";
pub(crate) const COMPLETE_CLASS: &str = "typing-complete";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypewriterPhase {
    /// Cleared, waiting for its start delay
    Idle,
    Typing,
    Complete,
}

/// The text an element should type.
///
/// `data-text` wins over live text so a re-run never re-reads text a previous
/// run already consumed. Empty and `"undefined"` sources are skipped.
pub(crate) fn capture_text(doc: &Document, node: NodeId) -> Option<String> {
    let text = doc
        .get_attribute(node, "data-text")
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| doc.text_content(node).trim().to_string());
    if text.is_empty() || text == "undefined" {
        None
    } else {
        Some(text)
    }
}

/// Clear every typewriter element under `root` and schedule its sequence.
///
/// Returns the number of sequences scheduled.
pub(crate) fn start(
    doc: &SharedDocument,
    scope: &TaskScope,
    root: NodeId,
    config: &AnimationConfig,
    phases: &PhaseMap<TypewriterPhase>,
) -> usize {
    let sequences: Vec<(NodeId, String, Duration)> = {
        let mut d = doc.borrow_mut();
        let targets = d.query_selector_all(root, TYPEWRITER_SELECTOR);
        targets
            .into_iter()
            .enumerate()
            .filter_map(|(index, node)| {
                let text = capture_text(&d, node)?;
                d.set_text_content(node, "");
                d.set_style(node, "opacity", "1");
                d.set_style(node, "transform", "translateY(0)");
                let delay = config.typewriter_initial_delay + config.typewriter_stagger * index as u32;
                Some((node, text, delay))
            })
            .collect()
    };

    let interval = config.typing_interval_for(doc.borrow().lang().as_deref());
    for (node, text, delay) in &sequences {
        phases.borrow_mut().insert(*node, TypewriterPhase::Idle);
        scope.spawn(run_sequence(
            doc.clone(),
            phases.clone(),
            *node,
            text.clone(),
            *delay,
            interval,
        ));
    }
    sequences.len()
}

/// Wait `delay`, then append one character of `text` every `interval`.
///
/// The element is marked complete as soon as the last character lands. A
/// tick that finds the element detached ends the sequence without touching
/// it.
pub(crate) async fn run_sequence(
    doc: SharedDocument,
    phases: PhaseMap<TypewriterPhase>,
    node: NodeId,
    text: String,
    delay: Duration,
    interval: Duration,
) {
    sleep(delay).await;
    phases.borrow_mut().insert(node, TypewriterPhase::Typing);

    let mut ticker = interval_at(Instant::now() + interval, interval);
    let mut buffer = [0u8; 4];
    for ch in text.chars() {
        ticker.tick().await;
        let mut d = doc.borrow_mut();
        if !d.is_connected(node) {
            debug!("Typewriter target {:?} detached, stopping", node);
            return;
        }
        d.append_text(node, ch.encode_utf8(&mut buffer));
    }

    doc.borrow_mut().add_class(node, COMPLETE_CLASS);
    phases.borrow_mut().insert(node, TypewriterPhase::Complete);
}

/// Reduced-motion path: show the full text at once.
pub(crate) fn complete_immediately(
    doc: &mut Document,
    root: NodeId,
    phases: &PhaseMap<TypewriterPhase>,
) -> usize {
    let targets = doc.query_selector_all(root, TYPEWRITER_SELECTOR);
    let mut completed = 0;
    for node in targets {
        let Some(text) = capture_text(doc, node) else {
            continue;
        };
        doc.set_text_content(node, &text);
        doc.add_class(node, COMPLETE_CLASS);
        phases.borrow_mut().insert(node, TypewriterPhase::Complete);
        completed += 1;
    }
    completed
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeMap;
    use std::rc::Rc;
    use tokio::task::LocalSet;

    fn page(texts: &[&str]) -> (SharedDocument, Vec<NodeId>) {
        let mut doc = Document::new();
        let nodes = texts
            .iter()
            .map(|text| {
                let node = doc.append_element(doc.body(), "h2");
                doc.set_class_name(node, "typewriter");
                doc.set_attribute(node, "data-text", text);
                node
            })
            .collect();
        (doc.into_shared(), nodes)
    }

    fn phases() -> PhaseMap<TypewriterPhase> {
        Rc::new(RefCell::new(BTreeMap::new()))
    }

    fn text(doc: &SharedDocument, node: NodeId) -> String {
        doc.borrow().text_content(node)
    }

    // ==================== Capture Tests ====================

    #[test]
    fn test_capture_prefers_data_text() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.body(), "h2");
        doc.set_text_content(node, "  live  ");
        assert_eq!(capture_text(&doc, node).as_deref(), Some("live"));

        doc.set_attribute(node, "data-text", "stored");
        assert_eq!(capture_text(&doc, node).as_deref(), Some("stored"));
    }

    #[test]
    fn test_capture_skips_empty_and_undefined() {
        let mut doc = Document::new();
        let node = doc.append_element(doc.body(), "h2");
        assert_eq!(capture_text(&doc, node), None);
        doc.set_text_content(node, "undefined");
        assert_eq!(capture_text(&doc, node), None);
    }

    // ==================== Sequence Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_sequence_timing_for_two_characters() {
        LocalSet::new()
            .run_until(async {
                let (doc, nodes) = page(&["AI"]);
                let node = nodes[0];
                doc.borrow_mut().set_text_content(node, "");
                let phases = phases();
                tokio::task::spawn_local(run_sequence(
                    doc.clone(),
                    phases.clone(),
                    node,
                    "AI".to_string(),
                    Duration::ZERO,
                    Duration::from_millis(50),
                ));

                sleep(Duration::from_millis(49)).await;
                assert_eq!(text(&doc, node), "");
                assert_eq!(phases.borrow().get(&node), Some(&TypewriterPhase::Typing));

                sleep(Duration::from_millis(11)).await;
                assert_eq!(text(&doc, node), "A");

                sleep(Duration::from_millis(39)).await;
                assert_eq!(text(&doc, node), "A");

                sleep(Duration::from_millis(11)).await;
                assert_eq!(text(&doc, node), "AI");
                assert_eq!(phases.borrow().get(&node), Some(&TypewriterPhase::Complete));
                assert!(doc.borrow().has_class(node, COMPLETE_CLASS));

                let snapshot = doc.borrow().outer_html(node);
                sleep(Duration::from_secs(1)).await;
                assert_eq!(doc.borrow().outer_html(node), snapshot);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_clears_and_staggers() {
        LocalSet::new()
            .run_until(async {
                let (doc, nodes) = page(&["ab", "cd"]);
                let phases = phases();
                let body = doc.borrow().body();
                let started = start(&doc, &TaskScope::new(), body, &AnimationConfig::default(), &phases);
                assert_eq!(started, 2);

                {
                    let d = doc.borrow();
                    assert_eq!(d.text_content(nodes[0]), "");
                    assert_eq!(d.style(nodes[0], "opacity"), Some("1"));
                    assert_eq!(d.style(nodes[0], "transform"), Some("translateY(0)"));
                }

                // First starts at 500ms, second at 800ms, 50ms per character
                sleep(Duration::from_millis(560)).await;
                assert_eq!(text(&doc, nodes[0]), "a");
                assert_eq!(phases.borrow().get(&nodes[1]), Some(&TypewriterPhase::Idle));

                sleep(Duration::from_millis(300)).await;
                assert_eq!(text(&doc, nodes[0]), "ab");
                assert_eq!(text(&doc, nodes[1]), "c");
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_chinese_pages_type_slower() {
        LocalSet::new()
            .run_until(async {
                let (doc, nodes) = page(&["一次创作"]);
                doc.borrow_mut().set_lang("zh");
                let phases = phases();
                let body = doc.borrow().body();
                start(&doc, &TaskScope::new(), body, &AnimationConfig::default(), &phases);

                sleep(Duration::from_millis(560)).await;
                assert_eq!(text(&doc, nodes[0]), "");
                sleep(Duration::from_millis(50)).await;
                assert_eq!(text(&doc, nodes[0]), "一");
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_detached_element_is_not_touched() {
        LocalSet::new()
            .run_until(async {
                let (doc, nodes) = page(&["abc"]);
                let phases = phases();
                let body = doc.borrow().body();
                start(&doc, &TaskScope::new(), body, &AnimationConfig::default(), &phases);

                sleep(Duration::from_millis(560)).await;
                doc.borrow_mut().remove(nodes[0]);
                sleep(Duration::from_secs(1)).await;

                assert_eq!(text(&doc, nodes[0]), "a");
                assert!(!doc.borrow().has_class(nodes[0], COMPLETE_CLASS));
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_mid_sequence_stops_ticks() {
        LocalSet::new()
            .run_until(async {
                let (doc, nodes) = page(&["abcdef"]);
                let phases = phases();
                let scope = TaskScope::new();
                let body = doc.borrow().body();
                start(&doc, &scope, body, &AnimationConfig::default(), &phases);

                sleep(Duration::from_millis(610)).await;
                assert_eq!(text(&doc, nodes[0]), "ab");
                scope.revoke_all(&mut doc.borrow_mut());

                sleep(Duration::from_secs(1)).await;
                assert_eq!(text(&doc, nodes[0]), "ab");
                assert_eq!(phases.borrow().get(&nodes[0]), Some(&TypewriterPhase::Typing));
            })
            .await;
    }

    // ==================== Reduced Motion Tests ====================

    #[test]
    fn test_complete_immediately_writes_full_text() {
        let (doc, nodes) = page(&["Hello", ""]);
        let phases = phases();
        let mut d = doc.borrow_mut();
        let body = d.body();
        assert_eq!(complete_immediately(&mut d, body, &phases), 1);
        assert_eq!(d.text_content(nodes[0]), "Hello");
        assert!(d.has_class(nodes[0], COMPLETE_CLASS));
        assert_eq!(phases.borrow().get(&nodes[1]), None);
    }
}
