//! Reveal-on-scroll: fire-once class toggling for elements entering view.

use super::scope::{Registration, TaskScope};
use super::{AnimationConfig, PhaseMap};
use crate::dom::{IntersectionEntry, IntersectionOptions, Margin, NodeId, ObserverId, SharedDocument};
use futures::StreamExt;
use std::time::Duration;
use tracing::debug;

pub(crate) const REVEAL_SELECTOR: &str = ".reveal, .scale-reveal, .code-reveal";
pub(crate) const REVEALED_CLASS: &str = "revealed";

/// Lifecycle of a revealable element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealPhase {
    Idle,
    /// Seen; waiting out its stagger delay
    Revealing,
    Revealed,
}

#[derive(Clone)]
pub(crate) struct RevealScheduler {
    doc: SharedDocument,
    scope: TaskScope,
    phases: PhaseMap<RevealPhase>,
    observer: ObserverId,
    stagger: Duration,
}

impl RevealScheduler {
    /// Observe every revealable element under `root`.
    pub(crate) fn start(
        doc: &SharedDocument,
        scope: &TaskScope,
        root: NodeId,
        config: &AnimationConfig,
        phases: PhaseMap<RevealPhase>,
    ) -> Self {
        let (observer, mut entries) = {
            let mut d = doc.borrow_mut();
            let targets = d.query_selector_all(root, REVEAL_SELECTOR);
            let (observer, entries) = d.create_intersection_observer(IntersectionOptions {
                threshold: config.reveal_threshold,
                root_margin: config.reveal_root_margin,
            });
            scope.register(Registration::Intersection(observer), &mut d);

            phases
                .borrow_mut()
                .extend(targets.iter().map(|&target| (target, RevealPhase::Idle)));
            for target in targets {
                d.observe(observer, target);
            }
            (observer, entries)
        };

        let scheduler = Self {
            doc: doc.clone(),
            scope: scope.clone(),
            phases,
            observer,
            stagger: config.reveal_stagger,
        };

        let handler = scheduler.clone();
        scope.spawn(async move {
            while let Some(batch) = entries.next().await {
                handler.handle_entries(batch);
            }
        });
        scheduler
    }

    /// Move intersecting idle elements to `Revealing` and schedule the flip.
    ///
    /// Elements are unobserved as soon as they start revealing, and anything
    /// not `Idle` is ignored, so a reveal never runs twice.
    pub(crate) fn handle_entries(&self, entries: Vec<IntersectionEntry>) {
        for entry in entries.into_iter().filter(|e| e.is_intersecting) {
            let target = entry.target;
            {
                let mut phases = self.phases.borrow_mut();
                if phases.get(&target) != Some(&RevealPhase::Idle) {
                    continue;
                }
                phases.insert(target, RevealPhase::Revealing);
            }

            let index = {
                let mut d = self.doc.borrow_mut();
                d.unobserve(self.observer, target);
                d.element_index(target).unwrap_or(0)
            };
            let delay = self.stagger * index as u32;
            debug!("Revealing {:?} after {:?}", target, delay);

            let doc = self.doc.clone();
            let phases = self.phases.clone();
            self.scope.after(delay, move || {
                doc.borrow_mut().add_class(target, REVEALED_CLASS);
                phases.borrow_mut().insert(target, RevealPhase::Revealed);
            });
        }
    }
}

/// Toggle `will-change` on revealable elements near the viewport.
///
/// Compositor hints are only useful while an element is about to animate,
/// so they are dropped again when it scrolls away.
pub(crate) fn start_will_change_hints(doc: &SharedDocument, scope: &TaskScope, root: NodeId) {
    let mut entries = {
        let mut d = doc.borrow_mut();
        let targets = d.query_selector_all(root, REVEAL_SELECTOR);
        let (observer, entries) = d.create_intersection_observer(IntersectionOptions {
            threshold: 0.0,
            root_margin: Margin::new(100.0, 0.0, 100.0, 0.0),
        });
        scope.register(Registration::Intersection(observer), &mut d);
        for target in targets {
            d.observe(observer, target);
        }
        entries
    };

    let doc = doc.clone();
    scope.spawn(async move {
        while let Some(batch) = entries.next().await {
            let mut d = doc.borrow_mut();
            for entry in batch {
                let hint = if entry.is_intersecting {
                    "transform, opacity"
                } else {
                    "auto"
                };
                d.set_style(entry.target, "will-change", hint);
            }
        }
    });
}
