//! Animation orchestration for a hydrated page.
//!
//! Three independent schedulers share the page's single event loop:
//!
//! - `reveal`: fire-once class flips for elements scrolling into view
//! - `ripple`: transient overlays spawned on pointer activation
//! - `typewriter`: per-character text emission with staggered starts
//!
//! Every timer, observer and listener they create is owned by one
//! [`TaskScope`]; [`Orchestrator::teardown`] revokes all of it at once.
//! Phases only ever move forward.

mod reveal;
mod ripple;
mod scope;
mod typewriter;

pub use reveal::RevealPhase;
pub use ripple::RipplePhase;
pub use scope::{Registration, TaskScope};
pub use typewriter::TypewriterPhase;

use crate::dom::{Document, Margin, NodeId, SharedDocument};
use crate::i18n::Locale;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;
use tracing::info;

/// Per-element phase table shared between the orchestrator and its tasks.
pub(crate) type PhaseMap<P> = Rc<RefCell<BTreeMap<NodeId, P>>>;

const SKELETON_CLASS: &str = "skeleton";

/// Shortest per-character typing interval; timers cannot tick at zero.
const MIN_TYPING_INTERVAL: Duration = Duration::from_millis(1);

/// Timing and behaviour of the page animations.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    /// Minimum visible fraction before an element reveals
    pub reveal_threshold: f64,
    /// Viewport adjustment for reveal detection (negative bottom triggers late)
    pub reveal_root_margin: Margin,
    /// Extra delay per sibling position
    pub reveal_stagger: Duration,
    /// Lifetime of a ripple overlay
    pub ripple_duration: Duration,
    /// Delay before the first typewriter starts
    pub typewriter_initial_delay: Duration,
    /// Additional start delay for each subsequent typewriter
    pub typewriter_stagger: Duration,
    /// Per-character interval for alphabetic scripts
    pub typing_interval_latin: Duration,
    /// Per-character interval for logographic scripts
    pub typing_interval_logographic: Duration,
    /// When loading placeholders are cleared
    pub skeleton_delay: Duration,
    /// When compositor hints start being managed
    pub will_change_delay: Duration,
    /// Skip every animation and show final content immediately
    pub reduced_motion: bool,
}

impl AnimationConfig {
    /// Preset: the site's regular motion.
    pub fn standard() -> Self {
        Self {
            reveal_threshold: 0.1,
            reveal_root_margin: Margin::new(0.0, 0.0, -50.0, 0.0),
            reveal_stagger: Duration::from_millis(100),
            ripple_duration: Duration::from_millis(600),
            typewriter_initial_delay: Duration::from_millis(500),
            typewriter_stagger: Duration::from_millis(300),
            typing_interval_latin: Duration::from_millis(50),
            typing_interval_logographic: Duration::from_millis(100),
            skeleton_delay: Duration::from_millis(1000),
            will_change_delay: Duration::from_millis(100),
            reduced_motion: false,
        }
    }

    /// Preset: visitor asked for reduced motion.
    pub fn reduced_motion() -> Self {
        Self::standard().with_reduced_motion(true)
    }

    pub fn with_reduced_motion(mut self, reduced_motion: bool) -> Self {
        self.reduced_motion = reduced_motion;
        self
    }

    /// Set the start delay between consecutive typewriters (zero disables staggering)
    pub fn with_typewriter_stagger(mut self, stagger: Duration) -> Self {
        self.typewriter_stagger = stagger;
        self
    }

    pub fn with_typing_intervals(mut self, latin: Duration, logographic: Duration) -> Self {
        self.typing_interval_latin = latin;
        self.typing_interval_logographic = logographic;
        self
    }

    pub fn with_ripple_duration(mut self, duration: Duration) -> Self {
        self.ripple_duration = duration;
        self
    }

    pub fn with_reveal_stagger(mut self, stagger: Duration) -> Self {
        self.reveal_stagger = stagger;
        self
    }

    /// Typing interval for a document language (`<html lang>`), never below 1ms.
    pub fn typing_interval_for(&self, lang: Option<&str>) -> Duration {
        let logographic = lang
            .and_then(Locale::from_code)
            .is_some_and(Locale::is_logographic);
        let interval = if logographic {
            self.typing_interval_logographic
        } else {
            self.typing_interval_latin
        };
        interval.max(MIN_TYPING_INTERVAL)
    }
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Running animations for one page session.
pub struct Orchestrator {
    doc: SharedDocument,
    scope: TaskScope,
    reveal: PhaseMap<RevealPhase>,
    ripple: PhaseMap<RipplePhase>,
    typewriter: PhaseMap<TypewriterPhase>,
}

impl Orchestrator {
    /// Start every scheduler over the elements under `root`.
    ///
    /// Must be called from within a `LocalSet`, after hydration.
    pub fn start(doc: SharedDocument, root: NodeId, config: &AnimationConfig) -> Self {
        let scope = TaskScope::new();
        let reveal_phases: PhaseMap<RevealPhase> = PhaseMap::default();
        let ripple_phases: PhaseMap<RipplePhase> = PhaseMap::default();
        let typewriter_phases: PhaseMap<TypewriterPhase> = PhaseMap::default();

        if config.reduced_motion {
            let mut d = doc.borrow_mut();
            let completed = typewriter::complete_immediately(&mut d, root, &typewriter_phases);
            remove_skeletons(&mut d, root);
            info!("Reduced motion: {} typewriter elements shown in full", completed);
        } else {
            {
                let mut d = doc.borrow_mut();
                let html = d.document_element();
                d.set_style(html, "scroll-behavior", "smooth");
            }

            reveal::RevealScheduler::start(&doc, &scope, root, config, reveal_phases.clone());
            let controls = ripple::start(&doc, &scope, root, config, ripple_phases.clone());
            let typewriters = typewriter::start(&doc, &scope, root, config, &typewriter_phases);

            let skeleton_doc = doc.clone();
            scope.after(config.skeleton_delay, move || {
                remove_skeletons(&mut skeleton_doc.borrow_mut(), root);
            });

            let hint_doc = doc.clone();
            let hint_scope = scope.clone();
            scope.after(config.will_change_delay, move || {
                reveal::start_will_change_hints(&hint_doc, &hint_scope, root);
            });

            info!(
                "Animations started: {} reveal targets, {} ripple controls, {} typewriters",
                reveal_phases.borrow().len(),
                controls,
                typewriters
            );
        }

        Self {
            doc,
            scope,
            reveal: reveal_phases,
            ripple: ripple_phases,
            typewriter: typewriter_phases,
        }
    }

    pub fn reveal_phase(&self, node: NodeId) -> Option<RevealPhase> {
        self.reveal.borrow().get(&node).copied()
    }

    pub fn typewriter_phase(&self, node: NodeId) -> Option<TypewriterPhase> {
        self.typewriter.borrow().get(&node).copied()
    }

    pub fn ripple_phase(&self, node: NodeId) -> Option<RipplePhase> {
        self.ripple.borrow().get(&node).copied()
    }

    /// Every ripple overlay spawned so far, in creation order.
    pub fn ripples(&self) -> Vec<NodeId> {
        self.ripple.borrow().keys().copied().collect()
    }

    /// Registrations still holding timers, observers or listeners.
    pub fn outstanding(&self) -> usize {
        self.scope.outstanding()
    }

    pub fn is_torn_down(&self) -> bool {
        self.scope.is_revoked()
    }

    /// Revoke every registration. Returns how many were still live.
    pub fn teardown(&self) -> usize {
        let revoked = self.scope.revoke_all(&mut self.doc.borrow_mut());
        info!("Animations torn down ({} registrations revoked)", revoked);
        revoked
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        if self.scope.is_revoked() {
            return;
        }
        if let Ok(mut doc) = self.doc.try_borrow_mut() {
            self.scope.revoke_all(&mut doc);
        }
    }
}

fn remove_skeletons(doc: &mut Document, root: NodeId) {
    let placeholders = doc.query_selector_all(root, &format!(".{}", SKELETON_CLASS));
    for node in placeholders {
        doc.remove_class(node, SKELETON_CLASS);
    }
}
