//! Ripple feedback on pointer activation.

use super::scope::{Registration, TaskScope};
use super::{AnimationConfig, PhaseMap};
use crate::dom::{Document, NodeId, PointerEvent, SharedDocument};
use futures::stream::{self, StreamExt};
use std::time::Duration;
use tracing::debug;

pub(crate) const RIPPLE_SELECTOR: &str = ".ripple";
pub(crate) const RIPPLE_CLASS: &str = "ripple-effect";
pub(crate) const STYLE_ID: &str = "ripple-styles";

const KEYFRAMES: &str =
    "@keyframes ripple-animation { to { transform: scale(2); opacity: 0; } }";

/// Lifecycle of a spawned ripple overlay.
///
/// A ripple only exists once a pointer activation created it, so it starts
/// out expanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RipplePhase {
    Expanding,
    Removed,
}

/// Listen for activations on every ripple control under `root`.
///
/// Returns the number of controls wired up.
pub(crate) fn start(
    doc: &SharedDocument,
    scope: &TaskScope,
    root: NodeId,
    config: &AnimationConfig,
    phases: PhaseMap<RipplePhase>,
) -> usize {
    let receivers: Vec<_> = {
        let mut d = doc.borrow_mut();
        ensure_keyframes(&mut d);
        let controls = d.query_selector_all(root, RIPPLE_SELECTOR);
        controls
            .into_iter()
            .map(|control| {
                let (listener, events) = d.add_click_listener(control);
                scope.register(Registration::Listener(listener), &mut d);
                events
            })
            .collect()
    };
    let count = receivers.len();
    if count == 0 {
        return 0;
    }

    let mut events = stream::select_all(receivers);
    let doc = doc.clone();
    let task_scope = scope.clone();
    let duration = config.ripple_duration;
    scope.spawn(async move {
        while let Some(event) = events.next().await {
            spawn_ripple(&doc, &task_scope, &phases, duration, event);
        }
    });
    count
}

/// Inject the keyframes stylesheet into `<head>` once.
pub(crate) fn ensure_keyframes(doc: &mut Document) {
    let head = doc.head();
    if doc
        .query_selector(doc.document_element(), &format!("#{}", STYLE_ID))
        .is_some()
    {
        return;
    }
    let style = doc.append_element(head, "style");
    doc.set_attribute(style, "id", STYLE_ID);
    doc.set_text_content(style, KEYFRAMES);
}

/// Create one overlay inside the activated control and schedule its removal.
pub(crate) fn spawn_ripple(
    doc: &SharedDocument,
    scope: &TaskScope,
    phases: &PhaseMap<RipplePhase>,
    duration: Duration,
    event: PointerEvent,
) -> Option<NodeId> {
    let control = event.current_target;
    let ripple = {
        let mut d = doc.borrow_mut();
        let rect = d.bounding_client_rect(control)?;
        let size = rect.width.max(rect.height);
        let left = event.client_x - rect.x - size / 2.0;
        let top = event.client_y - rect.y - size / 2.0;

        let ripple = d.create_element("span");
        d.add_class(ripple, RIPPLE_CLASS);
        for (property, value) in [
            ("position", "absolute".to_string()),
            ("border-radius", "50%".to_string()),
            ("background", "rgba(255, 255, 255, 0.3)".to_string()),
            ("width", format!("{}px", size)),
            ("height", format!("{}px", size)),
            ("left", format!("{}px", left)),
            ("top", format!("{}px", top)),
            ("pointer-events", "none".to_string()),
            ("transform", "scale(0)".to_string()),
            ("animation", format!("ripple-animation {}s ease-out", duration.as_secs_f64())),
        ] {
            d.set_style(ripple, property, &value);
        }
        d.append_child(control, ripple);
        ripple
    };
    phases.borrow_mut().insert(ripple, RipplePhase::Expanding);
    debug!("Spawned ripple {:?} in {:?}", ripple, control);

    let doc = doc.clone();
    let phases = phases.clone();
    scope.after(duration, move || {
        // The control may already be gone; removal tolerates that
        doc.borrow_mut().remove(ripple);
        phases.borrow_mut().insert(ripple, RipplePhase::Removed);
    });
    Some(ripple)
}
