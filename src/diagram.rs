//! Diagram renderer adapter.
//!
//! The renderer itself is an external collaborator that turns a diagram
//! definition into SVG markup. This module only decides *when* to call it:
//! once the renderer reports ready, then again shortly after every
//! structural change to the page, for every diagram not yet processed.

use crate::animation::{Registration, TaskScope};
use crate::dom::{escape_text, Document, NodeId, SharedDocument};
use futures::StreamExt;
use serde::Serialize;
use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Elements holding a diagram definition.
pub const DIAGRAM_SELECTOR: &str = ".mermaid";

/// Attribute marking a diagram that has been rendered.
pub const PROCESSED_ATTRIBUTE: &str = "data-processed";

/// How often readiness is polled.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Delay between a structural change and the re-render it triggers.
const RERENDER_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("renderer is not initialized")]
    NotInitialized,

    #[error("invalid diagram definition: {0}")]
    InvalidDefinition(String),

    #[error("renderer failed: {0}")]
    Failed(String),
}

/// Renderer settings, serialized in the renderer's own field names.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramConfig {
    pub start_on_load: bool,
    pub theme: String,
    pub security_level: String,
    pub font_family: String,
    pub flowchart: FlowchartConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowchartConfig {
    pub html_labels: bool,
    pub curve: String,
}

impl Default for DiagramConfig {
    fn default() -> Self {
        Self {
            start_on_load: false,
            theme: "default".to_string(),
            security_level: "loose".to_string(),
            font_family: "Roboto, sans-serif".to_string(),
            flowchart: FlowchartConfig {
                html_labels: true,
                curve: "basis".to_string(),
            },
        }
    }
}

/// External diagram renderer.
pub trait DiagramRenderer {
    /// Whether the renderer has finished loading.
    fn is_ready(&self) -> bool;

    fn initialize(&self, config: &DiagramConfig);

    /// Render one definition to markup.
    fn render(&self, graph_id: &str, definition: &str) -> Result<String, RenderError>;
}

/// Renderer that shows the definition source instead of a drawing.
///
/// Used where no real renderer is available, such as the preview binary.
#[derive(Debug, Default)]
pub struct SourceRenderer {
    initialized: Cell<bool>,
}

impl DiagramRenderer for SourceRenderer {
    fn is_ready(&self) -> bool {
        true
    }

    fn initialize(&self, _config: &DiagramConfig) {
        self.initialized.set(true);
    }

    fn render(&self, graph_id: &str, definition: &str) -> Result<String, RenderError> {
        if !self.initialized.get() {
            return Err(RenderError::NotInitialized);
        }
        if definition.is_empty() {
            return Err(RenderError::InvalidDefinition("empty definition".to_string()));
        }
        Ok(format!(
            "<pre id=\"{}\" class=\"diagram-source\">{}</pre>",
            graph_id,
            escape_text(definition)
        ))
    }
}

/// Mark a diagram element as rendered so later passes skip it.
pub fn mark_processed(doc: &mut Document, node: NodeId) {
    doc.set_attribute(node, PROCESSED_ATTRIBUTE, "true");
}

/// Schedules diagram rendering for one page.
pub struct DiagramAdapter {
    doc: SharedDocument,
    renderer: Rc<dyn DiagramRenderer>,
    root: NodeId,
    config: DiagramConfig,
    scope: TaskScope,
    initialized: Rc<Cell<bool>>,
}

impl DiagramAdapter {
    pub fn new(doc: SharedDocument, renderer: Rc<dyn DiagramRenderer>, root: NodeId) -> Self {
        Self {
            doc,
            renderer,
            root,
            config: DiagramConfig::default(),
            scope: TaskScope::new(),
            initialized: Rc::new(Cell::new(false)),
        }
    }

    pub fn with_config(mut self, config: DiagramConfig) -> Self {
        self.config = config;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.get()
    }

    /// Start polling for readiness and watching for structural changes.
    ///
    /// Must be called from within a `LocalSet`.
    pub fn attach(&self) {
        let worker = self.worker();
        self.scope.spawn(async move {
            let mut polls = 0u32;
            while !worker.renderer.is_ready() {
                polls += 1;
                sleep(READY_POLL_INTERVAL).await;
            }
            worker.renderer.initialize(&worker.config);
            worker.initialized.set(true);
            info!("Diagram renderer ready after {} polls", polls);
            worker.render_all();
        });

        let mut changes = {
            let mut d = self.doc.borrow_mut();
            let (observer, changes) = d.observe_mutations(self.root);
            self.scope.register(Registration::Mutation(observer), &mut d);
            changes
        };
        let worker = self.worker();
        self.scope.spawn(async move {
            while changes.next().await.is_some() {
                sleep(RERENDER_DELAY).await;
                // Everything that arrived during the delay is covered by one pass
                while changes.try_recv().is_ok() {}
                worker.render_all();
            }
        });
    }

    /// Render every unprocessed diagram under the root.
    ///
    /// Returns the number rendered. Does nothing until the renderer has been
    /// initialized. A failing diagram is logged and left unprocessed.
    pub fn render_all(&self) -> usize {
        self.worker().render_all()
    }

    /// Stop polling and watching. Returns the registrations released.
    pub fn detach(&self) -> usize {
        self.scope.revoke_all(&mut self.doc.borrow_mut())
    }

    fn worker(&self) -> RenderWorker {
        RenderWorker {
            doc: self.doc.clone(),
            renderer: self.renderer.clone(),
            root: self.root,
            config: self.config.clone(),
            initialized: self.initialized.clone(),
        }
    }
}

impl Drop for DiagramAdapter {
    fn drop(&mut self) {
        if self.scope.is_revoked() {
            return;
        }
        if let Ok(mut doc) = self.doc.try_borrow_mut() {
            self.scope.revoke_all(&mut doc);
        }
    }
}

/// The part of the adapter that scheduled tasks carry.
struct RenderWorker {
    doc: SharedDocument,
    renderer: Rc<dyn DiagramRenderer>,
    root: NodeId,
    config: DiagramConfig,
    initialized: Rc<Cell<bool>>,
}

impl RenderWorker {
    fn render_all(&self) -> usize {
        if !self.initialized.get() {
            return 0;
        }

        let pending: Vec<(usize, NodeId, String)> = {
            let d = self.doc.borrow();
            d.query_selector_all(self.root, DIAGRAM_SELECTOR)
                .into_iter()
                .enumerate()
                .filter(|(_, node)| !d.has_attribute(*node, PROCESSED_ATTRIBUTE))
                .map(|(index, node)| (index, node, d.text_content(node).trim().to_string()))
                .collect()
        };

        let stamp = chrono::Utc::now().timestamp_millis();
        let mut rendered = 0;
        for (index, node, definition) in pending {
            let graph_id = format!("mermaid-{}-{}", index, stamp);
            match self.renderer.render(&graph_id, &definition) {
                Ok(svg) => {
                    let mut d = self.doc.borrow_mut();
                    if !d.is_connected(node) {
                        continue;
                    }
                    d.set_inner_html(node, &svg);
                    mark_processed(&mut d, node);
                    rendered += 1;
                }
                Err(e) => error!("Failed to render diagram {}: {}", graph_id, e),
            }
        }

        if rendered > 0 {
            debug!("Rendered {} diagrams", rendered);
        }
        rendered
    }
}
