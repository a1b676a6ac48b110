//! Page lifecycle: one visit from load to teardown.
//!
//! `boot` runs the fixed startup order (resolve and maybe redirect, then
//! hydrate, then animate) and hands back a [`PageSession`] owning everything
//! that was started.

use crate::animation::{AnimationConfig, Orchestrator, Registration, TaskScope};
use crate::diagram::{DiagramAdapter, DiagramRenderer};
use crate::dom::{NodeId, SharedDocument};
use crate::hydrate::{anchors, hydrate, HydrationReport};
use crate::i18n::{ContentBundle, Locale, TranslationCatalog};
use crate::resolver::{resolve_with_store, switch_target, Action, RedirectDecision, Resolver};
use crate::store::LocaleStore;
use futures::StreamExt;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;
use tracing::{info, warn};

/// Delay between a language-switch click and the navigation.
pub const SWITCH_NAVIGATION_DELAY: Duration = Duration::from_millis(150);

/// Body opacity while a language switch is pending.
const SWITCH_DIM_OPACITY: &str = "0.8";

/// What the host knows about this visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageEnv {
    pub path: String,
    pub browser_language: Option<String>,
    pub prefers_reduced_motion: bool,
}

impl PageEnv {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            browser_language: None,
            prefers_reduced_motion: false,
        }
    }

    pub fn with_browser_language(mut self, language: &str) -> Self {
        self.browser_language = Some(language.to_string());
        self
    }

    pub fn with_reduced_motion(mut self, reduced_motion: bool) -> Self {
        self.prefers_reduced_motion = reduced_motion;
        self
    }
}

/// Leaves the current page.
pub trait Navigator {
    fn navigate(&self, url: &str);
}

/// Navigator that records where it was sent instead of going there.
#[derive(Debug, Clone, Default)]
pub struct RecordingNavigator {
    visits: Rc<RefCell<Vec<String>>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.borrow().clone()
    }

    pub fn last(&self) -> Option<String> {
        self.visits.borrow().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, url: &str) {
        info!("Navigating to {}", url);
        self.visits.borrow_mut().push(url.to_string());
    }
}

/// Collaborators shared by every page load.
#[derive(Clone)]
pub struct PageContext {
    catalog: Rc<TranslationCatalog>,
    store: Rc<dyn LocaleStore>,
    navigator: Rc<dyn Navigator>,
    resolver: Resolver,
    animation: AnimationConfig,
}

impl PageContext {
    pub fn new(
        catalog: TranslationCatalog,
        store: Rc<dyn LocaleStore>,
        navigator: Rc<dyn Navigator>,
    ) -> Self {
        Self {
            catalog: Rc::new(catalog),
            store,
            navigator,
            resolver: Resolver::default(),
            animation: AnimationConfig::default(),
        }
    }

    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_animation(mut self, animation: AnimationConfig) -> Self {
        self.animation = animation;
        self
    }

    pub fn catalog(&self) -> &TranslationCatalog {
        &self.catalog
    }

    /// Bundle for `locale`, falling back to the canonical locale's bundle.
    fn bundle_for(&self, locale: Locale) -> Option<&ContentBundle> {
        self.catalog.bundle(locale).or_else(|| {
            warn!("No content for locale '{}', using canonical bundle", locale);
            self.catalog.bundle(Locale::canonical())
        })
    }
}

pub enum BootOutcome {
    /// The page navigated away; nothing was hydrated or started
    Redirected(RedirectDecision),
    Running(PageSession),
}

impl BootOutcome {
    pub fn decision(&self) -> &RedirectDecision {
        match self {
            BootOutcome::Redirected(decision) => decision,
            BootOutcome::Running(session) => session.decision(),
        }
    }

    pub fn into_session(self) -> Option<PageSession> {
        match self {
            BootOutcome::Redirected(_) => None,
            BootOutcome::Running(session) => Some(session),
        }
    }
}

/// Load one page into `doc`.
///
/// Must be called from within a `LocalSet`. Never fails: a missing bundle
/// leaves the skeleton in place, missing anchors are counted in the report,
/// and store failures fall back to path detection.
pub fn boot(ctx: &PageContext, env: &PageEnv, doc: SharedDocument) -> BootOutcome {
    let resolution = resolve_with_store(
        &ctx.resolver,
        ctx.store.as_ref(),
        &env.path,
        env.browser_language.as_deref(),
    );
    if let Action::Redirect(target) = &resolution.decision.action {
        ctx.navigator.navigate(target);
        return BootOutcome::Redirected(resolution.decision);
    }

    let locale = resolution.decision.locale;
    let root = doc.borrow().body();
    let report = hydrate_root(ctx, locale, &doc, root);

    let scope = TaskScope::new();
    let switching = Rc::new(Cell::new(false));
    attach_language_switcher(ctx, &env.path, &doc, &scope, &switching);

    let animation = ctx
        .animation
        .clone()
        .with_reduced_motion(ctx.animation.reduced_motion || env.prefers_reduced_motion);
    let orchestrator = Orchestrator::start(doc.clone(), root, &animation);

    BootOutcome::Running(PageSession {
        ctx: ctx.clone(),
        doc,
        decision: resolution.decision,
        report,
        animation,
        scope,
        orchestrator,
        diagrams: None,
        switching,
    })
}

fn hydrate_root(
    ctx: &PageContext,
    locale: Locale,
    doc: &SharedDocument,
    root: NodeId,
) -> HydrationReport {
    let Some(bundle) = ctx.bundle_for(locale) else {
        warn!("Catalog is empty, leaving placeholder content");
        return HydrationReport::default();
    };
    let report = hydrate(bundle, &mut doc.borrow_mut(), root);
    if report.is_complete() {
        info!("Hydrated {} bindings for '{}'", report.applied, locale);
    } else {
        warn!(
            "Hydrated '{}' with gaps: {} applied, missing {:?}, {} unmatched entries, {} untouched nodes",
            locale, report.applied, report.missing_anchors, report.unmatched_entries, report.untouched_nodes
        );
    }
    report
}

/// Wire the language switcher: store the other locale, dim the page, then
/// navigate to its root shortly after.
fn attach_language_switcher(
    ctx: &PageContext,
    current_path: &str,
    doc: &SharedDocument,
    scope: &TaskScope,
    switching: &Rc<Cell<bool>>,
) {
    let mut clicks = {
        let mut d = doc.borrow_mut();
        let Some(switcher) = d.query_selector(d.body(), anchors::LANGUAGE_SWITCHER) else {
            warn!("Language switcher not found");
            return;
        };
        let (listener, clicks) = d.add_click_listener(switcher);
        scope.register(Registration::Listener(listener), &mut d);
        clicks
    };

    let (target, target_path) = switch_target(current_path);
    let store = ctx.store.clone();
    let navigator = ctx.navigator.clone();
    let doc = doc.clone();
    let task_scope = scope.clone();
    let switching = switching.clone();
    scope.spawn(async move {
        while clicks.next().await.is_some() {
            if switching.replace(true) {
                continue;
            }
            if let Err(e) = store.set(target) {
                warn!("Failed to persist locale '{}' before switching: {}", target, e);
            }
            {
                let mut d = doc.borrow_mut();
                let body = d.body();
                d.set_style(body, "opacity", SWITCH_DIM_OPACITY);
            }
            info!("Switching language to '{}'", target);

            let navigator = navigator.clone();
            task_scope.after(SWITCH_NAVIGATION_DELAY, move || {
                navigator.navigate(target_path);
            });
        }
    });
}

/// A loaded page and everything running on it.
pub struct PageSession {
    ctx: PageContext,
    doc: SharedDocument,
    decision: RedirectDecision,
    report: HydrationReport,
    animation: AnimationConfig,
    scope: TaskScope,
    orchestrator: Orchestrator,
    diagrams: Option<DiagramAdapter>,
    switching: Rc<Cell<bool>>,
}

impl PageSession {
    pub fn decision(&self) -> &RedirectDecision {
        &self.decision
    }

    pub fn locale(&self) -> Locale {
        self.decision.locale
    }

    /// Report from the most recent hydration pass.
    pub fn report(&self) -> &HydrationReport {
        &self.report
    }

    pub fn document(&self) -> SharedDocument {
        self.doc.clone()
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Whether a language switch has been triggered.
    pub fn is_switching(&self) -> bool {
        self.switching.get()
    }

    /// Start rendering diagrams with `renderer`. Replaces any earlier adapter.
    pub fn attach_diagrams(&mut self, renderer: Rc<dyn DiagramRenderer>) {
        if let Some(previous) = self.diagrams.take() {
            previous.detach();
        }
        let body = self.doc.borrow().body();
        let adapter = DiagramAdapter::new(self.doc.clone(), renderer, body);
        adapter.attach();
        self.diagrams = Some(adapter);
    }

    /// The host swapped the content root for `new_root`.
    ///
    /// Revokes everything the previous animations registered, hydrates the
    /// new root and starts fresh animations over it.
    pub fn replace_content(&mut self, new_root: NodeId) -> &HydrationReport {
        self.orchestrator.teardown();
        self.report = hydrate_root(&self.ctx, self.decision.locale, &self.doc, new_root);
        self.orchestrator = Orchestrator::start(self.doc.clone(), new_root, &self.animation);
        &self.report
    }

    /// Registrations still live across the session.
    pub fn outstanding(&self) -> usize {
        self.scope.outstanding() + self.orchestrator.outstanding()
    }

    pub fn is_torn_down(&self) -> bool {
        self.scope.is_revoked() && self.orchestrator.is_torn_down()
    }

    /// Stop everything this session started. Returns how many registrations
    /// were still live.
    pub fn teardown(&self) -> usize {
        let mut revoked = self.orchestrator.teardown();
        if let Some(diagrams) = &self.diagrams {
            revoked += diagrams.detach();
        }
        revoked += self.scope.revoke_all(&mut self.doc.borrow_mut());
        info!("Page session torn down");
        revoked
    }
}

impl Drop for PageSession {
    fn drop(&mut self) {
        if self.scope.is_revoked() {
            return;
        }
        if let Ok(mut doc) = self.doc.try_borrow_mut() {
            self.scope.revoke_all(&mut doc);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::skeleton;
    use crate::store::{DisabledStore, MemoryStore};
    use tokio::task::LocalSet;
    use tokio::time::sleep;

    fn context(store: Rc<dyn LocaleStore>, navigator: &RecordingNavigator) -> PageContext {
        let catalog = TranslationCatalog::builtin().expect("Should load builtin catalog");
        PageContext::new(catalog, store, Rc::new(navigator.clone()))
    }

    fn landing() -> SharedDocument {
        skeleton::landing_page().into_shared()
    }

    fn switcher(doc: &SharedDocument) -> NodeId {
        let d = doc.borrow();
        d.query_selector(d.body(), anchors::LANGUAGE_SWITCHER)
            .expect("Should have switcher")
    }

    // ==================== Boot Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_boot_redirects_before_hydrating() {
        LocalSet::new()
            .run_until(async {
                let navigator = RecordingNavigator::default();
                let store = MemoryStore::new();
                let ctx = context(Rc::new(store.clone()), &navigator);
                let doc = landing();

                let env = PageEnv::new("/").with_browser_language("zh-CN");
                let outcome = boot(&ctx, &env, doc.clone());

                assert!(outcome.decision().is_redirect());
                assert!(outcome.into_session().is_none());
                assert_eq!(navigator.visits(), vec!["/zh/".to_string()]);
                assert_eq!(store.raw().as_deref(), Some("zh"));
                // Untouched skeleton
                assert_eq!(doc.borrow().lang().as_deref(), Some("en"));
                assert_eq!(doc.borrow().click_listener_count(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_boot_hydrates_then_animates() {
        LocalSet::new()
            .run_until(async {
                let navigator = RecordingNavigator::default();
                let ctx = context(Rc::new(MemoryStore::new()), &navigator);
                let doc = landing();

                let session = boot(&ctx, &PageEnv::new("/zh/"), doc.clone())
                    .into_session()
                    .expect("Should be running");

                assert_eq!(session.locale(), Locale::Zh);
                assert!(session.report().applied > 0);
                assert_eq!(doc.borrow().lang().as_deref(), Some("zh"));
                assert!(session.outstanding() > 0);
                assert!(navigator.visits().is_empty());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reduced_motion_from_environment() {
        LocalSet::new()
            .run_until(async {
                let navigator = RecordingNavigator::default();
                let ctx = context(Rc::new(MemoryStore::new()), &navigator);
                let doc = landing();

                let env = PageEnv::new("/").with_reduced_motion(true);
                let session = boot(&ctx, &env, doc.clone())
                    .into_session()
                    .expect("Should be running");

                let d = doc.borrow();
                let title = d.query_selector(d.body(), anchors::HERO_TITLE).expect("Should have title");
                assert!(!d.text_content(title).is_empty());
                // Only the switcher is left running
                assert_eq!(session.orchestrator().outstanding(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_store_still_boots() {
        LocalSet::new()
            .run_until(async {
                let navigator = RecordingNavigator::default();
                let ctx = context(Rc::new(DisabledStore), &navigator);
                let env = PageEnv::new("/").with_browser_language("zh-TW");

                let outcome = boot(&ctx, &env, landing());
                assert!(!outcome.decision().is_redirect());
                assert!(navigator.visits().is_empty());
            })
            .await;
    }

    // ==================== Language Switcher Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_switcher_persists_dims_and_navigates() {
        LocalSet::new()
            .run_until(async {
                let navigator = RecordingNavigator::default();
                let store = MemoryStore::new();
                let ctx = context(Rc::new(store.clone()), &navigator);
                let doc = landing();
                let session = boot(&ctx, &PageEnv::new("/"), doc.clone())
                    .into_session()
                    .expect("Should be running");

                let link = switcher(&doc);
                doc.borrow_mut().dispatch_click(link, 10.0, 10.0);
                sleep(Duration::from_millis(10)).await;

                assert!(session.is_switching());
                assert_eq!(store.raw().as_deref(), Some("zh"));
                {
                    let d = doc.borrow();
                    assert_eq!(d.style(d.body(), "opacity"), Some("0.8"));
                }
                assert!(navigator.visits().is_empty());

                sleep(Duration::from_millis(150)).await;
                assert_eq!(navigator.visits(), vec!["/zh/".to_string()]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_click_navigates_once() {
        LocalSet::new()
            .run_until(async {
                let navigator = RecordingNavigator::default();
                let ctx = context(Rc::new(MemoryStore::new()), &navigator);
                let doc = landing();
                let _session = boot(&ctx, &PageEnv::new("/zh/"), doc.clone());

                let link = switcher(&doc);
                doc.borrow_mut().dispatch_click(link, 0.0, 0.0);
                doc.borrow_mut().dispatch_click(link, 0.0, 0.0);
                sleep(Duration::from_millis(500)).await;

                assert_eq!(navigator.visits(), vec!["/".to_string()]);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_teardown_cancels_pending_switch() {
        LocalSet::new()
            .run_until(async {
                let navigator = RecordingNavigator::default();
                let ctx = context(Rc::new(MemoryStore::new()), &navigator);
                let doc = landing();
                let session = boot(&ctx, &PageEnv::new("/"), doc.clone())
                    .into_session()
                    .expect("Should be running");

                let link = switcher(&doc);
                doc.borrow_mut().dispatch_click(link, 0.0, 0.0);
                sleep(Duration::from_millis(10)).await;
                session.teardown();

                sleep(Duration::from_millis(500)).await;
                assert!(navigator.visits().is_empty());
                assert!(session.is_torn_down());
                assert_eq!(session.outstanding(), 0);
                assert_eq!(doc.borrow().click_listener_count(), 0);
            })
            .await;
    }

    // ==================== Content Replacement Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_replace_content_restarts_animations() {
        LocalSet::new()
            .run_until(async {
                let navigator = RecordingNavigator::default();
                let ctx = context(Rc::new(MemoryStore::new()), &navigator);
                let doc = landing();
                let mut session = boot(&ctx, &PageEnv::new("/"), doc.clone())
                    .into_session()
                    .expect("Should be running");

                let new_root = {
                    let mut d = doc.borrow_mut();
                    let body = d.body();
                    let old = d.query_selector(body, "main").expect("Should have main");
                    d.remove(old);
                    let main = d.append_element(body, "main");
                    let hero = d.append_element(main, "section");
                    d.set_class_name(hero, "hero reveal");
                    let title = d.append_element(hero, "h2");
                    d.set_class_name(title, "typewriter");
                    d.append_element(hero, "p");
                    main
                };

                let report = session.replace_content(new_root).clone();
                assert!(report.applied > 0);
                assert!(!session.orchestrator().is_torn_down());

                sleep(Duration::from_secs(3)).await;
                let d = doc.borrow();
                let title = d.query_selector(new_root, "h2").expect("Should have title");
                assert!(d.has_class(title, "typing-complete"));
            })
            .await;
    }
}
