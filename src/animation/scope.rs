//! Revocable registrations for timers, observers and listeners.
//!
//! Every piece of deferred work the orchestrator creates is recorded here.
//! Revoking the scope aborts every pending task and disconnects every
//! observer, so no callback can run against a document that has been torn
//! down or replaced. Once revoked, a scope refuses new work.

use crate::dom::{Document, ListenerId, ObserverId};
use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::debug;

/// Something the orchestrator must release on teardown.
#[derive(Debug)]
pub enum Registration {
    /// A spawned local task (timer, interval or event loop)
    Task(AbortHandle),
    Intersection(ObserverId),
    Mutation(ObserverId),
    Listener(ListenerId),
}

impl Registration {
    fn is_live(&self) -> bool {
        match self {
            Registration::Task(handle) => !handle.is_finished(),
            _ => true,
        }
    }

    fn release(self, doc: &mut Document) {
        match self {
            Registration::Task(handle) => handle.abort(),
            Registration::Intersection(id) => {
                doc.disconnect_intersection(id);
            }
            Registration::Mutation(id) => {
                doc.disconnect_mutations(id);
            }
            Registration::Listener(id) => {
                doc.remove_click_listener(id);
            }
        }
    }
}

#[derive(Debug, Default)]
struct ScopeState {
    registrations: Vec<Registration>,
    revoked: bool,
}

/// Shared owner of a page session's registrations.
///
/// Clones refer to the same scope, so tasks can schedule follow-up work
/// through the scope that spawned them.
#[derive(Debug, Clone, Default)]
pub struct TaskScope {
    state: Rc<RefCell<ScopeState>>,
}

impl TaskScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a local task owned by this scope.
    ///
    /// Must be called from within a `LocalSet`. Returns `false` (and drops the
    /// future) when the scope has been revoked.
    pub fn spawn<F>(&self, future: F) -> bool
    where
        F: Future<Output = ()> + 'static,
    {
        if self.is_revoked() {
            return false;
        }
        let handle = tokio::task::spawn_local(future);
        self.push(Registration::Task(handle.abort_handle()));
        true
    }

    /// Run `callback` once after `delay`.
    pub fn after<F>(&self, delay: Duration, callback: F) -> bool
    where
        F: FnOnce() + 'static,
    {
        self.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        })
    }

    /// Record an observer or listener registration.
    ///
    /// On a revoked scope the registration is released immediately.
    pub fn register(&self, registration: Registration, doc: &mut Document) {
        if self.is_revoked() {
            registration.release(doc);
            return;
        }
        self.push(registration);
    }

    fn push(&self, registration: Registration) {
        let mut state = self.state.borrow_mut();
        state.registrations.retain(Registration::is_live);
        state.registrations.push(registration);
    }

    /// Release every registration and refuse further work.
    ///
    /// Returns the number of registrations that were still live.
    pub fn revoke_all(&self, doc: &mut Document) -> usize {
        let registrations = {
            let mut state = self.state.borrow_mut();
            state.revoked = true;
            std::mem::take(&mut state.registrations)
        };
        let live: Vec<Registration> = registrations
            .into_iter()
            .filter(Registration::is_live)
            .collect();
        let count = live.len();
        for registration in live {
            registration.release(doc);
        }
        debug!("Revoked {} registrations", count);
        count
    }

    pub fn is_revoked(&self) -> bool {
        self.state.borrow().revoked
    }

    /// Registrations that have not completed or been released.
    pub fn outstanding(&self) -> usize {
        let mut state = self.state.borrow_mut();
        state.registrations.retain(Registration::is_live);
        state.registrations.len()
    }

    #[cfg(test)]
    pub(crate) fn pending_tasks(&self) -> usize {
        self.state
            .borrow()
            .registrations
            .iter()
            .filter(|r| matches!(r, Registration::Task(_)) && r.is_live())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::task::LocalSet;

    // ==================== Timer Tests ====================

    #[tokio::test(start_paused = true)]
    async fn test_after_runs_callback() {
        LocalSet::new()
            .run_until(async {
                let scope = TaskScope::new();
                let fired = Rc::new(Cell::new(false));
                let flag = fired.clone();
                assert!(scope.after(Duration::from_millis(100), move || flag.set(true)));

                tokio::time::sleep(Duration::from_millis(150)).await;
                assert!(fired.get());
                assert_eq!(scope.outstanding(), 0);
                assert_eq!(scope.pending_tasks(), 0);
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoke_cancels_pending_timer() {
        LocalSet::new()
            .run_until(async {
                let scope = TaskScope::new();
                let mut doc = Document::new();
                let fired = Rc::new(Cell::new(false));
                let flag = fired.clone();
                scope.after(Duration::from_millis(100), move || flag.set(true));
                assert_eq!(scope.outstanding(), 1);

                assert_eq!(scope.revoke_all(&mut doc), 1);
                tokio::time::sleep(Duration::from_millis(500)).await;
                assert!(!fired.get());
            })
            .await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_revoked_scope_refuses_work() {
        LocalSet::new()
            .run_until(async {
                let scope = TaskScope::new();
                let mut doc = Document::new();
                scope.revoke_all(&mut doc);

                assert!(scope.is_revoked());
                assert!(!scope.after(Duration::ZERO, || {}));
                assert_eq!(scope.outstanding(), 0);
            })
            .await;
    }

    // ==================== Observer Tests ====================

    #[test]
    fn test_revoke_disconnects_observers_and_listeners() {
        let scope = TaskScope::new();
        let mut doc = Document::new();
        let body = doc.body();
        let (mutation, _rx) = doc.observe_mutations(body);
        let (listener, _clicks) = doc.add_click_listener(body);
        scope.register(Registration::Mutation(mutation), &mut doc);
        scope.register(Registration::Listener(listener), &mut doc);

        assert_eq!(scope.outstanding(), 2);
        assert_eq!(scope.revoke_all(&mut doc), 2);
        assert_eq!(doc.mutation_observer_count(), 0);
        assert_eq!(doc.click_listener_count(), 0);
    }

    #[test]
    fn test_register_on_revoked_scope_releases_immediately() {
        let scope = TaskScope::new();
        let mut doc = Document::new();
        scope.revoke_all(&mut doc);

        let body = doc.body();
        let (listener, _clicks) = doc.add_click_listener(body);
        scope.register(Registration::Listener(listener), &mut doc);
        assert_eq!(doc.click_listener_count(), 0);
    }

    #[test]
    fn test_clones_share_state() {
        let scope = TaskScope::new();
        let clone = scope.clone();
        let mut doc = Document::new();
        clone.revoke_all(&mut doc);
        assert!(scope.is_revoked());
    }
}
