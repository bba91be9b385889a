// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Per-node listener sets.
//!
//! Subsystems attach behavior to a node by registering an [`EventListener`].
//! A listener is identified by the address of its shared allocation, so the
//! same `Arc` must be passed to `remove` that was passed to `add`.
//!
//! The set's lock is only held while copying the current listeners into a
//! snapshot. Listeners run outside of it, which makes it safe for a listener
//! to add or remove listeners on the very node that is invoking it; such a
//! change is applied immediately to the set but only becomes visible to the
//! next dispatch.

use crate::frame::FrameContext;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// A callback attached to a pipeline node.
pub type EventListener = Arc<dyn Fn(&FrameContext) -> anyhow::Result<()> + Send + Sync>;

/// Wraps a closure into an [`EventListener`].
pub fn listener<F>(f: F) -> EventListener
where
    F: Fn(&FrameContext) -> anyhow::Result<()> + Send + Sync + 'static,
{
    Arc::new(f)
}

fn identity(listener: &EventListener) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

/// How a [`ListenerSet::dispatch`] ended when no listener failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Every listener of the snapshot ran.
    Completed,
    /// The cancellation signal was raised before every listener had run.
    Cancelled,
}

/// Thread-safe set of listeners owned by one node.
#[derive(Default)]
pub struct ListenerSet {
    entries: RwLock<HashMap<usize, EventListener>>,
    dispatching: AtomicUsize,
}

impl ListenerSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Returns `false` if it was already registered.
    pub fn add(&self, listener: &EventListener) -> bool {
        self.note_reentrant("add");
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries
            .insert(identity(listener), Arc::clone(listener))
            .is_none()
    }

    /// Unregisters a listener. Returns `false` if it was not registered.
    pub fn remove(&self, listener: &EventListener) -> bool {
        self.note_reentrant("remove");
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(&identity(listener)).is_some()
    }

    /// Unregisters every listener.
    pub fn clear(&self) {
        self.note_reentrant("clear");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns `true` if `listener` is registered.
    pub fn contains(&self, listener: &EventListener) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(&identity(listener))
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` while at least one dispatch of this set is running.
    pub fn is_dispatching(&self) -> bool {
        self.dispatching.load(Ordering::Acquire) > 0
    }

    /// Copies the current listeners.
    pub fn snapshot(&self) -> Vec<EventListener> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }

    /// Invokes every listener of the current snapshot, stopping at the first
    /// error or as soon as `frame` observes cancellation.
    pub fn dispatch(&self, frame: &FrameContext) -> anyhow::Result<DispatchOutcome> {
        let snapshot = self.snapshot();
        if snapshot.is_empty() {
            return Ok(DispatchOutcome::Completed);
        }

        let _guard = DispatchGuard::enter(&self.dispatching);
        for listener in &snapshot {
            if frame.is_cancelled() {
                return Ok(DispatchOutcome::Cancelled);
            }
            listener(frame)?;
        }
        Ok(DispatchOutcome::Completed)
    }

    fn note_reentrant(&self, operation: &str) {
        if self.is_dispatching() {
            log::trace!("Listener {operation} during dispatch; applies from the next invocation.");
        }
    }
}

impl fmt::Debug for ListenerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerSet")
            .field("listeners", &self.len())
            .field("dispatching", &self.is_dispatching())
            .finish()
    }
}

struct DispatchGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> DispatchGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self { counter }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancellationSource;
    use crate::variable::VariableStore;
    use std::sync::atomic::AtomicU32;
    use std::sync::Mutex;

    fn frame() -> FrameContext {
        frame_observing(&CancellationSource::new())
    }

    fn frame_observing(cancellation: &CancellationSource) -> FrameContext {
        FrameContext::new(
            0,
            0.0,
            Arc::new(VariableStore::new()),
            cancellation.token(),
        )
    }

    #[test]
    fn test_add_is_keyed_by_allocation() {
        let set = ListenerSet::new();
        let a = listener(|_| Ok(()));
        let b = listener(|_| Ok(()));

        assert!(set.add(&a));
        assert!(!set.add(&a), "same Arc must not register twice");
        assert!(set.add(&b));
        assert_eq!(set.len(), 2);

        assert!(set.remove(&a));
        assert!(!set.remove(&a));
        assert!(set.contains(&b));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_dispatch_stops_at_first_error() {
        let set = ListenerSet::new();
        set.add(&listener(|_| Err(anyhow::anyhow!("boom"))));

        let err = set.dispatch(&frame()).unwrap_err();
        assert_eq!(err.to_string(), "boom");
        assert!(!set.is_dispatching());
    }

    #[test]
    fn test_listener_added_during_dispatch_runs_next_time() {
        let set = Arc::new(ListenerSet::new());
        let late_calls = Arc::new(AtomicU32::new(0));
        let late = {
            let late_calls = Arc::clone(&late_calls);
            listener(move |_| {
                late_calls.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        };

        let pending = Arc::new(Mutex::new(Some(late)));
        let registering = {
            let set = Arc::clone(&set);
            let pending = Arc::clone(&pending);
            listener(move |_| {
                assert!(set.is_dispatching());
                if let Some(late) = pending.lock().unwrap().take() {
                    set.add(&late);
                }
                Ok(())
            })
        };
        set.add(&registering);

        assert_eq!(set.dispatch(&frame()).unwrap(), DispatchOutcome::Completed);
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        assert_eq!(set.len(), 2);

        set.dispatch(&frame()).unwrap();
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_during_dispatch_finishes_current_snapshot() {
        let set = Arc::new(ListenerSet::new());
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..3 {
            let set_ref = Arc::clone(&set);
            let calls = Arc::clone(&calls);
            set.add(&listener(move |_| {
                calls.fetch_add(1, Ordering::SeqCst);
                set_ref.clear();
                Ok(())
            }));
        }

        set.dispatch(&frame()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(set.is_empty());
    }

    #[test]
    fn test_dispatch_stops_once_a_listener_cancels() {
        let set = ListenerSet::new();
        let calls = Arc::new(AtomicU32::new(0));
        for _ in 0..8 {
            let calls = Arc::clone(&calls);
            set.add(&listener(move |frame| {
                calls.fetch_add(1, Ordering::SeqCst);
                frame.cancellation().cancel();
                Ok(())
            }));
        }

        let cancellation = CancellationSource::new();
        let outcome = set.dispatch(&frame_observing(&cancellation)).unwrap();

        assert_eq!(outcome, DispatchOutcome::Cancelled);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!set.is_dispatching());
    }
}
