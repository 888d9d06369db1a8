//! Change notification through signals and slots.
//!
//! A [`Signal`] is a broadcast point owned by the object whose state
//! changes: the tree model announces structural edits on one, the view
//! controller announces selection and expand-state changes on others.
//! Observers attach closures ("slots") and get a reference to the payload of
//! every emission, in the order they connected.
//!
//! Slots run on the emitting thread, after the signal has copied out its
//! connection table. A slot may therefore connect or disconnect slots on the
//! very signal that is calling it; the change applies from the next emission.
//!
//! ```
//! use grove_core::Signal;
//!
//! let row_selected = Signal::<Option<i32>>::new();
//!
//! let logger = row_selected.connect(|row| match row {
//!     Some(id) => println!("selected element {id}"),
//!     None => println!("selection cleared"),
//! });
//!
//! row_selected.emit(Some(7));
//! row_selected.emit(None);
//! row_selected.disconnect(logger);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use slotmap::{SlotMap, new_key_type};

use crate::logging::targets;

new_key_type! {
    /// Handle to one connected slot, returned by [`Signal::connect`].
    pub struct ConnectionId;
}

type Slot<Args> = Arc<dyn Fn(&Args) + Send + Sync>;

/// A broadcast point that calls every connected slot with a shared payload.
///
/// `Args` is the payload type. Signals that carry several values use a
/// tuple, such as `(ElementId, bool)`.
///
/// `Signal` is `Send + Sync` whatever the payload, since slots only ever see
/// `&Args` on the thread that emits.
pub struct Signal<Args> {
    connections: Mutex<SlotMap<ConnectionId, Slot<Args>>>,
    blocked: AtomicBool,
}

impl<Args: Send + 'static> Default for Signal<Args> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Args> std::fmt::Debug for Signal<Args> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Signal")
            .field("connections", &self.connections.lock().len())
            .field("blocked", &self.blocked.load(Ordering::Relaxed))
            .finish()
    }
}

impl<Args: Send + 'static> Signal<Args> {
    /// Creates a signal without slots.
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(SlotMap::with_key()),
            blocked: AtomicBool::new(false),
        }
    }

    /// Attaches `slot` and returns the handle that detaches it again.
    pub fn connect<F>(&self, slot: F) -> ConnectionId
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        let id = self.connections.lock().insert(Arc::new(slot));
        tracing::trace!(target: targets::SIGNAL, ?id, "slot connected");
        id
    }

    /// Attaches `slot` for as long as the returned guard lives.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use std::sync::atomic::{AtomicUsize, Ordering};
    /// use grove_core::Signal;
    ///
    /// let rows_changed = Signal::<usize>::new();
    /// let rendered = Arc::new(AtomicUsize::new(0));
    ///
    /// let sink = rendered.clone();
    /// let guard = rows_changed.connect_scoped(move |&rows| {
    ///     sink.store(rows, Ordering::Relaxed);
    /// });
    /// rows_changed.emit(12);
    /// drop(guard);
    /// rows_changed.emit(3);
    ///
    /// assert_eq!(rendered.load(Ordering::Relaxed), 12);
    /// ```
    pub fn connect_scoped<F>(&self, slot: F) -> ConnectionGuard<'_, Args>
    where
        F: Fn(&Args) + Send + Sync + 'static,
    {
        ConnectionGuard {
            id: self.connect(slot),
            signal: self,
        }
    }

    /// Detaches the slot behind `id`.
    ///
    /// Returns `false` if it was already detached.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.connections.lock().remove(id).is_some()
    }

    /// Detaches every slot.
    pub fn disconnect_all(&self) {
        self.connections.lock().clear();
    }

    /// Number of attached slots.
    pub fn connection_count(&self) -> usize {
        self.connections.lock().len()
    }

    /// Suppresses emissions until unblocked. Emissions made meanwhile are lost.
    pub fn set_blocked(&self, blocked: bool) {
        self.blocked.store(blocked, Ordering::Release);
    }

    /// Returns `true` while emissions are suppressed.
    pub fn is_blocked(&self) -> bool {
        self.blocked.load(Ordering::Acquire)
    }

    /// Calls every attached slot with `args`, oldest connection first.
    #[tracing::instrument(skip_all, target = "grove_core::signal", level = "trace")]
    pub fn emit(&self, args: Args) {
        if self.is_blocked() {
            tracing::trace!(target: targets::SIGNAL, "emission suppressed");
            return;
        }

        let slots: Vec<Slot<Args>> = self.connections.lock().values().cloned().collect();
        tracing::trace!(target: targets::SIGNAL, slots = slots.len(), "emitting");
        for slot in &slots {
            slot(&args);
        }
    }
}

static_assertions::assert_impl_all!(Signal<()>: Send, Sync);
static_assertions::assert_impl_all!(Signal<Vec<i32>>: Send, Sync);

/// Keeps a slot attached until dropped. See [`Signal::connect_scoped`].
pub struct ConnectionGuard<'a, Args: Send + 'static> {
    signal: &'a Signal<Args>,
    id: ConnectionId,
}

impl<Args: Send + 'static> ConnectionGuard<'_, Args> {
    /// Handle of the guarded slot.
    pub fn id(&self) -> ConnectionId {
        self.id
    }
}

impl<Args: Send + 'static> Drop for ConnectionGuard<'_, Args> {
    fn drop(&mut self) {
        self.signal.disconnect(self.id);
    }
}
