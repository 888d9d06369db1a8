//! Recycling pool of row widgets.
//!
//! Widgets are created on demand through a factory closure and handed out
//! as [`RowKey`]s. Releasing a widget deactivates it and keeps it around for
//! the next [`RowWidgetPool::get`], so a view that re-renders the same
//! number of rows never instantiates new widgets.

use grove_core::logging::targets;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle to a widget currently handed out by a [`RowWidgetPool`].
    ///
    /// Keys are invalidated when the widget is released.
    pub struct RowKey;
}

/// A widget that can be parked in a [`RowWidgetPool`] between uses.
pub trait PooledWidget {
    /// Called when the widget is handed out.
    fn activate(&mut self);

    /// Called when the widget returns to the pool.
    fn deactivate(&mut self);
}

type WidgetFactory<W> = Box<dyn FnMut() -> W + Send>;

/// A pool of reusable widgets.
///
/// # Example
///
/// ```
/// use grove::pool::{PooledWidget, RowWidgetPool};
///
/// #[derive(Default)]
/// struct Row {
///     visible: bool,
/// }
///
/// impl PooledWidget for Row {
///     fn activate(&mut self) {
///         self.visible = true;
///     }
///     fn deactivate(&mut self) {
///         self.visible = false;
///     }
/// }
///
/// let mut pool = RowWidgetPool::new(Row::default);
/// let key = pool.get();
/// assert!(pool.get_mut(key).unwrap().visible);
/// pool.release_all();
/// let _again = pool.get();
/// assert_eq!(pool.created_count(), 1);
/// ```
pub struct RowWidgetPool<W> {
    factory: WidgetFactory<W>,
    active: SlotMap<RowKey, W>,
    idle: Vec<W>,
    max_idle: Option<usize>,
    created: usize,
}

impl<W: PooledWidget> RowWidgetPool<W> {
    /// Creates an empty pool that builds widgets with `factory`.
    pub fn new<F>(factory: F) -> Self
    where
        F: FnMut() -> W + Send + 'static,
    {
        Self {
            factory: Box::new(factory),
            active: SlotMap::with_key(),
            idle: Vec::new(),
            max_idle: None,
            created: 0,
        }
    }

    /// Caps the number of parked widgets; extra released widgets are dropped.
    pub fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.max_idle = Some(max_idle);
        self.trim_idle();
        self
    }

    /// Creates widgets up front until `count` are parked.
    pub fn prewarm(&mut self, count: usize) {
        let target = self.max_idle.map_or(count, |max| count.min(max));
        while self.idle.len() < target {
            let mut widget = self.create();
            widget.deactivate();
            self.idle.push(widget);
        }
    }

    /// Hands out a widget, reusing a parked one when possible.
    pub fn get(&mut self) -> RowKey {
        let mut widget = match self.idle.pop() {
            Some(widget) => widget,
            None => self.create(),
        };
        widget.activate();
        self.active.insert(widget)
    }

    /// Returns the active widget for `key`.
    pub fn get_ref(&self, key: RowKey) -> Option<&W> {
        self.active.get(key)
    }

    /// Returns the active widget for `key` mutably.
    pub fn get_mut(&mut self, key: RowKey) -> Option<&mut W> {
        self.active.get_mut(key)
    }

    /// Deactivates the widget for `key` and parks it.
    ///
    /// Returns `false` if `key` is not active.
    pub fn release(&mut self, key: RowKey) -> bool {
        match self.active.remove(key) {
            Some(widget) => {
                self.park(widget);
                true
            }
            None => false,
        }
    }

    /// Deactivates and parks every active widget.
    pub fn release_all(&mut self) {
        let released: Vec<W> = self.active.drain().map(|(_, widget)| widget).collect();
        tracing::trace!(target: targets::POOL, count = released.len(), "releasing all rows");
        for widget in released {
            self.park(widget);
        }
    }

    /// Iterates over the active widgets.
    pub fn active(&self) -> impl Iterator<Item = (RowKey, &W)> {
        self.active.iter()
    }

    /// Number of widgets currently handed out.
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of parked widgets.
    pub fn idle_count(&self) -> usize {
        self.idle.len()
    }

    /// Number of widgets the factory has built so far.
    pub fn created_count(&self) -> usize {
        self.created
    }

    fn create(&mut self) -> W {
        self.created += 1;
        tracing::trace!(target: targets::POOL, created = self.created, "instantiating row widget");
        (self.factory)()
    }

    fn park(&mut self, mut widget: W) {
        widget.deactivate();
        if self.max_idle.is_some_and(|max| self.idle.len() >= max) {
            return;
        }
        self.idle.push(widget);
    }

    fn trim_idle(&mut self) {
        if let Some(max) = self.max_idle {
            self.idle.truncate(max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default)]
    struct TestRow {
        active: bool,
        activations: usize,
    }

    impl PooledWidget for TestRow {
        fn activate(&mut self) {
            self.active = true;
            self.activations += 1;
        }

        fn deactivate(&mut self) {
            self.active = false;
        }
    }

    #[test]
    fn test_get_creates_on_demand() {
        let mut pool = RowWidgetPool::new(TestRow::default);
        let a = pool.get();
        let b = pool.get();
        assert_ne!(a, b);
        assert_eq!(pool.created_count(), 2);
        assert_eq!(pool.active_count(), 2);
        assert!(pool.get_ref(a).unwrap().active);
    }

    #[test]
    fn test_release_recycles() {
        let mut pool = RowWidgetPool::new(TestRow::default);
        let key = pool.get();
        assert!(pool.release(key));
        assert!(!pool.release(key));
        assert!(pool.get_ref(key).is_none());
        assert_eq!(pool.idle_count(), 1);

        let again = pool.get();
        assert_eq!(pool.created_count(), 1);
        assert_eq!(pool.get_ref(again).unwrap().activations, 2);
    }

    #[test]
    fn test_release_all() {
        let mut pool = RowWidgetPool::new(TestRow::default);
        for _ in 0..5 {
            pool.get();
        }
        pool.release_all();
        assert_eq!(pool.active_count(), 0);
        assert_eq!(pool.idle_count(), 5);

        for _ in 0..3 {
            pool.get();
        }
        assert_eq!(pool.created_count(), 5);
        assert!(pool.active().all(|(_, row)| row.active));
    }

    #[test]
    fn test_max_idle_and_prewarm() {
        let mut pool = RowWidgetPool::new(TestRow::default).with_max_idle(2);
        pool.prewarm(4);
        assert_eq!(pool.idle_count(), 2);
        assert_eq!(pool.created_count(), 2);

        let keys: Vec<RowKey> = (0..4).map(|_| pool.get()).collect();
        assert_eq!(pool.created_count(), 4);
        for key in keys {
            pool.release(key);
        }
        assert_eq!(pool.idle_count(), 2);
    }
}
