//! Foundation shared by the Grove tree model and view controller.
//!
//! - [`signal`]: [`Signal`], the observer mechanism behind model change
//!   notifications and view selection/expand notifications.
//! - [`logging`]: `tracing` target names and [`PerfSpan`].
//!
//! ```
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use grove_core::Signal;
//!
//! let expanded = Signal::<(i32, bool)>::new();
//! let seen = Arc::new(Mutex::new(Vec::new()));
//!
//! let sink = seen.clone();
//! expanded.connect(move |&(id, open)| sink.lock().push((id, open)));
//! expanded.emit((4, true));
//!
//! assert_eq!(*seen.lock(), vec![(4, true)]);
//! ```

pub mod logging;
pub mod signal;

pub use logging::PerfSpan;
pub use signal::{ConnectionGuard, ConnectionId, Signal};
