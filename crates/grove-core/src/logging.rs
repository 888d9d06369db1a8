//! Tracing targets and timing spans shared by the Grove crates.
//!
//! Nothing is printed unless the application installs a `tracing`
//! subscriber, e.g. `tracing_subscriber::fmt::init()` at startup.
//!
//! Structural edits on the tree model are logged at `debug`, view rebuilds
//! and signal emission at `trace`. Filter by subsystem with the constants in
//! [`targets`], for example `RUST_LOG=grove::model=debug,grove::view=trace`.

/// `target:` values used by every Grove log event.
pub mod targets {
    /// Signal emission and connection bookkeeping.
    pub const SIGNAL: &str = "grove_core::signal";
    /// Tree model mutations.
    pub const MODEL: &str = "grove::model";
    /// View controller rebuilds, expand state and selection.
    pub const VIEW: &str = "grove::view";
    /// Row widget pool.
    pub const POOL: &str = "grove::pool";
    /// Timing spans opened by [`PerfSpan`](super::PerfSpan).
    pub const PERF: &str = "grove::perf";
}

/// Times an operation: the span stays entered until the guard is dropped.
///
/// ```
/// use grove_core::PerfSpan;
///
/// fn rebuild_rows() {
///     let _timing = PerfSpan::new("rebuild_rows");
///     // ... work measured by the span ...
/// }
/// rebuild_rows();
/// ```
#[derive(Debug)]
pub struct PerfSpan {
    _entered: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Opens and enters a span on the [`targets::PERF`] target.
    pub fn new(operation: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation);
        Self {
            _entered: span.entered(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_perf_span_without_subscriber() {
        let outer = PerfSpan::new("rebuild");
        let inner = PerfSpan::new("project_rows");
        drop(inner);
        drop(outer);
    }

    #[test]
    fn test_targets_are_namespaced() {
        assert!(targets::SIGNAL.starts_with("grove_core::"));
        for target in [targets::MODEL, targets::VIEW, targets::POOL, targets::PERF] {
            assert!(target.starts_with("grove::"), "{target}");
        }
    }
}
