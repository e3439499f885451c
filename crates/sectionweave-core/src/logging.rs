//! Logging targets for sectionweave.
//!
//! sectionweave instruments itself with the `tracing` crate and never installs
//! a subscriber. To see logs, install one in your application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("sectionweave=debug,sectionweave_core::dispatch=trace")
//!     .init();
//! ```
//!
//! Structural changes (provider added/removed, mappings recomputed) log at
//! `debug`, loading transitions at `debug`, per-update remapping at `trace`,
//! and contract violations that were recovered from at `warn` or `error`.

/// Span names used for `#[tracing::instrument]` spans.
pub mod span_names {
    /// Signal emission span.
    pub const SIGNAL: &str = "sectionweave::signal";
    /// Dispatch queue drain span.
    pub const DISPATCH: &str = "sectionweave::dispatch";
    /// Composite update forwarding span.
    pub const FORWARD_UPDATE: &str = "sectionweave::forward_update";
    /// Aggregate content loading span.
    pub const LOAD_CONTENT: &str = "sectionweave::load_content";
}

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core plumbing target.
    pub const CORE: &str = "sectionweave_core";
    /// Signal/slot system target.
    pub const SIGNAL: &str = "sectionweave_core::signal";
    /// Dispatch queue target.
    pub const DISPATCH: &str = "sectionweave_core::dispatch";
    /// Thread affinity checks target.
    pub const THREAD: &str = "sectionweave_core::thread";
    /// Content loading state machine, coordinator and controller.
    pub const LOADING: &str = "sectionweave::loading";
    /// Section mapping target.
    pub const MAPPING: &str = "sectionweave::mapping";
    /// Composition registry and composite provider target.
    pub const COMPOSITION: &str = "sectionweave::composition";
    /// Update remapping and delivery target.
    pub const UPDATE: &str = "sectionweave::update";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_targets_are_prefixed() {
        for target in [targets::SIGNAL, targets::DISPATCH, targets::THREAD] {
            assert!(target.starts_with(targets::CORE));
        }
    }
}
