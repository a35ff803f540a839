//! Single-owner async runtime around one [`crate::view::TableView`].

/// Runtime tuning knobs.
pub mod config;
/// Cancellable trailing-edge debounce timer.
pub mod debounce;
/// Event stream types emitted by the runtime.
pub mod events;
/// Handle and command loop implementation.
pub mod handle;
