//! `focus-window` subcommand stub.
//!
//! Bringing a terminal window to the foreground is inherently platform-
//! specific window-manager plumbing, explicitly out of scope. The
//! subcommand still exists so a caller wiring up `click_to_focus` gets a
//! defined, zero-exit-code no-op rather than an unknown-command error.

pub fn run() {
    tracing::warn!("focus-window has no platform backend wired in; no-op");
}
