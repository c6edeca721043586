//! Interactive console shared by firmware and emulator front-ends.
//!
//! [`grammar`] parses a line into a [`grammar::Command`], [`commands`] applies
//! it to a tuning orchestrator, and [`status`] renders results as text.

pub mod commands;
pub mod grammar;
pub mod status;
