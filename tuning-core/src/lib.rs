#![no_std]

// Delay-line tuning engine shared by board bring-up code and host tooling.
//
// The crate never touches registers directly. Everything the sweep needs from
// the controller goes through the `host::TuningHost` trait, so the same engine
// runs against silicon, the synthetic host, and the test doubles.

#[macro_use]
mod log;

pub mod config;
pub mod console;
pub mod delay;
pub mod host;
pub mod issuer;
pub mod orchestrator;
pub mod pattern;
pub mod scanner;
pub mod selector;
pub mod telemetry;
pub mod window;

pub use config::TuningConfig;
pub use delay::{DelayCode, DelayLine};
pub use host::{BusMode, TransferError, TuningHost};
pub use orchestrator::{TuningError, TuningOrchestrator, TuningOutcome, TuningReport};
pub use pattern::BusWidth;
pub use window::{Window, WindowType};
