//! Pattern engine for a UDP-controlled RGB LED fixture.
//!
//! Datagrams are decoded into [`Command`]s and handed to a [`Supervisor`],
//! which keeps exactly one behavior on the outputs at a time:
//! - a static color, written directly, or
//! - one running pattern (strobe, fade, breathe) on its own task.
//!
//! ## Modules
//! - [`color`]: hex colors, interpolation and gradients
//! - [`command`]: the wire protocol decoder
//! - [`pwm`]: the three-channel output abstraction and its implementations
//! - [`pattern`]: pattern executors and cancellable pattern tasks
//! - [`supervisor`]: preemption of the running pattern
//! - [`server`]: the UDP receive loop
//! - [`config`]: command line and environment settings

pub mod color;
pub mod command;
pub mod config;
pub mod pattern;
pub mod pwm;
pub mod server;
pub mod supervisor;

pub use color::{Color, Rgb};
pub use command::{Command, DecodeError, Pattern, PatternKind, decode};
pub use config::{Config, PinConfig};
pub use pwm::{Channel, PwmSink, RecordingSink};
pub use supervisor::{Supervisor, SupervisorError};

#[cfg(feature = "hardware")]
pub use pwm::GpioPwm;
