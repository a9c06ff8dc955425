//! # xip8 observer
//!
//! Telemetry decoder and control client for a running CHIP-8 instance.
//!
//! The instance pushes two kinds of binary frames: CPU-state frames and
//! packed display frames. This crate decodes them into immutable snapshots,
//! keeps the latest of each, and sends the start/stop/step/reset commands
//! back over HTTP. Frame transport is up to the caller.

pub mod protocol;
pub mod store;
pub mod channel;
pub mod command;
pub mod config;
pub mod observer;

#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use protocol::{CpuState, Framebuffer, FrameError, OpcodeFields, ScreenSize, StateLayout};
pub use store::{SnapshotEvent, SnapshotStore};
pub use channel::{ChannelError, ChannelKind, Delivery, TelemetryChannel};
pub use command::{Ack, Command, CommandClient, CommandTransport, CommandTransportError, HttpTransport};
pub use config::{ConfigError, ObserverConfig};
pub use observer::Observer;
