//! Binary telemetry protocol.
//!
//! Two push-frame formats travel from a running instance to the observer:
//! - the CPU-state frame (fixed length, big-endian fields)
//! - the display frame (packed monochrome bitmap, MSB-first)
//!
//! Both decode into immutable snapshot values.

pub mod opcode;
pub mod state;
pub mod display;
pub mod error;

pub use opcode::OpcodeFields;
pub use state::{CpuState, StateFrame, StateLayout, decode_state, encode_state};
pub use display::{Framebuffer, ScreenSize, decode_display, pack_pixels};
pub use error::FrameError;
