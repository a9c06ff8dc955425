//! CPU-state frames.
//!
//! Canonical layout, big-endian multi-byte fields:
//!
//! | Offset | Field            | Size |
//! |--------|------------------|------|
//! | 0      | opcode           | 2    |
//! | 2      | pc               | 2    |
//! | 4      | registers[0..16] | 16   |
//! | 20     | i                | 2    |
//! | 22     | stack pointer    | 1    |
//! | 23     | stack[0..16]     | 32   |
//! | 55     | delay            | 1    |
//! | 56     | timer            | 1    |
//!
//! Some emulator builds append the screen size (width at 57, height at 58).
//! That variant is a separate [`StateLayout`] and must be configured; it is
//! never inferred from the buffer length.

use serde::{Serialize, Deserialize};

use super::display::ScreenSize;
use super::error::FrameError;
use super::opcode::OpcodeFields;

/// Number of general purpose registers (V0-VF).
pub const REGISTER_COUNT: usize = 16;
/// Number of call stack slots.
pub const STACK_DEPTH: usize = 16;

const OPCODE: usize = 0;
const PC: usize = 2;
const REGISTERS: usize = 4;
const INDEX: usize = 20;
const STACK_POINTER: usize = 22;
const STACK: usize = 23;
const DELAY: usize = 55;
const TIMER: usize = 56;
const WIDTH: usize = 57;
const HEIGHT: usize = 58;

/// Wire layout revision of the state frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StateLayout {
    /// The 57-byte canonical frame.
    #[default]
    Canonical,
    /// Canonical frame followed by one byte each of screen width and height.
    WithScreenSize,
}

impl StateLayout {
    /// Minimum frame length for this layout. Longer frames are accepted and
    /// the surplus is ignored.
    pub const fn frame_len(self) -> usize {
        match self {
            StateLayout::Canonical => 57,
            StateLayout::WithScreenSize => 59,
        }
    }
}

/// One point-in-time snapshot of the CPU.
///
/// `registers` and `stack` always hold 16 entries. Stack entries at or above
/// `stack_pointer` are stale; use [`CpuState::live_stack`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CpuState {
    /// The instruction at `pc` when the frame was written.
    pub opcode: u16,
    pub pc: u16,
    pub registers: [u8; REGISTER_COUNT],
    /// Index register.
    pub i: u16,
    pub stack_pointer: u8,
    pub stack: [i16; STACK_DEPTH],
    pub delay: u8,
    pub timer: u8,
}

impl CpuState {
    /// Fields of the current opcode, for display.
    pub fn fields(&self) -> OpcodeFields {
        OpcodeFields::decompose(self.opcode)
    }

    /// The active call frames, bottom first.
    pub fn live_stack(&self) -> &[i16] {
        let depth = (self.stack_pointer as usize).min(STACK_DEPTH);
        &self.stack[..depth]
    }
}

/// A decoded state frame: the CPU snapshot plus whatever the layout carries
/// alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateFrame {
    pub state: CpuState,
    /// Present only for [`StateLayout::WithScreenSize`].
    pub screen: Option<ScreenSize>,
}

#[inline]
fn be_u16(frame: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([frame[at], frame[at + 1]])
}

/// Decode a state frame.
///
/// Fails with [`FrameError::TruncatedFrame`] when the buffer is shorter than
/// the layout requires. Trailing bytes past the layout are ignored.
pub fn decode_state(frame: &[u8], layout: StateLayout) -> Result<StateFrame, FrameError> {
    let expected = layout.frame_len();
    if frame.len() < expected {
        return Err(FrameError::TruncatedFrame { expected, actual: frame.len() });
    }

    let mut registers = [0u8; REGISTER_COUNT];
    registers.copy_from_slice(&frame[REGISTERS..REGISTERS + REGISTER_COUNT]);

    let mut stack = [0i16; STACK_DEPTH];
    for (slot, pair) in stack.iter_mut().zip(frame[STACK..DELAY].chunks_exact(2)) {
        *slot = i16::from_be_bytes([pair[0], pair[1]]);
    }

    let state = CpuState {
        opcode: be_u16(frame, OPCODE),
        pc: be_u16(frame, PC),
        registers,
        i: be_u16(frame, INDEX),
        stack_pointer: frame[STACK_POINTER],
        stack,
        delay: frame[DELAY],
        timer: frame[TIMER],
    };

    let screen = match layout {
        StateLayout::Canonical => None,
        StateLayout::WithScreenSize => Some(ScreenSize::new(frame[WIDTH], frame[HEIGHT])?),
    };

    Ok(StateFrame { state, screen })
}

/// Write a state frame in the given layout.
///
/// With [`StateLayout::WithScreenSize`] and no `screen`, zero dimensions are
/// written, which a decoder rejects.
pub fn encode_state(state: &CpuState, screen: Option<ScreenSize>, layout: StateLayout) -> Vec<u8> {
    let mut buf = Vec::with_capacity(layout.frame_len());

    buf.extend_from_slice(&state.opcode.to_be_bytes());
    buf.extend_from_slice(&state.pc.to_be_bytes());
    buf.extend_from_slice(&state.registers);
    buf.extend_from_slice(&state.i.to_be_bytes());
    buf.push(state.stack_pointer);
    for entry in state.stack {
        buf.extend_from_slice(&entry.to_be_bytes());
    }
    buf.push(state.delay);
    buf.push(state.timer);

    if layout == StateLayout::WithScreenSize {
        let (width, height) = screen.map_or((0, 0), |s| (s.width(), s.height()));
        buf.push(width);
        buf.push(height);
    }

    buf
}
