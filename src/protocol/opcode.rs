//! Instruction field decomposition.
//!
//! A CHIP-8 opcode is 16 bits wide and splits into nibble slices:
//! - `op`: bits 12-15, the instruction class
//! - `x`: bits 8-11
//! - `y`: bits 4-7
//! - `n`: bits 0-3
//!
//! `nnn` (bits 0-11) and `kk` (bits 0-7) are alternate readings of the
//! same low bits, not separate storage.

use serde::{Serialize, Deserialize};

/// The derived fields of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OpcodeFields {
    /// The raw 16-bit value.
    pub raw: u16,
    /// Instruction class nibble.
    pub op: u8,
    pub x: u8,
    pub y: u8,
    pub n: u8,
    /// 12-bit address/immediate.
    pub nnn: u16,
    /// 8-bit immediate.
    pub kk: u8,
}

impl OpcodeFields {
    /// Split an opcode into its fields.
    #[inline]
    pub const fn decompose(raw: u16) -> Self {
        Self {
            raw,
            op: ((raw & 0xF000) >> 12) as u8,
            x: ((raw & 0x0F00) >> 8) as u8,
            y: ((raw & 0x00F0) >> 4) as u8,
            n: (raw & 0x000F) as u8,
            nnn: raw & 0x0FFF,
            kk: (raw & 0x00FF) as u8,
        }
    }

    /// The class bits left in place (`raw & 0xF000`), the form a debugger
    /// shows next to the raw opcode.
    #[inline]
    pub const fn op_bits(&self) -> u16 {
        (self.op as u16) << 12
    }

    /// Render the opcode as a mnemonic, e.g. `DRW V1, V2, 3`.
    pub fn mnemonic(&self) -> String {
        let (x, y, n, nnn, kk) = (self.x, self.y, self.n, self.nnn, self.kk);
        match (self.op, x, y, n) {
            (0x0, 0x0, 0xE, 0x0) => "CLS".to_string(),
            (0x0, 0x0, 0xE, 0xE) => "RET".to_string(),
            (0x0, _, _, _) => format!("SYS {:#05X}", nnn),
            (0x1, _, _, _) => format!("JP {:#05X}", nnn),
            (0x2, _, _, _) => format!("CALL {:#05X}", nnn),
            (0x3, _, _, _) => format!("SE V{:X}, {:#04X}", x, kk),
            (0x4, _, _, _) => format!("SNE V{:X}, {:#04X}", x, kk),
            (0x5, _, _, 0x0) => format!("SE V{:X}, V{:X}", x, y),
            (0x6, _, _, _) => format!("LD V{:X}, {:#04X}", x, kk),
            (0x7, _, _, _) => format!("ADD V{:X}, {:#04X}", x, kk),
            (0x8, _, _, 0x0) => format!("LD V{:X}, V{:X}", x, y),
            (0x8, _, _, 0x1) => format!("OR V{:X}, V{:X}", x, y),
            (0x8, _, _, 0x2) => format!("AND V{:X}, V{:X}", x, y),
            (0x8, _, _, 0x3) => format!("XOR V{:X}, V{:X}", x, y),
            (0x8, _, _, 0x4) => format!("ADD V{:X}, V{:X}", x, y),
            (0x8, _, _, 0x5) => format!("SUB V{:X}, V{:X}", x, y),
            (0x8, _, _, 0x6) => format!("SHR V{:X}", x),
            (0x8, _, _, 0x7) => format!("SUBN V{:X}, V{:X}", x, y),
            (0x8, _, _, 0xE) => format!("SHL V{:X}", x),
            (0x9, _, _, 0x0) => format!("SNE V{:X}, V{:X}", x, y),
            (0xA, _, _, _) => format!("LD I, {:#05X}", nnn),
            (0xB, _, _, _) => format!("JP V0, {:#05X}", nnn),
            (0xC, _, _, _) => format!("RND V{:X}, {:#04X}", x, kk),
            (0xD, _, _, _) => format!("DRW V{:X}, V{:X}, {}", x, y, n),
            (0xE, _, 0x9, 0xE) => format!("SKP V{:X}", x),
            (0xE, _, 0xA, 0x1) => format!("SKNP V{:X}", x),
            (0xF, _, 0x0, 0x7) => format!("LD V{:X}, DT", x),
            (0xF, _, 0x0, 0xA) => format!("LD V{:X}, K", x),
            (0xF, _, 0x1, 0x5) => format!("LD DT, V{:X}", x),
            (0xF, _, 0x1, 0x8) => format!("LD ST, V{:X}", x),
            (0xF, _, 0x1, 0xE) => format!("ADD I, V{:X}", x),
            (0xF, _, 0x2, 0x9) => format!("LD F, V{:X}", x),
            (0xF, _, 0x3, 0x3) => format!("LD B, V{:X}", x),
            (0xF, _, 0x5, 0x5) => format!("LD [I], V{:X}", x),
            (0xF, _, 0x6, 0x5) => format!("LD V{:X}, [I]", x),
            _ => "UNKNOWN".to_string(),
        }
    }
}

impl From<u16> for OpcodeFields {
    fn from(raw: u16) -> Self {
        Self::decompose(raw)
    }
}

impl std::fmt::Display for OpcodeFields {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}  {}", self.raw, self.mnemonic())
    }
}
