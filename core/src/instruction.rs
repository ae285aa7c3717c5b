use std::fmt;

use octet_interface::Address;
use serde::{Deserialize, Serialize};

use crate::runtime::{encode, AddressMode, Opcode};

/// The operand bytes following an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operand {
  None,
  Byte(u8),
  Word(u16),
}

/// A decoded instruction of the 8-bit CPU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
  pub opcode: Opcode,
  pub mode: AddressMode,
  pub operand: Operand,
}

impl Instruction {
  pub const fn new(opcode: Opcode, mode: AddressMode, operand: Operand) -> Self {
    Self {
      opcode,
      mode,
      operand,
    }
  }

  pub const fn implied(opcode: Opcode) -> Self {
    Self::new(opcode, AddressMode::Implied, Operand::None)
  }

  pub const fn immediate(opcode: Opcode, value: u8) -> Self {
    Self::new(opcode, AddressMode::Immediate, Operand::Byte(value))
  }

  pub const fn zero_page(opcode: Opcode, address: u8) -> Self {
    Self::new(opcode, AddressMode::ZeroPage, Operand::Byte(address))
  }

  pub const fn absolute(opcode: Opcode, address: Address) -> Self {
    Self::new(opcode, AddressMode::Absolute, Operand::Word(address))
  }

  pub const fn relative(opcode: Opcode, offset: i8) -> Self {
    Self::new(opcode, AddressMode::Relative, Operand::Byte(offset as u8))
  }

  /// Encoded size in bytes.
  pub const fn len(&self) -> u16 {
    1 + self.mode.operand_len()
  }

  pub(crate) fn byte(&self) -> u8 {
    match self.operand {
      Operand::Byte(value) => value,
      Operand::Word(value) => value as u8,
      Operand::None => 0,
    }
  }

  pub(crate) fn word(&self) -> u16 {
    match self.operand {
      Operand::Word(value) => value,
      Operand::Byte(value) => value as u16,
      Operand::None => 0,
    }
  }

  /// Where a branch located at `pc` goes when taken.
  pub fn branch_target(&self, pc: Address) -> Option<Address> {
    if self.mode != AddressMode::Relative {
      return None;
    }
    let offset = self.byte() as i8;
    Some(pc.wrapping_add(self.len()).wrapping_add_signed(offset as i16))
  }

  /// Encode into machine code. Fails when the opcode does not support the
  /// addressing mode.
  pub fn to_bytes(&self) -> Option<Vec<u8>> {
    let byte = encode(self.opcode, self.mode)?;
    let mut bytes = vec![byte];
    match self.mode.operand_len() {
      0 => {}
      1 => bytes.push(self.byte()),
      _ => bytes.extend_from_slice(&self.word().to_le_bytes()),
    }
    Some(bytes)
  }

  /// Render with branch targets resolved against `pc`, as in a listing.
  pub fn display_at(&self, pc: Address) -> String {
    match self.branch_target(pc) {
      Some(target) => format!("{} ${:04X}", self.opcode, target),
      None => self.to_string(),
    }
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let op = self.opcode;
    match self.mode {
      AddressMode::Implied => write!(f, "{op}"),
      AddressMode::Accumulator => write!(f, "{op} A"),
      AddressMode::Immediate => write!(f, "{op} #${:02X}", self.byte()),
      AddressMode::ZeroPage => write!(f, "{op} ${:02X}", self.byte()),
      AddressMode::ZeroPageX => write!(f, "{op} ${:02X},X", self.byte()),
      AddressMode::ZeroPageY => write!(f, "{op} ${:02X},Y", self.byte()),
      AddressMode::Absolute => write!(f, "{op} ${:04X}", self.word()),
      AddressMode::AbsoluteX => write!(f, "{op} ${:04X},X", self.word()),
      AddressMode::AbsoluteY => write!(f, "{op} ${:04X},Y", self.word()),
      AddressMode::Indirect => write!(f, "{op} (${:04X})", self.word()),
      AddressMode::IndirectX => write!(f, "{op} (${:02X},X)", self.byte()),
      AddressMode::IndirectY => write!(f, "{op} (${:02X}),Y", self.byte()),
      AddressMode::Relative => {
        // relative to the branch's own address, as assemblers write `*`
        let offset = self.byte() as i8 as i16 + self.len() as i16;
        if offset < 0 {
          write!(f, "{op} *-{}", -offset)
        } else {
          write!(f, "{op} *+{offset}")
        }
      }
    }
  }
}
