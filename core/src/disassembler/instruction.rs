use octet_interface::Address;
use thiserror::Error;

use crate::instruction::{Instruction, Operand};
use crate::runtime::{lookup, Program};

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DecodeError {
  #[error("invalid opcode {opcode:#04x} at {pc:#06x}")]
  InvalidOpcode { pc: Address, opcode: u8 },
  #[error("truncated instruction at {0:#06x}")]
  Truncated(Address),
}

/// Decode the instruction at the start of `bytes`, which sit at address `pc`.
pub fn decode(bytes: &[u8], pc: Address) -> Result<Instruction, DecodeError> {
  let opcode = *bytes.first().ok_or(DecodeError::Truncated(pc))?;
  let info = lookup(opcode).ok_or(DecodeError::InvalidOpcode { pc, opcode })?;
  let operand = match info.mode.operand_len() {
    0 => Operand::None,
    1 => Operand::Byte(*bytes.get(1).ok_or(DecodeError::Truncated(pc))?),
    _ => match bytes.get(1..3) {
      Some(&[lo, hi]) => Operand::Word(u16::from_le_bytes([lo, hi])),
      _ => return Err(DecodeError::Truncated(pc)),
    },
  };
  Ok(Instruction::new(info.opcode, info.mode, operand))
}

/// One line of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
  Instruction(Instruction),
  /// A byte that does not start a valid instruction.
  Data(u8),
}

/// Linear sweep over the image. Bytes that do not decode are emitted as data
/// and the sweep resumes at the next byte.
pub fn disassemble(program: &Program) -> Vec<(Address, Line)> {
  let mut lines = Vec::new();
  let mut offset = 0;
  while offset < program.image.len() {
    let pc = program.load_address.wrapping_add(offset as Address);
    match decode(&program.image[offset..], pc) {
      Ok(instruction) => {
        offset += instruction.len() as usize;
        lines.push((pc, Line::Instruction(instruction)));
      }
      Err(err) => {
        tracing::debug!(%err, "emitting data byte");
        lines.push((pc, Line::Data(program.image[offset])));
        offset += 1;
      }
    }
  }
  lines
}

/// Render a listing, one `ADDR: BYTES  TEXT` line per entry.
pub fn listing(program: &Program) -> String {
  let mut out = String::new();
  for (pc, line) in disassemble(program) {
    let (bytes, text) = match line {
      Line::Instruction(instruction) => (
        instruction.to_bytes().unwrap_or_default(),
        instruction.display_at(pc),
      ),
      Line::Data(byte) => (vec![byte], format!(".byte ${byte:02X}")),
    };
    let hex = bytes
      .iter()
      .map(|b| format!("{b:02X}"))
      .collect::<Vec<_>>()
      .join(" ");
    out.push_str(&format!("{pc:04X}: {hex:<8}  {text}\n"));
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::runtime::{AddressMode, Opcode};
  use crate::utils::FIBONACCI_PROGRAM;

  #[test]
  fn decode_reads_operands_little_endian() {
    assert_eq!(
      decode(&[0x8D, 0x04, 0x01], 0x1000),
      Ok(Instruction::absolute(Opcode::Sta, 0x0104))
    );
    assert_eq!(
      decode(&[0xB1, 0x10], 0x1000),
      Ok(Instruction::new(Opcode::Lda, AddressMode::IndirectY, Operand::Byte(0x10)))
    );
  }

  #[test]
  fn decode_errors() {
    assert_eq!(
      decode(&[0xFF], 0x1234),
      Err(DecodeError::InvalidOpcode {
        pc: 0x1234,
        opcode: 0xFF
      })
    );
    assert_eq!(decode(&[0x8D, 0x04], 0x10), Err(DecodeError::Truncated(0x10)));
    assert_eq!(decode(&[], 0x10), Err(DecodeError::Truncated(0x10)));
  }

  #[test]
  fn disassemble_fibonacci() {
    let program = Program::new(FIBONACCI_PROGRAM.to_vec(), 0x1000, 0x1000);
    let lines = disassemble(&program);
    assert_eq!(lines.first(), Some(&(0x1000, Line::Instruction(Instruction::immediate(Opcode::Lda, 0)))));
    assert_eq!(
      lines.last(),
      Some(&(0x1025, Line::Instruction(Instruction::absolute(Opcode::Jmp, 0x1025))))
    );
    assert!(lines.iter().all(|(_, line)| matches!(line, Line::Instruction(_))));

    let text = listing(&program);
    assert!(text.contains("101E: D0 F2     BNE $1012"));
    assert!(text.contains("1022: 8D 04 01  STA $0104"));
  }

  #[test]
  fn invalid_bytes_become_data() {
    let program = Program::new(vec![0x02, 0xEA, 0xA9], 0x2000, 0x2000);
    assert_eq!(
      disassemble(&program),
      vec![
        (0x2000, Line::Data(0x02)),
        (0x2001, Line::Instruction(Instruction::implied(Opcode::Nop))),
        (0x2002, Line::Data(0xA9)),
      ]
    );
  }
}
