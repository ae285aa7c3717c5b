use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

/// An instruction mnemonic of the NMOS 6502 documented instruction set.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Display,
  EnumString,
  EnumIter,
  IntoStaticStr,
  Serialize,
  Deserialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Opcode {
  Adc,
  And,
  Asl,
  Bcc,
  Bcs,
  Beq,
  Bit,
  Bmi,
  Bne,
  Bpl,
  Brk,
  Bvc,
  Bvs,
  Clc,
  Cld,
  Cli,
  Clv,
  Cmp,
  Cpx,
  Cpy,
  Dec,
  Dex,
  Dey,
  Eor,
  Inc,
  Inx,
  Iny,
  Jmp,
  Jsr,
  Lda,
  Ldx,
  Ldy,
  Lsr,
  Nop,
  Ora,
  Pha,
  Php,
  Pla,
  Plp,
  Rol,
  Ror,
  Rti,
  Rts,
  Sbc,
  Sec,
  Sed,
  Sei,
  Sta,
  Stx,
  Sty,
  Tax,
  Tay,
  Tsx,
  Txa,
  Txs,
  Tya,
}

impl Opcode {
  /// Branches only support relative addressing and are assembled differently.
  pub const fn is_branch(self) -> bool {
    matches!(
      self,
      Opcode::Bcc
        | Opcode::Bcs
        | Opcode::Beq
        | Opcode::Bmi
        | Opcode::Bne
        | Opcode::Bpl
        | Opcode::Bvc
        | Opcode::Bvs
    )
  }

  /// Instructions that only read their operand pay one extra cycle when
  /// indexing crosses a page boundary.
  pub const fn pays_page_penalty(self) -> bool {
    matches!(
      self,
      Opcode::Adc
        | Opcode::And
        | Opcode::Cmp
        | Opcode::Eor
        | Opcode::Lda
        | Opcode::Ldx
        | Opcode::Ldy
        | Opcode::Ora
        | Opcode::Sbc
    )
  }
}

/// How an instruction locates its operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AddressMode {
  Implied,
  Accumulator,
  Immediate,
  ZeroPage,
  ZeroPageX,
  ZeroPageY,
  Absolute,
  AbsoluteX,
  AbsoluteY,
  Indirect,
  IndirectX,
  IndirectY,
  Relative,
}

impl AddressMode {
  /// Number of operand bytes following the opcode byte.
  pub const fn operand_len(self) -> u16 {
    match self {
      AddressMode::Implied | AddressMode::Accumulator => 0,
      AddressMode::Immediate
      | AddressMode::ZeroPage
      | AddressMode::ZeroPageX
      | AddressMode::ZeroPageY
      | AddressMode::IndirectX
      | AddressMode::IndirectY
      | AddressMode::Relative => 1,
      AddressMode::Absolute
      | AddressMode::AbsoluteX
      | AddressMode::AbsoluteY
      | AddressMode::Indirect => 2,
    }
  }
}

impl fmt::Display for AddressMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      AddressMode::Implied => "implied",
      AddressMode::Accumulator => "accumulator",
      AddressMode::Immediate => "immediate",
      AddressMode::ZeroPage => "zero page",
      AddressMode::ZeroPageX => "zero page,X",
      AddressMode::ZeroPageY => "zero page,Y",
      AddressMode::Absolute => "absolute",
      AddressMode::AbsoluteX => "absolute,X",
      AddressMode::AbsoluteY => "absolute,Y",
      AddressMode::Indirect => "indirect",
      AddressMode::IndirectX => "(indirect,X)",
      AddressMode::IndirectY => "(indirect),Y",
      AddressMode::Relative => "relative",
    };
    f.write_str(name)
  }
}

/// Decoded meaning of one opcode byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpcodeInfo {
  pub opcode: Opcode,
  pub mode: AddressMode,
  /// Base cycle count, before page-crossing and branch penalties.
  pub cycles: u8,
}

const fn op(opcode: Opcode, mode: AddressMode, cycles: u8) -> OpcodeInfo {
  OpcodeInfo {
    opcode,
    mode,
    cycles,
  }
}

use AddressMode::*;

#[rustfmt::skip]
const OPCODE_TABLE: [(u8, OpcodeInfo); 151] = [
  (0x69, op(Opcode::Adc, Immediate, 2)),
  (0x65, op(Opcode::Adc, ZeroPage, 3)),
  (0x75, op(Opcode::Adc, ZeroPageX, 4)),
  (0x6D, op(Opcode::Adc, Absolute, 4)),
  (0x7D, op(Opcode::Adc, AbsoluteX, 4)),
  (0x79, op(Opcode::Adc, AbsoluteY, 4)),
  (0x61, op(Opcode::Adc, IndirectX, 6)),
  (0x71, op(Opcode::Adc, IndirectY, 5)),

  (0x29, op(Opcode::And, Immediate, 2)),
  (0x25, op(Opcode::And, ZeroPage, 3)),
  (0x35, op(Opcode::And, ZeroPageX, 4)),
  (0x2D, op(Opcode::And, Absolute, 4)),
  (0x3D, op(Opcode::And, AbsoluteX, 4)),
  (0x39, op(Opcode::And, AbsoluteY, 4)),
  (0x21, op(Opcode::And, IndirectX, 6)),
  (0x31, op(Opcode::And, IndirectY, 5)),

  (0x0A, op(Opcode::Asl, Accumulator, 2)),
  (0x06, op(Opcode::Asl, ZeroPage, 5)),
  (0x16, op(Opcode::Asl, ZeroPageX, 6)),
  (0x0E, op(Opcode::Asl, Absolute, 6)),
  (0x1E, op(Opcode::Asl, AbsoluteX, 7)),

  (0x90, op(Opcode::Bcc, Relative, 2)),
  (0xB0, op(Opcode::Bcs, Relative, 2)),
  (0xF0, op(Opcode::Beq, Relative, 2)),
  (0x30, op(Opcode::Bmi, Relative, 2)),
  (0xD0, op(Opcode::Bne, Relative, 2)),
  (0x10, op(Opcode::Bpl, Relative, 2)),
  (0x50, op(Opcode::Bvc, Relative, 2)),
  (0x70, op(Opcode::Bvs, Relative, 2)),

  (0x24, op(Opcode::Bit, ZeroPage, 3)),
  (0x2C, op(Opcode::Bit, Absolute, 4)),

  (0x00, op(Opcode::Brk, Implied, 7)),

  (0x18, op(Opcode::Clc, Implied, 2)),
  (0xD8, op(Opcode::Cld, Implied, 2)),
  (0x58, op(Opcode::Cli, Implied, 2)),
  (0xB8, op(Opcode::Clv, Implied, 2)),

  (0xC9, op(Opcode::Cmp, Immediate, 2)),
  (0xC5, op(Opcode::Cmp, ZeroPage, 3)),
  (0xD5, op(Opcode::Cmp, ZeroPageX, 4)),
  (0xCD, op(Opcode::Cmp, Absolute, 4)),
  (0xDD, op(Opcode::Cmp, AbsoluteX, 4)),
  (0xD9, op(Opcode::Cmp, AbsoluteY, 4)),
  (0xC1, op(Opcode::Cmp, IndirectX, 6)),
  (0xD1, op(Opcode::Cmp, IndirectY, 5)),

  (0xE0, op(Opcode::Cpx, Immediate, 2)),
  (0xE4, op(Opcode::Cpx, ZeroPage, 3)),
  (0xEC, op(Opcode::Cpx, Absolute, 4)),

  (0xC0, op(Opcode::Cpy, Immediate, 2)),
  (0xC4, op(Opcode::Cpy, ZeroPage, 3)),
  (0xCC, op(Opcode::Cpy, Absolute, 4)),

  (0xC6, op(Opcode::Dec, ZeroPage, 5)),
  (0xD6, op(Opcode::Dec, ZeroPageX, 6)),
  (0xCE, op(Opcode::Dec, Absolute, 6)),
  (0xDE, op(Opcode::Dec, AbsoluteX, 7)),

  (0xCA, op(Opcode::Dex, Implied, 2)),
  (0x88, op(Opcode::Dey, Implied, 2)),

  (0x49, op(Opcode::Eor, Immediate, 2)),
  (0x45, op(Opcode::Eor, ZeroPage, 3)),
  (0x55, op(Opcode::Eor, ZeroPageX, 4)),
  (0x4D, op(Opcode::Eor, Absolute, 4)),
  (0x5D, op(Opcode::Eor, AbsoluteX, 4)),
  (0x59, op(Opcode::Eor, AbsoluteY, 4)),
  (0x41, op(Opcode::Eor, IndirectX, 6)),
  (0x51, op(Opcode::Eor, IndirectY, 5)),

  (0xE6, op(Opcode::Inc, ZeroPage, 5)),
  (0xF6, op(Opcode::Inc, ZeroPageX, 6)),
  (0xEE, op(Opcode::Inc, Absolute, 6)),
  (0xFE, op(Opcode::Inc, AbsoluteX, 7)),

  (0xE8, op(Opcode::Inx, Implied, 2)),
  (0xC8, op(Opcode::Iny, Implied, 2)),

  (0x4C, op(Opcode::Jmp, Absolute, 3)),
  (0x6C, op(Opcode::Jmp, Indirect, 5)),
  (0x20, op(Opcode::Jsr, Absolute, 6)),

  (0xA9, op(Opcode::Lda, Immediate, 2)),
  (0xA5, op(Opcode::Lda, ZeroPage, 3)),
  (0xB5, op(Opcode::Lda, ZeroPageX, 4)),
  (0xAD, op(Opcode::Lda, Absolute, 4)),
  (0xBD, op(Opcode::Lda, AbsoluteX, 4)),
  (0xB9, op(Opcode::Lda, AbsoluteY, 4)),
  (0xA1, op(Opcode::Lda, IndirectX, 6)),
  (0xB1, op(Opcode::Lda, IndirectY, 5)),

  (0xA2, op(Opcode::Ldx, Immediate, 2)),
  (0xA6, op(Opcode::Ldx, ZeroPage, 3)),
  (0xB6, op(Opcode::Ldx, ZeroPageY, 4)),
  (0xAE, op(Opcode::Ldx, Absolute, 4)),
  (0xBE, op(Opcode::Ldx, AbsoluteY, 4)),

  (0xA0, op(Opcode::Ldy, Immediate, 2)),
  (0xA4, op(Opcode::Ldy, ZeroPage, 3)),
  (0xB4, op(Opcode::Ldy, ZeroPageX, 4)),
  (0xAC, op(Opcode::Ldy, Absolute, 4)),
  (0xBC, op(Opcode::Ldy, AbsoluteX, 4)),

  (0x4A, op(Opcode::Lsr, Accumulator, 2)),
  (0x46, op(Opcode::Lsr, ZeroPage, 5)),
  (0x56, op(Opcode::Lsr, ZeroPageX, 6)),
  (0x4E, op(Opcode::Lsr, Absolute, 6)),
  (0x5E, op(Opcode::Lsr, AbsoluteX, 7)),

  (0xEA, op(Opcode::Nop, Implied, 2)),

  (0x09, op(Opcode::Ora, Immediate, 2)),
  (0x05, op(Opcode::Ora, ZeroPage, 3)),
  (0x15, op(Opcode::Ora, ZeroPageX, 4)),
  (0x0D, op(Opcode::Ora, Absolute, 4)),
  (0x1D, op(Opcode::Ora, AbsoluteX, 4)),
  (0x19, op(Opcode::Ora, AbsoluteY, 4)),
  (0x01, op(Opcode::Ora, IndirectX, 6)),
  (0x11, op(Opcode::Ora, IndirectY, 5)),

  (0x48, op(Opcode::Pha, Implied, 3)),
  (0x08, op(Opcode::Php, Implied, 3)),
  (0x68, op(Opcode::Pla, Implied, 4)),
  (0x28, op(Opcode::Plp, Implied, 4)),

  (0x2A, op(Opcode::Rol, Accumulator, 2)),
  (0x26, op(Opcode::Rol, ZeroPage, 5)),
  (0x36, op(Opcode::Rol, ZeroPageX, 6)),
  (0x2E, op(Opcode::Rol, Absolute, 6)),
  (0x3E, op(Opcode::Rol, AbsoluteX, 7)),

  (0x6A, op(Opcode::Ror, Accumulator, 2)),
  (0x66, op(Opcode::Ror, ZeroPage, 5)),
  (0x76, op(Opcode::Ror, ZeroPageX, 6)),
  (0x6E, op(Opcode::Ror, Absolute, 6)),
  (0x7E, op(Opcode::Ror, AbsoluteX, 7)),

  (0x40, op(Opcode::Rti, Implied, 6)),
  (0x60, op(Opcode::Rts, Implied, 6)),

  (0xE9, op(Opcode::Sbc, Immediate, 2)),
  (0xE5, op(Opcode::Sbc, ZeroPage, 3)),
  (0xF5, op(Opcode::Sbc, ZeroPageX, 4)),
  (0xED, op(Opcode::Sbc, Absolute, 4)),
  (0xFD, op(Opcode::Sbc, AbsoluteX, 4)),
  (0xF9, op(Opcode::Sbc, AbsoluteY, 4)),
  (0xE1, op(Opcode::Sbc, IndirectX, 6)),
  (0xF1, op(Opcode::Sbc, IndirectY, 5)),

  (0x38, op(Opcode::Sec, Implied, 2)),
  (0xF8, op(Opcode::Sed, Implied, 2)),
  (0x78, op(Opcode::Sei, Implied, 2)),

  (0x85, op(Opcode::Sta, ZeroPage, 3)),
  (0x95, op(Opcode::Sta, ZeroPageX, 4)),
  (0x8D, op(Opcode::Sta, Absolute, 4)),
  (0x9D, op(Opcode::Sta, AbsoluteX, 5)),
  (0x99, op(Opcode::Sta, AbsoluteY, 5)),
  (0x81, op(Opcode::Sta, IndirectX, 6)),
  (0x91, op(Opcode::Sta, IndirectY, 6)),

  (0x86, op(Opcode::Stx, ZeroPage, 3)),
  (0x96, op(Opcode::Stx, ZeroPageY, 4)),
  (0x8E, op(Opcode::Stx, Absolute, 4)),

  (0x84, op(Opcode::Sty, ZeroPage, 3)),
  (0x94, op(Opcode::Sty, ZeroPageX, 4)),
  (0x8C, op(Opcode::Sty, Absolute, 4)),

  (0xAA, op(Opcode::Tax, Implied, 2)),
  (0xA8, op(Opcode::Tay, Implied, 2)),
  (0xBA, op(Opcode::Tsx, Implied, 2)),
  (0x8A, op(Opcode::Txa, Implied, 2)),
  (0x9A, op(Opcode::Txs, Implied, 2)),
  (0x98, op(Opcode::Tya, Implied, 2)),
];

const fn build_decode_table() -> [Option<OpcodeInfo>; 256] {
  let mut table = [None; 256];
  let mut i = 0;
  while i < OPCODE_TABLE.len() {
    let (byte, info) = OPCODE_TABLE[i];
    table[byte as usize] = Some(info);
    i += 1;
  }
  table
}

static DECODE_TABLE: [Option<OpcodeInfo>; 256] = build_decode_table();

/// Look up an opcode byte. Undocumented opcodes yield `None`.
pub fn lookup(byte: u8) -> Option<OpcodeInfo> {
  DECODE_TABLE[byte as usize]
}

/// Find the byte encoding `opcode` in `mode`, if the combination exists.
pub fn encode(opcode: Opcode, mode: AddressMode) -> Option<u8> {
  OPCODE_TABLE
    .iter()
    .find(|(_, info)| info.opcode == opcode && info.mode == mode)
    .map(|(byte, _)| *byte)
}

/// All addressing modes `opcode` supports.
pub fn modes(opcode: Opcode) -> impl Iterator<Item = AddressMode> {
  OPCODE_TABLE
    .iter()
    .filter(move |(_, info)| info.opcode == opcode)
    .map(|(_, info)| info.mode)
}
