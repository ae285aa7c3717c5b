use std::fmt;

use octet_core::runtime::{AddressMode, Opcode};
use octet_interface::Address;
use thiserror::Error;

/// A 1-based line and column in the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Pos {
  pub line: usize,
  pub col: usize,
}

impl fmt::Display for Pos {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.line, self.col)
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{pos}: {kind}")]
pub struct AsmError {
  pub pos: Pos,
  pub kind: ErrorKind,
}

impl AsmError {
  pub fn new(pos: Pos, kind: ErrorKind) -> Self {
    Self { pos, kind }
  }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
  #[error("unexpected character '{0}'")]
  UnexpectedCharacter(String),
  #[error("unexpected token '{0}'")]
  UnexpectedToken(String),
  #[error("unexpected end of line")]
  UnexpectedEndOfLine,
  #[error("unknown mnemonic '{0}'")]
  UnknownMnemonic(String),
  #[error("unknown directive '.{0}'")]
  UnknownDirective(String),
  #[error("{opcode} does not support {mode} addressing")]
  UnsupportedMode { opcode: Opcode, mode: AddressMode },
  #[error("{opcode} requires an operand")]
  MissingOperand { opcode: Opcode },
  #[error("undefined symbol '{0}'")]
  UndefinedSymbol(String),
  #[error("duplicate symbol '{0}'")]
  DuplicateSymbol(String),
  #[error("branch target out of range (offset {0})")]
  BranchOutOfRange(i64),
  #[error("value {0} out of range")]
  ValueOutOfRange(i64),
  #[error("origin {origin:#06x} is below the current address {pc:#06x}")]
  OriginBackwards { origin: i64, pc: Address },
  #[error("unknown preprocessor directive '%{0}'")]
  UnknownPreprocessorDirective(String),
  #[error("macro '{name}' has no overload taking {args} argument(s)")]
  NoMacroOverload { name: String, args: usize },
  #[error("recursion limit reached while expanding macro '{0}'")]
  MacroRecursion(String),
}
