use std::collections::BTreeMap;

use octet_core::runtime::{encode, AddressMode, Opcode, Program};
use octet_interface::{Address, LOAD_ADDRESS, MEMORY_SIZE};

use crate::error::{AsmError, ErrorKind, Pos};
use crate::parser::{parse, Expr, ExprKind, Line, Operand, Statement};

/// Label where execution starts when present.
pub const ENTRY_LABEL: &str = "start";

/// Machine code laid out from `origin`, and the value of every symbol that
/// is a valid address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Assembly {
  pub origin: Address,
  pub bytes: Vec<u8>,
  pub symbols: BTreeMap<String, Address>,
}

impl Assembly {
  /// The `start` label, or the origin.
  pub fn entry(&self) -> Address {
    self.symbols.get(ENTRY_LABEL).copied().unwrap_or(self.origin)
  }
}

impl From<Assembly> for Program {
  fn from(assembly: Assembly) -> Self {
    let pc_start = assembly.entry();
    Program::new(assembly.bytes, assembly.origin, pc_start).with_symbols(assembly.symbols)
  }
}

/// Assemble a source file in two passes.
pub fn assemble(source: &str) -> Result<Assembly, AsmError> {
  let lines = parse(source)?;
  let mut assembler = Assembler::default();
  assembler.pass_one(&lines)?;
  let assembly = assembler.pass_two(&lines)?;
  tracing::debug!(
    origin = format_args!("0x{:04x}", assembly.origin),
    len = assembly.bytes.len(),
    symbols = assembly.symbols.len(),
    "assembled"
  );
  Ok(assembly)
}

#[derive(Default)]
struct Assembler {
  symbols: BTreeMap<String, i64>,
  /// Addressing mode chosen in pass one for each instruction, in order.
  modes: Vec<AddressMode>,
  origin: Option<Address>,
}

fn err(pos: Pos, kind: ErrorKind) -> AsmError {
  AsmError::new(pos, kind)
}

fn check_range(value: i64, range: std::ops::RangeInclusive<i64>, pos: Pos) -> Result<i64, AsmError> {
  if range.contains(&value) {
    Ok(value)
  } else {
    Err(err(pos, ErrorKind::ValueOutOfRange(value)))
  }
}

/// A byte operand. Negative values down to -128 are stored in two's complement.
fn byte(value: i64, pos: Pos) -> Result<u8, AsmError> {
  Ok(check_range(value, -128..=0xFF, pos)? as u8)
}

fn word(value: i64, pos: Pos) -> Result<u16, AsmError> {
  Ok(check_range(value, 0..=0xFFFF, pos)? as u16)
}

impl Assembler {
  fn define(&mut self, name: &str, value: i64, pos: Pos) -> Result<(), AsmError> {
    if self.symbols.insert(name.to_string(), value).is_some() {
      return Err(err(pos, ErrorKind::DuplicateSymbol(name.to_string())));
    }
    Ok(())
  }

  fn eval(&self, expr: &Expr, pc: i64) -> Result<i64, AsmError> {
    Ok(match &expr.kind {
      ExprKind::Number(value) => *value,
      ExprKind::Symbol(name) => *self
        .symbols
        .get(name)
        .ok_or_else(|| err(expr.pos, ErrorKind::UndefinedSymbol(name.clone())))?,
      ExprKind::Here => pc,
      ExprKind::Neg(inner) => -self.eval(inner, pc)?,
      ExprKind::Low(inner) => self.eval(inner, pc)? & 0xFF,
      ExprKind::High(inner) => (self.eval(inner, pc)? >> 8) & 0xFF,
      ExprKind::Add(lhs, rhs) => self.eval(lhs, pc)? + self.eval(rhs, pc)?,
      ExprKind::Sub(lhs, rhs) => self.eval(lhs, pc)? - self.eval(rhs, pc)?,
    })
  }

  /// Pick the addressing mode for an instruction. Zero-page forms are only
  /// chosen when the operand is already known to fit in a byte.
  fn select_mode(&self, opcode: Opcode, operand: &Operand, pc: i64, pos: Pos) -> Result<AddressMode, AsmError> {
    let supports = |mode| encode(opcode, mode).is_some();
    let sized = |expr: &Expr, zero_page, absolute| {
      let fits = matches!(self.eval(expr, pc), Ok(value) if (0..=0xFF).contains(&value));
      if (fits && supports(zero_page)) || !supports(absolute) {
        zero_page
      } else {
        absolute
      }
    };

    let mode = match operand {
      Operand::None if supports(AddressMode::Implied) => AddressMode::Implied,
      // `ASL` alone shifts the accumulator
      Operand::None if supports(AddressMode::Accumulator) => AddressMode::Accumulator,
      Operand::None => return Err(err(pos, ErrorKind::MissingOperand { opcode })),
      Operand::Accumulator => AddressMode::Accumulator,
      Operand::Immediate(_) => AddressMode::Immediate,
      Operand::Indirect(_) => AddressMode::Indirect,
      Operand::IndirectX(_) => AddressMode::IndirectX,
      Operand::IndirectY(_) => AddressMode::IndirectY,
      Operand::Direct(_) if supports(AddressMode::Relative) => AddressMode::Relative,
      Operand::Direct(expr) => sized(expr, AddressMode::ZeroPage, AddressMode::Absolute),
      Operand::IndexedX(expr) => sized(expr, AddressMode::ZeroPageX, AddressMode::AbsoluteX),
      Operand::IndexedY(expr) => sized(expr, AddressMode::ZeroPageY, AddressMode::AbsoluteY),
    };

    if !supports(mode) {
      return Err(err(pos, ErrorKind::UnsupportedMode { opcode, mode }));
    }
    Ok(mode)
  }

  /// Assign addresses to labels and choose operand sizes.
  fn pass_one(&mut self, lines: &[Line]) -> Result<(), AsmError> {
    let mut pc = LOAD_ADDRESS as i64;
    let mut started = false;
    // constants referring to labels further down
    let mut pending = Vec::new();

    for line in lines {
      if let Some((name, pos)) = &line.label {
        self.define(name, pc, *pos)?;
      }
      let Some((statement, pos)) = &line.statement else {
        continue;
      };
      match statement {
        Statement::Constant { name, value } => match self.eval(value, pc) {
          Ok(value) => self.define(name, value, *pos)?,
          Err(_) => pending.push((name, value, pc, *pos)),
        },
        Statement::Org(expr) => {
          let origin = word(self.eval(expr, pc)?, expr.pos)?;
          if !started {
            self.origin = Some(origin);
          } else if (origin as i64) < pc {
            return Err(err(*pos, ErrorKind::OriginBackwards { origin: origin as i64, pc: pc as Address }));
          }
          pc = origin as i64;
        }
        Statement::Byte(exprs) => {
          started = true;
          pc += exprs.len() as i64;
        }
        Statement::Word(exprs) => {
          started = true;
          pc += 2 * exprs.len() as i64;
        }
        Statement::Instruction { opcode, operand } => {
          started = true;
          let mode = self.select_mode(*opcode, operand, pc, *pos)?;
          self.modes.push(mode);
          pc += 1 + mode.operand_len() as i64;
        }
      }
      if pc > MEMORY_SIZE as i64 {
        return Err(err(*pos, ErrorKind::ValueOutOfRange(pc)));
      }
    }

    // resolve forward constants until nothing changes, then report the first failure
    while !pending.is_empty() {
      let before = pending.len();
      let mut unresolved = Vec::new();
      for (name, value, pc, pos) in pending {
        match self.eval(value, pc) {
          Ok(value) => self.define(name, value, pos)?,
          Err(e) => unresolved.push((name, value, pc, pos, e)),
        }
      }
      if unresolved.len() == before {
        let (_, _, _, _, e) = unresolved.swap_remove(0);
        return Err(e);
      }
      pending = unresolved
        .into_iter()
        .map(|(name, value, pc, pos, _)| (name, value, pc, pos))
        .collect();
    }

    tracing::trace!(symbols = ?self.symbols, "pass one");
    Ok(())
  }

  /// Emit bytes with every symbol known.
  fn pass_two(&self, lines: &[Line]) -> Result<Assembly, AsmError> {
    let origin = self.origin.unwrap_or(LOAD_ADDRESS);
    let mut pc = origin as i64;
    let mut bytes = Vec::new();
    let mut modes = self.modes.iter();

    for line in lines {
      let Some((statement, _)) = &line.statement else {
        continue;
      };
      match statement {
        Statement::Constant { .. } => {}
        Statement::Org(expr) => {
          let target = self.eval(expr, pc)?;
          // gaps between sections are zero-filled
          if !bytes.is_empty() {
            bytes.resize(bytes.len() + (target - pc) as usize, 0);
          }
          pc = target;
        }
        Statement::Byte(exprs) => {
          for expr in exprs {
            bytes.push(byte(self.eval(expr, pc)?, expr.pos)?);
          }
          pc += exprs.len() as i64;
        }
        Statement::Word(exprs) => {
          for expr in exprs {
            bytes.extend(word(self.eval(expr, pc)?, expr.pos)?.to_le_bytes());
          }
          pc += 2 * exprs.len() as i64;
        }
        Statement::Instruction { opcode, operand } => {
          let Some(&mode) = modes.next() else {
            unreachable!("pass one sized every instruction");
          };
          let Some(code) = encode(*opcode, mode) else {
            unreachable!("pass one checked {opcode} {mode}");
          };
          bytes.push(code);
          let len = 1 + mode.operand_len() as i64;
          self.emit_operand(&mut bytes, mode, operand, pc, len)?;
          pc += len;
        }
      }
    }

    let symbols = self
      .symbols
      .iter()
      .filter_map(|(name, value)| Some((name.clone(), Address::try_from(*value).ok()?)))
      .collect();
    Ok(Assembly {
      origin,
      bytes,
      symbols,
    })
  }

  fn emit_operand(
    &self,
    bytes: &mut Vec<u8>,
    mode: AddressMode,
    operand: &Operand,
    pc: i64,
    len: i64,
  ) -> Result<(), AsmError> {
    let expr = match operand {
      Operand::None | Operand::Accumulator => return Ok(()),
      Operand::Immediate(expr)
      | Operand::Direct(expr)
      | Operand::IndexedX(expr)
      | Operand::IndexedY(expr)
      | Operand::Indirect(expr)
      | Operand::IndirectX(expr)
      | Operand::IndirectY(expr) => expr,
    };
    let value = self.eval(expr, pc)?;

    match mode {
      AddressMode::Implied | AddressMode::Accumulator => {}
      AddressMode::Immediate => bytes.push(byte(value, expr.pos)?),
      AddressMode::Relative => {
        let offset = value - (pc + len);
        if !(-128..=127).contains(&offset) {
          return Err(err(expr.pos, ErrorKind::BranchOutOfRange(offset)));
        }
        bytes.push(offset as i8 as u8);
      }
      AddressMode::ZeroPage
      | AddressMode::ZeroPageX
      | AddressMode::ZeroPageY
      | AddressMode::IndirectX
      | AddressMode::IndirectY => bytes.push(check_range(value, 0..=0xFF, expr.pos)? as u8),
      AddressMode::Absolute
      | AddressMode::AbsoluteX
      | AddressMode::AbsoluteY
      | AddressMode::Indirect => bytes.extend(word(value, expr.pos)?.to_le_bytes()),
    }
    Ok(())
  }
}
