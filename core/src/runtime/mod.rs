mod device;
mod memory;
mod opcode;
mod program;
mod register;
mod state;

pub use device::*;
pub use memory::*;
pub use opcode::*;
pub use program::*;
pub use register::*;
pub use state::*;

use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::ops::RangeInclusive;
use std::sync::Arc;

use octet_interface::{Address, Bus, CONSOLE_ADDRESS, IRQ_VECTOR, RES_VECTOR, STACK_BASE};
use thiserror::Error;

use crate::disassembler::decode;
use crate::instruction::Instruction;
use crate::io::MemoryInput;
use crate::utils::OctetCoreOpts;

/// Cycles spent by the reset sequence before the first instruction is fetched.
const RESET_CYCLES: u64 = 7;

/// An implementation of a runtime for the Octet 8-bit VM.
///
/// The runtime is responsible for executing a user program on an emulated
/// NMOS 6502 (documented instructions, binary arithmetic only).
///
/// For a reference of the instruction set, see:
/// https://www.masswerk.at/6502/6502_instruction_set.html
pub struct Runtime {
  /// The program.
  pub program: Arc<Program>,

  /// The state of the execution.
  pub state: ExecutionState,

  /// Bytes written to the console cell.
  pub io_buf: Vec<u8>,

  /// A buffer for writing trace events to a file.
  pub trace_buf: Option<BufWriter<File>>,

  /// Max cycles for the runtime.
  pub max_cycles: Option<u64>,

  /// Memory patches applied when the program is loaded.
  input: MemoryInput,

  initialized: bool,

  breakpoints: BTreeSet<Address>,

  devices: DeviceRegistry,
}

#[non_exhaustive]
#[derive(Error, Debug, PartialEq)]
pub enum ExecutionError {
  #[error("invalid opcode {opcode:#04x} at PC {pc:#06x}")]
  InvalidOpcode { pc: Address, opcode: u8 },
  #[error("out of cycles")]
  OutOfCycles(),
  #[error("breakpoint encountered")]
  Breakpoint(),
  #[error("symbol not found")]
  UnknownSymbol(),
  #[error("invalid memory access at address {0:#06x}: {1}")]
  InvalidMemoryAccess(Address, MemoryErr),
  #[error("program counter left the image at {0:#06x}")]
  LeftImage(Address),
}

#[non_exhaustive]
#[derive(Error, Debug, PartialEq, Eq)]
pub enum MemoryErr {
  #[error("memory access out of bounds")]
  OutOfBounds,
}

/// Something notable that happened while stepping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
  /// The program entered its terminal idle loop.
  Halted,
  /// The program counter reached a breakpoint.
  Break,
}

impl Runtime {
  // Create a new runtime from a program.
  pub fn new(program: Program, opts: OctetCoreOpts) -> Self {
    // Create a shared reference to the program.
    let program = Arc::new(program);

    // If TRACE_FILE is set, initialize the trace buffer.
    let trace_buf = std::env::var("TRACE_FILE")
      .ok()
      .and_then(|trace_file| match File::create(&trace_file) {
        Ok(file) => Some(BufWriter::new(file)),
        Err(err) => {
          tracing::warn!(%trace_file, %err, "cannot create trace file");
          None
        }
      });

    Self {
      state: ExecutionState::new(program.pc_start),
      program,
      io_buf: Vec::new(),
      trace_buf,
      max_cycles: opts.max_cycles(),
      input: MemoryInput::new(),
      initialized: false,
      breakpoints: BTreeSet::new(),
      devices: DeviceRegistry::new(),
    }
  }

  /// Get the current value of a register.
  pub fn register(&self, register: Register) -> u8 {
    self.rr(register)
  }

  /// Get the current value of a byte, bypassing devices.
  pub fn byte(&self, addr: Address) -> u8 {
    self.state.memory.read(addr)
  }

  /// Read a byte as the CPU sees it.
  pub fn mr(&self, addr: Address) -> u8 {
    if addr == CONSOLE_ADDRESS {
      // write-only
      return 0;
    }
    match self.devices.get(addr) {
      Some(device) => device.read(addr),
      None => self.state.memory.read(addr),
    }
  }

  /// Write a byte as the CPU sees it.
  pub fn mw(&mut self, addr: Address, value: u8) {
    if addr == CONSOLE_ADDRESS {
      self.io_buf.push(value);
      return;
    }
    match self.devices.get_mut(addr) {
      Some(device) => device.write(addr, value),
      None => self.state.memory.write(addr, value),
    }
  }

  /// Read from a register.
  pub fn rr(&self, register: Register) -> u8 {
    self.state.regs.read(register)
  }

  /// Write to a register.
  pub fn rw(&mut self, register: Register, value: u8) {
    self.state.regs.write(register, value)
  }

  /// Queue memory patches. They are applied when the program is loaded, or
  /// right away if it already is.
  pub fn write_input(&mut self, input: &MemoryInput) {
    if self.initialized {
      self.apply_input(input);
    } else {
      self.input.extend(input);
    }
  }

  /// Map a device into the address space.
  /// Will fail if the range overlaps a registered device or the console cell.
  pub fn register_device(
    &mut self,
    range: RangeInclusive<Address>,
    device: Box<dyn Device>,
  ) -> anyhow::Result<()> {
    self.devices.register(range, device)
  }

  pub fn add_breakpoint(&mut self, addr: Address) {
    self.breakpoints.insert(addr);
  }

  pub fn remove_breakpoint(&mut self, addr: Address) {
    self.breakpoints.remove(&addr);
  }

  fn push(&mut self, value: u8) {
    let sp = self.rr(Register::SP);
    self.mw(STACK_BASE | sp as Address, value);
    self.rw(Register::SP, sp.wrapping_sub(1));
  }

  fn pull(&mut self) -> u8 {
    let sp = self.rr(Register::SP).wrapping_add(1);
    self.rw(Register::SP, sp);
    self.mr(STACK_BASE | sp as Address)
  }

  fn push_u16(&mut self, value: u16) {
    let [lo, hi] = value.to_le_bytes();
    self.push(hi);
    self.push(lo);
  }

  fn pull_u16(&mut self) -> u16 {
    let lo = self.pull();
    let hi = self.pull();
    u16::from_le_bytes([lo, hi])
  }

  fn read_u16_zero_page(&self, zp: u8) -> u16 {
    u16::from_le_bytes([self.mr(zp as Address), self.mr(zp.wrapping_add(1) as Address)])
  }

  /// Resolve the effective address of a memory operand, and whether indexing
  /// crossed a page.
  fn effective_address(&self, instruction: &Instruction) -> (Address, bool) {
    let x = self.rr(Register::X);
    let y = self.rr(Register::Y);
    let indexed = |base: Address, index: u8| {
      let addr = base.wrapping_add(index as Address);
      (addr, addr & 0xFF00 != base & 0xFF00)
    };

    match instruction.mode {
      AddressMode::ZeroPage => (instruction.byte() as Address, false),
      AddressMode::ZeroPageX => (instruction.byte().wrapping_add(x) as Address, false),
      AddressMode::ZeroPageY => (instruction.byte().wrapping_add(y) as Address, false),
      AddressMode::Absolute => (instruction.word(), false),
      AddressMode::AbsoluteX => indexed(instruction.word(), x),
      AddressMode::AbsoluteY => indexed(instruction.word(), y),
      AddressMode::Indirect => {
        // the pointer's high byte is fetched without carrying into the page
        let ptr = instruction.word();
        let hi_ptr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
        (u16::from_le_bytes([self.mr(ptr), self.mr(hi_ptr)]), false)
      }
      AddressMode::IndirectX => (
        self.read_u16_zero_page(instruction.byte().wrapping_add(x)),
        false,
      ),
      AddressMode::IndirectY => indexed(self.read_u16_zero_page(instruction.byte()), y),
      AddressMode::Implied
      | AddressMode::Accumulator
      | AddressMode::Immediate
      | AddressMode::Relative => unreachable!("{} has no memory operand", instruction.mode),
    }
  }

  /// Fetch the operand value of a read instruction, charging the page-crossing penalty.
  fn read_operand(&mut self, instruction: &Instruction, cycles: &mut u64) -> u8 {
    match instruction.mode {
      AddressMode::Immediate => instruction.byte(),
      AddressMode::Accumulator => self.rr(Register::A),
      _ => {
        let (addr, crossed) = self.effective_address(instruction);
        if crossed && instruction.opcode.pays_page_penalty() {
          *cycles += 1;
        }
        self.mr(addr)
      }
    }
  }

  /// Read-modify-write on the accumulator or a memory cell.
  fn modify(&mut self, instruction: &Instruction, f: impl FnOnce(&mut Self, u8) -> u8) {
    if instruction.mode == AddressMode::Accumulator {
      let value = self.rr(Register::A);
      let result = f(&mut *self, value);
      self.rw(Register::A, result);
    } else {
      let (addr, _) = self.effective_address(instruction);
      let value = self.mr(addr);
      let result = f(&mut *self, value);
      self.mw(addr, result);
    }
  }

  fn store(&mut self, instruction: &Instruction, value: u8) {
    let (addr, _) = self.effective_address(instruction);
    self.mw(addr, value);
  }

  fn load(&mut self, register: Register, value: u8) {
    self.rw(register, value);
    self.state.status.update_zn(value);
  }

  fn add_with_carry(&mut self, value: u8) {
    let a = self.rr(Register::A);
    let sum = a as u16 + value as u16 + self.state.status.carry() as u16;
    let result = sum as u8;
    let status = &mut self.state.status;
    status.set(StatusFlags::CARRY, sum > 0xFF);
    status.set(StatusFlags::OVERFLOW, (!(a ^ value) & (a ^ result) & 0x80) != 0);
    status.update_zn(result);
    self.rw(Register::A, result);
  }

  fn compare(&mut self, register: Register, value: u8) {
    let lhs = self.rr(register);
    let status = &mut self.state.status;
    status.set(StatusFlags::CARRY, lhs >= value);
    status.update_zn(lhs.wrapping_sub(value));
  }

  fn branch(&mut self, taken: bool, pc: Address, instruction: &Instruction, cycles: &mut u64) -> Address {
    let next_pc = pc.wrapping_add(instruction.len());
    if !taken {
      return next_pc;
    }
    let target = instruction.branch_target(pc).unwrap_or(next_pc);
    *cycles += if target & 0xFF00 != next_pc & 0xFF00 { 2 } else { 1 };
    target
  }

  /// Execute the instruction located at `pc` and return the new PC.
  fn execute_instruction(
    &mut self,
    pc: Address,
    instruction: Instruction,
    base_cycles: u8,
  ) -> Address {
    self.trace_execution(pc, &instruction);

    let mut next_pc = pc.wrapping_add(instruction.len());
    let mut cycles = base_cycles as u64;

    match instruction.opcode {
      // Loads and stores
      Opcode::Lda => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.load(Register::A, value);
      }
      Opcode::Ldx => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.load(Register::X, value);
      }
      Opcode::Ldy => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.load(Register::Y, value);
      }
      Opcode::Sta => self.store(&instruction, self.rr(Register::A)),
      Opcode::Stx => self.store(&instruction, self.rr(Register::X)),
      Opcode::Sty => self.store(&instruction, self.rr(Register::Y)),

      // Register transfers
      Opcode::Tax => self.load(Register::X, self.rr(Register::A)),
      Opcode::Tay => self.load(Register::Y, self.rr(Register::A)),
      Opcode::Txa => self.load(Register::A, self.rr(Register::X)),
      Opcode::Tya => self.load(Register::A, self.rr(Register::Y)),
      Opcode::Tsx => self.load(Register::X, self.rr(Register::SP)),
      // TXS is the only transfer that leaves the flags alone
      Opcode::Txs => self.rw(Register::SP, self.rr(Register::X)),

      // Stack
      Opcode::Pha => self.push(self.rr(Register::A)),
      Opcode::Php => {
        let bits = self.state.status.bits() | StatusFlags::BREAK | StatusFlags::UNUSED;
        self.push(bits);
      }
      Opcode::Pla => {
        let value = self.pull();
        self.load(Register::A, value);
      }
      Opcode::Plp => {
        let bits = self.pull() & !(StatusFlags::BREAK | StatusFlags::UNUSED);
        self.state.status = StatusFlags::from_bits(bits);
      }

      // Arithmetic
      Opcode::Adc => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.add_with_carry(value);
      }
      Opcode::Sbc => {
        // A - M - !C is A + !M + C in two's complement
        let value = self.read_operand(&instruction, &mut cycles);
        self.add_with_carry(!value);
      }
      Opcode::Cmp => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.compare(Register::A, value);
      }
      Opcode::Cpx => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.compare(Register::X, value);
      }
      Opcode::Cpy => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.compare(Register::Y, value);
      }

      // Logic
      Opcode::And => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.load(Register::A, self.rr(Register::A) & value);
      }
      Opcode::Ora => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.load(Register::A, self.rr(Register::A) | value);
      }
      Opcode::Eor => {
        let value = self.read_operand(&instruction, &mut cycles);
        self.load(Register::A, self.rr(Register::A) ^ value);
      }
      Opcode::Bit => {
        let value = self.read_operand(&instruction, &mut cycles);
        let a = self.rr(Register::A);
        let status = &mut self.state.status;
        status.set(StatusFlags::ZERO, a & value == 0);
        status.set(StatusFlags::NEGATIVE, value & 0x80 != 0);
        status.set(StatusFlags::OVERFLOW, value & 0x40 != 0);
      }

      // Increments and decrements
      Opcode::Inc => self.modify(&instruction, |rt, v| {
        let r = v.wrapping_add(1);
        rt.state.status.update_zn(r);
        r
      }),
      Opcode::Dec => self.modify(&instruction, |rt, v| {
        let r = v.wrapping_sub(1);
        rt.state.status.update_zn(r);
        r
      }),
      Opcode::Inx => self.load(Register::X, self.rr(Register::X).wrapping_add(1)),
      Opcode::Iny => self.load(Register::Y, self.rr(Register::Y).wrapping_add(1)),
      Opcode::Dex => self.load(Register::X, self.rr(Register::X).wrapping_sub(1)),
      Opcode::Dey => self.load(Register::Y, self.rr(Register::Y).wrapping_sub(1)),

      // Shifts and rotates
      Opcode::Asl => self.modify(&instruction, |rt, v| {
        let r = v << 1;
        rt.state.status.set(StatusFlags::CARRY, v & 0x80 != 0);
        rt.state.status.update_zn(r);
        r
      }),
      Opcode::Lsr => self.modify(&instruction, |rt, v| {
        let r = v >> 1;
        rt.state.status.set(StatusFlags::CARRY, v & 0x01 != 0);
        rt.state.status.update_zn(r);
        r
      }),
      Opcode::Rol => self.modify(&instruction, |rt, v| {
        let r = (v << 1) | rt.state.status.carry() as u8;
        rt.state.status.set(StatusFlags::CARRY, v & 0x80 != 0);
        rt.state.status.update_zn(r);
        r
      }),
      Opcode::Ror => self.modify(&instruction, |rt, v| {
        let r = (v >> 1) | ((rt.state.status.carry() as u8) << 7);
        rt.state.status.set(StatusFlags::CARRY, v & 0x01 != 0);
        rt.state.status.update_zn(r);
        r
      }),

      // Jumps and calls
      Opcode::Jmp => {
        next_pc = self.effective_address(&instruction).0;
      }
      Opcode::Jsr => {
        // the return address pushed is the last byte of the JSR itself
        self.push_u16(pc.wrapping_add(2));
        next_pc = instruction.word();
      }
      Opcode::Rts => {
        next_pc = self.pull_u16().wrapping_add(1);
      }
      Opcode::Brk => {
        // BRK skips a padding byte after the opcode
        self.push_u16(pc.wrapping_add(2));
        let bits = self.state.status.bits() | StatusFlags::BREAK | StatusFlags::UNUSED;
        self.push(bits);
        self.state.status.set(StatusFlags::INTERRUPT, true);
        next_pc = self.mr_u16(IRQ_VECTOR);
      }
      Opcode::Rti => {
        let bits = self.pull() & !(StatusFlags::BREAK | StatusFlags::UNUSED);
        self.state.status = StatusFlags::from_bits(bits);
        next_pc = self.pull_u16();
      }

      // Branches
      Opcode::Bcc => next_pc = self.branch(!self.state.status.carry(), pc, &instruction, &mut cycles),
      Opcode::Bcs => next_pc = self.branch(self.state.status.carry(), pc, &instruction, &mut cycles),
      Opcode::Bne => next_pc = self.branch(!self.state.status.zero(), pc, &instruction, &mut cycles),
      Opcode::Beq => next_pc = self.branch(self.state.status.zero(), pc, &instruction, &mut cycles),
      Opcode::Bpl => {
        next_pc = self.branch(!self.state.status.negative(), pc, &instruction, &mut cycles)
      }
      Opcode::Bmi => next_pc = self.branch(self.state.status.negative(), pc, &instruction, &mut cycles),
      Opcode::Bvc => {
        next_pc = self.branch(!self.state.status.overflow(), pc, &instruction, &mut cycles)
      }
      Opcode::Bvs => next_pc = self.branch(self.state.status.overflow(), pc, &instruction, &mut cycles),

      // Status flags
      Opcode::Clc => self.state.status.set(StatusFlags::CARRY, false),
      Opcode::Sec => self.state.status.set(StatusFlags::CARRY, true),
      Opcode::Cld => self.state.status.set(StatusFlags::DECIMAL, false),
      Opcode::Sed => self.state.status.set(StatusFlags::DECIMAL, true),
      Opcode::Cli => self.state.status.set(StatusFlags::INTERRUPT, false),
      Opcode::Sei => self.state.status.set(StatusFlags::INTERRUPT, true),
      Opcode::Clv => self.state.status.set(StatusFlags::OVERFLOW, false),

      Opcode::Nop => {}
    }

    self.state.pc = next_pc;
    self.state.clk += cycles;
    self.state.global_clk += 1;

    next_pc
  }

  fn mr_u16(&self, addr: Address) -> u16 {
    u16::from_le_bytes([self.mr(addr), self.mr(addr.wrapping_add(1))])
  }

  /// Fetch, decode and execute one instruction, resetting first if needed.
  pub fn step(&mut self) -> Result<Option<Event>, ExecutionError> {
    if !self.initialized {
      self.initialize()?;
    }
    let pc = self.state.pc;
    let opcode = self.mr(pc);
    let info = lookup(opcode).ok_or(ExecutionError::InvalidOpcode { pc, opcode })?;
    let bytes = [opcode, self.mr(pc.wrapping_add(1)), self.mr(pc.wrapping_add(2))];
    let instruction =
      decode(&bytes, pc).map_err(|_| ExecutionError::InvalidOpcode { pc, opcode })?;

    let next_pc = self.execute_instruction(pc, instruction, info.cycles);

    if self.breakpoints.contains(&next_pc) {
      return Ok(Some(Event::Break));
    }

    // Cycle checking is "lazy" here: it happens _after_ the instruction is executed.
    if self.max_cycles.is_some_and(|max_cycles| self.state.clk > max_cycles) {
      tracing::debug!("out of cycles");
      return Err(ExecutionError::OutOfCycles());
    }

    if next_pc == pc {
      tracing::debug!(pc = format_args!("0x{:04x}", pc), "HALT: idle loop");
      return Ok(Some(Event::Halted));
    }

    if !self.program.contains(next_pc) {
      tracing::warn!(
        pc = format_args!("0x{:04x}", next_pc),
        "program counter left the image"
      );
      return Err(ExecutionError::LeftImage(next_pc));
    }
    Ok(None)
  }

  pub(crate) fn cycles_left(&self) -> Option<u64> {
    self
      .max_cycles
      .map(|max_cycles| max_cycles.saturating_sub(self.state.clk))
  }

  fn apply_input(&mut self, input: &MemoryInput) {
    for (addr, bytes) in input.iter() {
      for (i, byte) in bytes.iter().enumerate() {
        self.mw(addr.wrapping_add(i as Address), *byte);
      }
    }
  }

  /// Load the image, apply queued input and run the reset sequence.
  pub fn initialize(&mut self) -> Result<(), ExecutionError> {
    if !self.program.fits_in_memory() {
      return Err(ExecutionError::InvalidMemoryAccess(
        self.program.load_address,
        MemoryErr::OutOfBounds,
      ));
    }

    tracing::info!("loading memory image");
    let program = Arc::clone(&self.program);
    self
      .state
      .memory
      .load(program.load_address, &program.image)
      .map_err(|e| ExecutionError::InvalidMemoryAccess(program.load_address, e))?;
    self.state.memory.write_u16(RES_VECTOR, program.pc_start);

    let input = std::mem::take(&mut self.input);
    self.apply_input(&input);

    // reset: interrupts masked, stack pointer three bytes below the top
    self.state.status = StatusFlags::from_bits(StatusFlags::INTERRUPT);
    self.rw(Register::SP, 0xFD);
    self.state.pc = self.mr_u16(RES_VECTOR);
    self.state.clk = RESET_CYCLES;
    self.state.global_clk = 0;
    self.initialized = true;
    Ok(())
  }

  pub(crate) fn jump_to_symbol(&mut self, symbol_name: &str) -> Result<(), ExecutionError> {
    // Make sure the symbol exists, and set the program counter
    let offset = match self.program.symbol_table.get(symbol_name) {
      Some(offset) => *offset,
      None => return Err(ExecutionError::UnknownSymbol()),
    };
    self.state.pc = offset;
    Ok(())
  }

  /// Execute starting at a named label. Does the same work as execute().
  pub fn execute_from_symbol(&mut self, symbol_name: &str) -> Result<Option<u64>, ExecutionError> {
    if !self.initialized {
      self.initialize()?;
    }
    self.jump_to_symbol(symbol_name)?;
    self.execute()
  }

  /// Execute the program, returning remaining cycles. Execution will either
  /// reach the idle loop or produce an error. Leaving the loaded image is an
  /// error, so code reached only through patched memory does not run.
  pub fn execute(&mut self) -> Result<Option<u64>, ExecutionError> {
    // If it's the first run, load the program.
    if !self.initialized {
      tracing::info!("initializing");
      self.initialize()?;
    }

    tracing::info!("starting execution");
    // Loop until program finishes execution or until an error occurs, whichever comes first
    loop {
      match self.step()? {
        Some(Event::Halted) => break,
        Some(Event::Break) => return Err(ExecutionError::Breakpoint()),
        None => {}
      }
    }
    tracing::info!("execution finished");

    self.postprocess();

    Ok(self.cycles_left())
  }

  fn postprocess(&mut self) {
    tracing::info!(
      "finished execution clk = {} global_clk = {} pc = 0x{:04x}",
      self.state.clk,
      self.state.global_clk,
      self.state.pc
    );
    if !self.io_buf.is_empty() {
      tracing::info!("console: {}", String::from_utf8_lossy(&self.io_buf));
    }

    // Flush trace buf
    if let Some(ref mut buf) = self.trace_buf {
      if let Err(err) = buf.flush() {
        tracing::warn!(%err, "failed to flush trace file");
      }
    }
  }

  fn trace_execution(&mut self, pc: Address, instruction: &Instruction) {
    // Write the current program counter to the trace buffer for the cycle tracer.
    if let Some(ref mut buf) = self.trace_buf {
      if let Err(err) = buf.write_all(&pc.to_be_bytes()) {
        tracing::warn!(%err, "dropping trace file");
        self.trace_buf = None;
      }
    }

    tracing::trace!(
      clk = self.state.clk,
      global_clk = self.state.global_clk,
      pc = format_args!("0x{:04x}", pc),
      instruction = %instruction,
      registers = ?self.state.regs,
      status = ?self.state.status,
    );
  }
}

impl Bus for Runtime {
  fn read(&self, address: Address) -> u8 {
    self.mr(address)
  }

  fn write(&mut self, address: Address, value: u8) {
    self.mw(address, value)
  }
}

#[cfg(test)]
pub mod tests {
  use octet_interface::{Bus, CONSOLE_ADDRESS, FIB_INPUT_ADDRESS, FIB_RESULT_ADDRESS, IRQ_VECTOR};

  use super::{AddressMode, Event, ExecutionError, MockDevice, Opcode, Register, StatusFlags};
  use super::{Program, Runtime};
  use crate::instruction::{Instruction, Operand};
  use crate::io::MemoryInput;
  use crate::utils::{tests::assemble, with_max_cycles, OctetCoreOpts, FIBONACCI_PROGRAM};

  pub(crate) fn setup_logger() {
    let _ = tracing_subscriber::fmt()
      .with_test_writer()
      .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
      .try_init();
  }

  /// Assemble `instructions` at 0x1000, followed by an idle loop, and run them.
  fn run(instructions: &[Instruction]) -> Runtime {
    let program = assemble(0x1000, instructions);
    let mut runtime = Runtime::new(program, OctetCoreOpts::default());
    runtime.execute().unwrap();
    runtime
  }

  #[test]
  fn test_reset_state() {
    let mut runtime = Runtime::new(assemble(0x2000, &[]), OctetCoreOpts::default());
    runtime.initialize().unwrap();
    assert_eq!(runtime.state.pc, 0x2000);
    assert_eq!(runtime.register(Register::SP), 0xFD);
    assert_eq!(runtime.state.status.bits(), StatusFlags::INTERRUPT);
    assert_eq!(runtime.byte(0xFFFC), 0x00);
    assert_eq!(runtime.byte(0xFFFD), 0x20);
  }

  #[test]
  fn test_add() {
    //     clc
    //     lda #5
    //     adc #37
    let runtime = run(&[
      Instruction::implied(Opcode::Clc),
      Instruction::immediate(Opcode::Lda, 5),
      Instruction::immediate(Opcode::Adc, 37),
    ]);
    assert_eq!(runtime.register(Register::A), 42);
    assert!(!runtime.state.status.carry());
  }

  #[test]
  fn test_add_uses_carry_in() {
    // a carry left set by an earlier instruction leaks into the sum
    let runtime = run(&[
      Instruction::implied(Opcode::Sec),
      Instruction::immediate(Opcode::Lda, 5),
      Instruction::immediate(Opcode::Adc, 37),
    ]);
    assert_eq!(runtime.register(Register::A), 43);
  }

  #[test]
  fn test_add_wraps_and_sets_carry() {
    let runtime = run(&[
      Instruction::implied(Opcode::Clc),
      Instruction::immediate(Opcode::Lda, 233),
      Instruction::immediate(Opcode::Adc, 144),
    ]);
    assert_eq!(runtime.register(Register::A), 121);
    assert!(runtime.state.status.carry());
  }

  #[test]
  fn test_add_overflow_flag() {
    let runtime = run(&[
      Instruction::implied(Opcode::Clc),
      Instruction::immediate(Opcode::Lda, 0x50),
      Instruction::immediate(Opcode::Adc, 0x50),
    ]);
    assert_eq!(runtime.register(Register::A), 0xA0);
    assert!(runtime.state.status.overflow());
    assert!(runtime.state.status.negative());
  }

  #[test]
  fn test_sub() {
    //     sec
    //     lda #37
    //     sbc #5
    let runtime = run(&[
      Instruction::implied(Opcode::Sec),
      Instruction::immediate(Opcode::Lda, 37),
      Instruction::immediate(Opcode::Sbc, 5),
    ]);
    assert_eq!(runtime.register(Register::A), 32);
    // no borrow
    assert!(runtime.state.status.carry());
  }

  #[test]
  fn test_sub_borrow() {
    let runtime = run(&[
      Instruction::implied(Opcode::Sec),
      Instruction::immediate(Opcode::Lda, 0),
      Instruction::immediate(Opcode::Sbc, 1),
    ]);
    assert_eq!(runtime.register(Register::A), 0xFF);
    assert!(!runtime.state.status.carry());
    assert!(runtime.state.status.negative());
  }

  #[test]
  fn test_logic() {
    let runtime = run(&[
      Instruction::immediate(Opcode::Lda, 0b1100),
      Instruction::immediate(Opcode::And, 0b1010),
      Instruction::zero_page(Opcode::Sta, 0x10),
      Instruction::immediate(Opcode::Lda, 0b1100),
      Instruction::immediate(Opcode::Ora, 0b1010),
      Instruction::zero_page(Opcode::Sta, 0x11),
      Instruction::immediate(Opcode::Lda, 0b1100),
      Instruction::immediate(Opcode::Eor, 0b1010),
    ]);
    assert_eq!(runtime.byte(0x10), 0b1000);
    assert_eq!(runtime.byte(0x11), 0b1110);
    assert_eq!(runtime.register(Register::A), 0b0110);
  }

  #[test]
  fn test_shifts() {
    let runtime = run(&[
      Instruction::immediate(Opcode::Lda, 0x81),
      Instruction::new(Opcode::Asl, AddressMode::Accumulator, Operand::None),
      Instruction::zero_page(Opcode::Sta, 0x10),
      Instruction::new(Opcode::Rol, AddressMode::Accumulator, Operand::None),
      Instruction::zero_page(Opcode::Sta, 0x11),
      Instruction::zero_page(Opcode::Lsr, 0x11),
      Instruction::zero_page(Opcode::Ror, 0x10),
    ]);
    // ASL 0x81 -> 0x02, C=1; ROL 0x02 -> 0x05, C=0
    assert_eq!(runtime.register(Register::A), 0x05);
    // LSR 0x05 -> 0x02, C=1; ROR 0x02 -> 0x81, C=0
    assert_eq!(runtime.byte(0x11), 0x02);
    assert_eq!(runtime.byte(0x10), 0x81);
    assert!(!runtime.state.status.carry());
  }

  #[test]
  fn test_compare() {
    let runtime = run(&[
      Instruction::immediate(Opcode::Ldx, 10),
      Instruction::immediate(Opcode::Cpx, 10),
    ]);
    assert!(runtime.state.status.zero());
    assert!(runtime.state.status.carry());

    let runtime = run(&[
      Instruction::immediate(Opcode::Ldy, 3),
      Instruction::immediate(Opcode::Cpy, 4),
    ]);
    assert!(!runtime.state.status.zero());
    assert!(!runtime.state.status.carry());
    assert!(runtime.state.status.negative());
  }

  #[test]
  fn test_indexed_and_indirect_addressing() {
    let mut runtime = Runtime::new(
      assemble(
        0x1000,
        &[
          Instruction::immediate(Opcode::Ldx, 0x04),
          Instruction::immediate(Opcode::Ldy, 0x02),
          // ($20,X) -> pointer at $24 -> $3000
          Instruction::new(Opcode::Lda, AddressMode::IndirectX, Operand::Byte(0x20)),
          Instruction::zero_page(Opcode::Sta, 0x40),
          // ($24),Y -> $3000 + 2
          Instruction::new(Opcode::Lda, AddressMode::IndirectY, Operand::Byte(0x24)),
          Instruction::zero_page(Opcode::Sta, 0x41),
          // $2FFF,X -> $3003
          Instruction::new(Opcode::Lda, AddressMode::AbsoluteX, Operand::Word(0x2FFF)),
          Instruction::zero_page(Opcode::Sta, 0x42),
        ],
      ),
      OctetCoreOpts::default(),
    );
    let mut input = MemoryInput::new();
    input.write_slice(0x24, &[0x00, 0x30]);
    input.write_slice(0x3000, &[0xAA, 0xBB, 0xCC, 0xDD]);
    runtime.write_input(&input);
    runtime.execute().unwrap();

    assert_eq!(runtime.byte(0x40), 0xAA);
    assert_eq!(runtime.byte(0x41), 0xCC);
    assert_eq!(runtime.byte(0x42), 0xDD);
  }

  #[test]
  fn test_stack_and_subroutines() {
    // jsr sub ; lda #$11 ; [halt] ; sub: ldx #$22 ; rts
    let main = [
      Instruction::absolute(Opcode::Jsr, 0x1008),
      Instruction::immediate(Opcode::Lda, 0x11),
      Instruction::absolute(Opcode::Jmp, 0x1005),
      Instruction::immediate(Opcode::Ldx, 0x22),
      Instruction::implied(Opcode::Rts),
    ];
    let mut image = Vec::new();
    for instruction in main {
      image.extend(instruction.to_bytes().unwrap());
    }
    let mut runtime = Runtime::new(Program::new(image, 0x1000, 0x1000), Default::default());
    runtime.execute().unwrap();

    assert_eq!(runtime.register(Register::X), 0x22);
    assert_eq!(runtime.register(Register::A), 0x11);
    assert_eq!(runtime.register(Register::SP), 0xFD);
    // return address is the last byte of the JSR
    assert_eq!(runtime.byte(0x01FD), 0x10);
    assert_eq!(runtime.byte(0x01FC), 0x02);
  }

  #[test]
  fn test_brk_and_rti() {
    // main: brk ; nop(padding) ; lda #$01 ; [halt]
    // handler at $1010: ldx #$07 ; rti
    let mut image = vec![0x00, 0xEA, 0xA9, 0x01, 0x4C, 0x04, 0x10];
    image.resize(0x10, 0xEA);
    image.extend([0xA2, 0x07, 0x40]);
    let mut runtime = Runtime::new(Program::new(image, 0x1000, 0x1000), Default::default());
    let mut input = MemoryInput::new();
    input.write_slice(IRQ_VECTOR, &[0x10, 0x10]);
    runtime.write_input(&input);
    runtime.execute().unwrap();

    assert_eq!(runtime.register(Register::X), 0x07);
    assert_eq!(runtime.register(Register::A), 0x01);
    // pushed status carries B and bit 5
    assert_eq!(runtime.byte(0x01FB) & 0x30, 0x30);
    assert_eq!(runtime.state.status.bits() & StatusFlags::BREAK, 0);
  }

  #[test]
  fn test_jmp_indirect_page_wrap() {
    // pointer at $10FF reads its high byte from $1000, not $1100
    let mut image = vec![0x6C, 0xFF, 0x10];
    image.resize(0xFF, 0xEA);
    image.push(0x20); // $10FF: low byte of target
    let mut runtime = Runtime::new(Program::new(image, 0x1000, 0x1000), Default::default());
    runtime.initialize().unwrap();
    // high byte comes from $1000 which holds the JMP opcode itself
    assert_eq!(runtime.step(), Err(ExecutionError::LeftImage(0x6C20)));
    assert_eq!(runtime.state.pc, 0x6C20);
  }

  #[test]
  fn test_invalid_opcode() {
    let program = Program::new(vec![0x02], 0x1000, 0x1000);
    let mut runtime = Runtime::new(program, OctetCoreOpts::default());
    assert_eq!(
      runtime.execute(),
      Err(ExecutionError::InvalidOpcode {
        pc: 0x1000,
        opcode: 0x02
      })
    );
  }

  #[test]
  fn test_halts_on_idle_loop() {
    let mut runtime = Runtime::new(assemble(0x1000, &[]), OctetCoreOpts::default());
    runtime.initialize().unwrap();
    assert_eq!(runtime.step(), Ok(Some(Event::Halted)));
    assert_eq!(runtime.state.pc, 0x1000);
  }

  #[test]
  fn test_leaving_image_is_an_error() {
    let program = Program::new(vec![0xEA, 0xEA], 0x1000, 0x1000);
    let mut runtime = Runtime::new(program, OctetCoreOpts::default());
    assert_eq!(runtime.execute(), Err(ExecutionError::LeftImage(0x1002)));
    assert_eq!(runtime.state.pc, 0x1002);
    assert_eq!(runtime.state.global_clk, 2);
  }

  #[test]
  fn test_step_resets_first() {
    let program = Program::new(FIBONACCI_PROGRAM.to_vec(), 0x1000, 0x1000);
    let mut runtime = Runtime::new(program, OctetCoreOpts::default());
    assert_eq!(runtime.step(), Ok(None));
    // LDA #0 at $1000
    assert_eq!(runtime.state.pc, 0x1002);
    assert_eq!(runtime.register(Register::SP), 0xFD);
    assert_eq!(runtime.state.clk, 9);
    assert_eq!(runtime.state.global_clk, 1);
  }

  #[test]
  fn test_cycles() {
    // reset (7) + LDA # (2) + ADC # (2) + JMP (3)
    let instructions = [
      Instruction::immediate(Opcode::Lda, 5),
      Instruction::immediate(Opcode::Adc, 37),
    ];

    // failure
    let mut runtime = Runtime::new(
      assemble(0x1000, &instructions),
      OctetCoreOpts::default().with_options(vec![with_max_cycles(13)]),
    );
    assert!(matches!(runtime.execute(), Err(ExecutionError::OutOfCycles())));

    // success
    let mut runtime = Runtime::new(
      assemble(0x1000, &instructions),
      OctetCoreOpts::default().with_options(vec![with_max_cycles(14)]),
    );
    assert_eq!(runtime.execute().unwrap(), Some(0));

    // success
    let mut runtime = Runtime::new(
      assemble(0x1000, &instructions),
      OctetCoreOpts::default().with_options(vec![with_max_cycles(15)]),
    );
    assert_eq!(runtime.execute().unwrap(), Some(1));

    // the largest budget is not exhausted
    let mut runtime = Runtime::new(
      assemble(0x1000, &instructions),
      OctetCoreOpts::default().with_options(vec![with_max_cycles(u64::MAX)]),
    );
    assert_eq!(runtime.execute().unwrap(), Some(u64::MAX - 14));

    // unbounded
    let mut runtime = Runtime::new(assemble(0x1000, &instructions), OctetCoreOpts::default());
    assert_eq!(runtime.execute().unwrap(), None);
    assert_eq!(runtime.state.clk, 14);
  }

  #[test]
  fn test_page_crossing_costs_a_cycle() {
    let mut runtime = Runtime::new(
      assemble(
        0x1000,
        &[
          Instruction::immediate(Opcode::Ldx, 0x01),
          Instruction::new(Opcode::Lda, AddressMode::AbsoluteX, Operand::Word(0x20FF)),
        ],
      ),
      OctetCoreOpts::default(),
    );
    runtime.execute().unwrap();
    // reset 7 + LDX 2 + LDA abs,X 4+1 + JMP 3
    assert_eq!(runtime.state.clk, 17);
  }

  #[test]
  fn test_taken_branch_costs_a_cycle() {
    // ldx #1 ; dex ; beq +0 (taken, falls onto the idle loop)
    let runtime = run(&[
      Instruction::immediate(Opcode::Ldx, 1),
      Instruction::implied(Opcode::Dex),
      Instruction::relative(Opcode::Beq, 0),
    ]);
    // reset 7 + LDX 2 + DEX 2 + BEQ 2+1 + JMP 3
    assert_eq!(runtime.state.clk, 17);
  }

  #[test]
  fn test_breakpoint() {
    let mut runtime = Runtime::new(
      assemble(0x1000, &[Instruction::implied(Opcode::Nop)]),
      OctetCoreOpts::default(),
    );
    runtime.add_breakpoint(0x1001);
    assert_eq!(runtime.execute(), Err(ExecutionError::Breakpoint()));
    assert_eq!(runtime.state.pc, 0x1001);

    runtime.remove_breakpoint(0x1001);
    assert_eq!(runtime.execute(), Ok(None));
  }

  #[test]
  fn test_console_output() {
    let runtime = run(&[
      Instruction::immediate(Opcode::Lda, b'h'),
      Instruction::absolute(Opcode::Sta, CONSOLE_ADDRESS),
      Instruction::immediate(Opcode::Lda, b'i'),
      Instruction::absolute(Opcode::Sta, CONSOLE_ADDRESS),
    ]);
    assert_eq!(runtime.io_buf, b"hi");
    assert_eq!(runtime.byte(CONSOLE_ADDRESS), 0);
  }

  #[test]
  fn test_device_routing() {
    let mut device = MockDevice::new();
    device.expect_read().return_const(0x5Au8);
    device
      .expect_write()
      .withf(|addr, value| *addr == 0xB001 && *value == 0x5A)
      .once()
      .return_const(());

    let mut runtime = Runtime::new(
      assemble(
        0x1000,
        &[
          Instruction::absolute(Opcode::Lda, 0xB000),
          Instruction::absolute(Opcode::Sta, 0xB001),
        ],
      ),
      OctetCoreOpts::default(),
    );
    runtime
      .register_device(0xB000..=0xB0FF, Box::new(device))
      .unwrap();
    runtime.execute().unwrap();
    assert_eq!(runtime.register(Register::A), 0x5A);
    // RAM underneath the device is untouched
    assert_eq!(runtime.byte(0xB001), 0);
  }

  #[test]
  fn test_execute_from_symbol() {
    let program = assemble(
      0x1000,
      &[
        Instruction::immediate(Opcode::Lda, 1),
        Instruction::immediate(Opcode::Lda, 2),
      ],
    )
    .with_symbols([("second".to_string(), 0x1002)].into());

    let mut runtime = Runtime::new(program.clone(), OctetCoreOpts::default());
    runtime.execute_from_symbol("second").unwrap();
    assert_eq!(runtime.register(Register::A), 2);
    assert_eq!(runtime.state.global_clk, 2);

    let mut runtime = Runtime::new(program, OctetCoreOpts::default());
    assert_eq!(
      runtime.execute_from_symbol("missing"),
      Err(ExecutionError::UnknownSymbol())
    );
  }

  #[test]
  fn test_fibonacci_program() {
    setup_logger();

    for (n, expected) in [(1u8, 1u8), (2, 1), (3, 2), (10, 55), (14, 121)] {
      let program = Program::new(FIBONACCI_PROGRAM.to_vec(), 0x1000, 0x1000);
      let mut runtime = Runtime::new(program, OctetCoreOpts::default());
      let mut input = MemoryInput::new();
      input.write_byte(FIB_INPUT_ADDRESS, n);
      runtime.write_input(&input);
      runtime.execute().unwrap();
      assert_eq!(runtime.read(FIB_RESULT_ADDRESS), expected, "N = {n}");
    }
  }

  #[test]
  fn test_fibonacci_program_leaves_result_alone_for_zero() {
    let program = Program::new(FIBONACCI_PROGRAM.to_vec(), 0x1000, 0x1000);
    let mut runtime = Runtime::new(program, OctetCoreOpts::default());
    let mut input = MemoryInput::new();
    input.write_byte(FIB_INPUT_ADDRESS, 0);
    input.write_byte(FIB_RESULT_ADDRESS, 0xEE);
    runtime.write_input(&input);
    runtime.execute().unwrap();
    assert_eq!(runtime.read(FIB_RESULT_ADDRESS), 0xEE);
  }
}
