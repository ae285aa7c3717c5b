use super::{Memory, Registers, StatusFlags};

/// Holds data describing the current state of a program's execution.
#[derive(Debug, Clone)]
pub struct ExecutionState {
  /// The global clock keeps track of how many instructions have been executed.
  pub global_clk: u64,

  /// The clock counts CPU cycles, including page-crossing and branch penalties.
  pub clk: u64,

  /// The program counter.
  pub pc: u16,

  /// The processor status flags.
  pub status: StatusFlags,

  /// The memory which instructions operate over.
  pub memory: Memory,

  pub(crate) regs: Registers,
}

impl ExecutionState {
  pub fn new(pc_start: u16) -> Self {
    Self {
      global_clk: 0,
      clk: 0,
      pc: pc_start,
      status: StatusFlags::new(),
      memory: Memory::new(),
      regs: Registers::new(),
    }
  }
}
