//! The Fibonacci Computer, natively.
//!
//! Reads `N` from one memory cell, rolls two accumulators `N - 1` times and
//! writes the last one to the result cell. Arithmetic wraps at 256.

use octet_interface::{Address, Bus, FIB_INPUT_ADDRESS, FIB_RESULT_ADDRESS};
use serde::{Deserialize, Serialize};

/// Carry fed into each addition of the loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarryIn {
  /// Every addition starts with a zero carry.
  #[default]
  Cleared,
  /// The carry is never cleared. The first addition sees the carry set by the
  /// `N - 1` subtraction and each later one the carry out of its predecessor.
  /// This is what `FIBONACCI_LEGACY_PROGRAM` computes.
  Inherited,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FibonacciComputer {
  pub input: Address,
  pub result: Address,
  pub carry_in: CarryIn,
}

impl Default for FibonacciComputer {
  fn default() -> Self {
    Self::new()
  }
}

impl FibonacciComputer {
  pub const fn new() -> Self {
    Self {
      input: FIB_INPUT_ADDRESS,
      result: FIB_RESULT_ADDRESS,
      carry_in: CarryIn::Cleared,
    }
  }

  pub const fn with_addresses(mut self, input: Address, result: Address) -> Self {
    self.input = input;
    self.result = result;
    self
  }

  pub const fn with_carry_in(mut self, carry_in: CarryIn) -> Self {
    self.carry_in = carry_in;
    self
  }

  /// Compute `F(N) mod 256` into the result cell. Returns `None`, leaving the
  /// result cell alone, when `N == 0`. Returning stands for the idle state.
  pub fn run(&self, bus: &mut impl Bus) -> Option<u8> {
    let n = bus.read(self.input);
    let Some(iterations) = n.checked_sub(1) else {
      tracing::debug!("N = 0, result left untouched");
      return None;
    };

    let (mut f0, mut f1) = (0u8, 1u8);
    // the subtraction above never borrows here, so the inherited carry starts set
    let mut carry = self.carry_in == CarryIn::Inherited;
    for _ in 0..iterations {
      let (sum, overflow_a) = f0.overflowing_add(f1);
      let (sum, overflow_b) = sum.overflowing_add(carry as u8);
      if self.carry_in == CarryIn::Inherited {
        carry = overflow_a || overflow_b;
      }
      f0 = f1;
      f1 = sum;
    }

    tracing::debug!(n, result = f1, carry_in = ?self.carry_in, "fibonacci");
    bus.write(self.result, f1);
    Some(f1)
  }
}

/// `F(n) mod 256` with `F(0) = 0` and `F(1) = F(2) = 1`.
pub fn fib_mod256(n: u8) -> u8 {
  let (mut a, mut b) = (0u8, 1u8);
  for _ in 0..n {
    (a, b) = (b, a.wrapping_add(b));
  }
  a
}

#[cfg(test)]
mod tests {
  use mockall::predicate::eq;
  use octet_interface::{MockBus, MEMORY_SIZE};

  use super::*;
  use crate::runtime::Memory;

  fn run_with(computer: FibonacciComputer, n: u8) -> (Option<u8>, Memory) {
    let mut memory = Memory::new();
    memory.write(computer.input, n);
    let out = computer.run(&mut memory);
    (out, memory)
  }

  #[test]
  fn known_values() {
    for (n, expected) in [(1, 1), (2, 1), (3, 2), (4, 3), (10, 55), (13, 233), (14, 121)] {
      let (out, memory) = run_with(FibonacciComputer::new(), n);
      assert_eq!(out, Some(expected), "N = {n}");
      assert_eq!(memory.read(FIB_RESULT_ADDRESS), expected);
    }
  }

  #[test]
  fn agrees_with_reference_for_every_input() {
    for n in 1..=u8::MAX {
      let (out, _) = run_with(FibonacciComputer::new(), n);
      assert_eq!(out, Some(fib_mod256(n)), "N = {n}");
    }
  }

  #[test]
  fn zero_never_writes_result() {
    let mut bus = MockBus::new();
    bus
      .expect_read()
      .with(eq(FIB_INPUT_ADDRESS))
      .once()
      .return_const(0u8);
    bus.expect_write().never();
    assert_eq!(FibonacciComputer::new().run(&mut bus), None);
  }

  #[test]
  fn writes_result_exactly_once() {
    let mut bus = MockBus::new();
    bus.expect_read().return_const(10u8);
    bus
      .expect_write()
      .with(eq(FIB_RESULT_ADDRESS), eq(55u8))
      .once()
      .return_const(());
    assert_eq!(FibonacciComputer::new().run(&mut bus), Some(55));
  }

  #[test]
  fn custom_addresses() {
    let computer = FibonacciComputer::new().with_addresses(0x0200, 0x0201);
    let (out, memory) = run_with(computer, 7);
    assert_eq!(out, Some(13));
    assert_eq!(memory.read(0x0201), 13);
    assert_eq!(memory.read(FIB_RESULT_ADDRESS), 0);
  }

  #[test]
  fn inherited_carry_adds_one_from_the_first_iteration() {
    let computer = FibonacciComputer::new().with_carry_in(CarryIn::Inherited);
    // no loop, no addition
    assert_eq!(run_with(computer, 1).0, Some(1));
    // 0 + 1 + 1
    assert_eq!(run_with(computer, 2).0, Some(2));
    // 1 + 2
    assert_eq!(run_with(computer, 3).0, Some(3));
    // 2, 3, 5, 8, 13, 21, 34, 55, 89
    assert_eq!(run_with(computer, 10).0, Some(89));
    assert_ne!(run_with(computer, 10).0, run_with(FibonacciComputer::new(), 10).0);
  }

  #[test]
  fn inherited_carry_chains_overflow() {
    // 89 + 144 = 233, 144 + 233 = 377 wraps to 121 with carry out,
    // 233 + 121 + 1 = 355 wraps to 99
    let computer = FibonacciComputer::new().with_carry_in(CarryIn::Inherited);
    let mut sequence = Vec::new();
    for n in 1..=16 {
      sequence.push(run_with(computer, n).0.unwrap());
    }
    assert_eq!(&sequence[..12], &[1, 2, 3, 5, 8, 13, 21, 34, 55, 89, 144, 233]);
    assert_eq!(sequence[12], 121);
    assert_eq!(sequence[13], 99);
  }

  #[test]
  fn raw_arrays_are_buses() {
    let mut memory = [0u8; MEMORY_SIZE];
    memory[FIB_INPUT_ADDRESS as usize] = 12;
    assert_eq!(FibonacciComputer::new().run(&mut memory), Some(144));
    assert_eq!(memory[FIB_RESULT_ADDRESS as usize], 144);
  }

  #[test]
  fn reference_recurrence() {
    assert_eq!(fib_mod256(0), 0);
    assert_eq!(fib_mod256(1), 1);
    assert_eq!(fib_mod256(2), 1);
    assert_eq!(fib_mod256(14), 121);
  }
}
