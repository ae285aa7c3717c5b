use anstyle::*;
use anyhow::Result;
use clap::Parser;
use octet_core::fibonacci::{CarryIn, FibonacciComputer};
use octet_core::runtime::Memory;
use octet_interface::Bus;

use crate::util::{parse_byte, write_status};

#[derive(Parser)]
#[command(name = "fib", about = "Compute F(N) mod 256 without the emulator")]
pub struct FibCmd {
  #[clap(value_parser = parse_byte)]
  n: u8,

  /// Let each addition inherit the previous carry, like the legacy routine.
  #[clap(long, action)]
  inherit_carry: bool,
}

impl FibCmd {
  pub fn compute(&self) -> Option<u8> {
    let carry_in = if self.inherit_carry {
      CarryIn::Inherited
    } else {
      CarryIn::Cleared
    };
    let computer = FibonacciComputer::new().with_carry_in(carry_in);
    let mut memory = Memory::new();
    memory.write(computer.input, self.n);
    computer.run(&mut memory)
  }

  pub fn run(&self) -> Result<()> {
    let green = AnsiColor::Green.on_default().effects(Effects::BOLD);
    match self.compute() {
      Some(result) => write_status(&green, "Result", &format!("F({}) mod 256 = {result}", self.n)),
      None => write_status(&green, "Result", "N = 0, result cell left untouched"),
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn carry_modes() {
    let cmd = |n, inherit_carry| FibCmd { n, inherit_carry }.compute();
    assert_eq!(cmd(14, false), Some(121));
    assert_eq!(cmd(0, false), None);
    assert_eq!(cmd(2, true), Some(2));
  }
}
