mod logger;
mod options;
mod programs;

pub use logger::*;
pub use options::*;
pub use programs::*;

#[cfg(test)]
pub mod tests {
  use octet_interface::Address;

  use crate::instruction::Instruction;
  use crate::runtime::{Opcode, Program};

  /// Lay `instructions` out from `origin` and append an idle loop.
  pub fn assemble(origin: Address, instructions: &[Instruction]) -> Program {
    let mut image = Vec::new();
    for instruction in instructions {
      image.extend(instruction.to_bytes().unwrap());
    }
    let idle = origin + image.len() as Address;
    image.extend(Instruction::absolute(Opcode::Jmp, idle).to_bytes().unwrap());
    Program::new(image, origin, origin)
  }
}
