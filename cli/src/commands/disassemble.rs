use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use octet_core::disassembler::listing;

use crate::util::load_program;

#[derive(Parser)]
#[command(name = "disassemble", about = "Print the listing of an image or source file")]
pub struct DisassembleCmd {
  image: PathBuf,
}

impl DisassembleCmd {
  pub fn run(&self) -> Result<()> {
    let program = load_program(&self.image)?;
    println!(
      "; load ${:04X}, entry ${:04X}",
      program.load_address, program.pc_start
    );
    print!("{}", listing(&program));
    Ok(())
  }
}
