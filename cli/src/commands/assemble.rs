use std::path::PathBuf;

use anstyle::*;
use anyhow::{Context, Result};
use clap::Parser;
use octet_core::runtime::Program;

use crate::util::write_status;

#[derive(Parser)]
#[command(name = "assemble", about = "Assemble a source file into an image")]
pub struct AssembleCmd {
  source: PathBuf,

  /// Output image. Defaults to the source path with a `.bin` extension.
  #[clap(short, long)]
  output: Option<PathBuf>,
}

impl AssembleCmd {
  pub fn run(&self) -> Result<()> {
    let assembly = octet_asm::assemble_file(&self.source)?;
    let output = self
      .output
      .clone()
      .unwrap_or_else(|| self.source.with_extension("bin"));

    let len = assembly.bytes.len();
    let origin = assembly.origin;
    let program: Program = assembly.into();
    std::fs::write(&output, program.to_bytes())
      .with_context(|| format!("failed to write {}", output.display()))?;

    let green = AnsiColor::Green.on_default().effects(Effects::BOLD);
    write_status(
      &green,
      "Assembled",
      &format!(
        "{len} bytes at ${origin:04X}, entry ${:04X} -> {}",
        program.pc_start,
        output.display()
      ),
    );
    Ok(())
  }
}
