use std::{env, path::PathBuf, time::Instant};

use anstyle::*;
use anyhow::{Context, Result};
use clap::Parser;
use octet_core::io::MemoryInput;
use octet_core::runtime::{Program, Register, Runtime};
use octet_core::utils::{setup_logger, setup_tracer, with_max_cycles, OctetCoreOpts, FIBONACCI_PROGRAM};
use octet_interface::{Address, FIB_INPUT_ADDRESS, FIB_RESULT_ADDRESS};

use crate::util::{elapsed, load_program, parse_address, parse_byte, write_status, Poke};

#[derive(Parser)]
#[command(
  name = "run",
  about = "(default) Run a program on the emulated CPU",
  long_about = "(default) Run a program on the emulated CPU until it reaches an idle loop \
                (a jump to itself). Jumping outside the loaded image is reported as an error."
)]
pub struct RunCmd {
  /// Assembly source (.s, .asm) or image. Runs the bundled Fibonacci program when omitted.
  program: Option<PathBuf>,

  /// Byte stored at the input address before execution.
  #[clap(long, value_parser = parse_byte)]
  input: Option<u8>,

  #[clap(long, value_parser = parse_address, default_value = "0x0099")]
  input_address: Address,

  /// Cell reported after execution.
  #[clap(long, value_parser = parse_address, default_value = "0x0104")]
  result_address: Address,

  /// Extra memory patches, `ADDR=HEXBYTES`.
  #[clap(long, value_parser)]
  poke: Vec<Poke>,

  /// Cycle budget, including the 7 reset cycles.
  #[clap(long, env = "OCTET_MAX_CYCLES")]
  max_cycles: Option<u64>,

  #[clap(long, action)]
  profile: bool,

  #[clap(long, action)]
  verbose: bool,
}

impl RunCmd {
  pub fn run(&self) -> Result<()> {
    if !self.profile {
      if env::var("RUST_LOG").is_err() {
        env::set_var("RUST_LOG", "info");
      }
      setup_logger();
    } else {
      if env::var("RUST_TRACER").is_err() {
        env::set_var("RUST_TRACER", "info");
      }
      setup_tracer();
    }

    let runtime = self.execute()?;

    let green = AnsiColor::Green.on_default().effects(Effects::BOLD);
    write_status(
      &green,
      "Result",
      &format!(
        "${:04X} = {}",
        self.result_address,
        runtime.byte(self.result_address)
      ),
    );
    write_status(
      &green,
      "Finished",
      &format!(
        "{} instructions, {} cycles",
        runtime.state.global_clk, runtime.state.clk
      ),
    );
    if !runtime.io_buf.is_empty() {
      write_status(&green, "Console", &String::from_utf8_lossy(&runtime.io_buf));
    }
    if self.verbose {
      let cyan = AnsiColor::Cyan.on_default();
      write_status(
        &cyan,
        "Registers",
        &format!(
          "PC=${:04X} A=${:02X} X=${:02X} Y=${:02X} SP=${:02X} P={:?}",
          runtime.state.pc,
          runtime.register(Register::A),
          runtime.register(Register::X),
          runtime.register(Register::Y),
          runtime.register(Register::SP),
          runtime.state.status,
        ),
      );
    }
    Ok(())
  }

  /// Load, patch and run the program to its idle loop.
  fn execute(&self) -> Result<Runtime> {
    let program = match &self.program {
      Some(path) => load_program(path)?,
      None => Program::from(FIBONACCI_PROGRAM)?,
    };

    let opts = match self.max_cycles {
      Some(max_cycles) => OctetCoreOpts::new().with_options([with_max_cycles(max_cycles)]),
      None => OctetCoreOpts::new(),
    };
    let mut runtime = Runtime::new(program, opts);

    let mut input = MemoryInput::new();
    if let Some(n) = self.input {
      input.write_byte(self.input_address, n);
    }
    for poke in &self.poke {
      input.write_slice(poke.address, &poke.bytes);
    }
    runtime.write_input(&input);

    let start_time = Instant::now();
    runtime.execute().context("execution failed")?;
    tracing::info!(elapsed = %elapsed(start_time.elapsed()), "executed");
    Ok(runtime)
  }
}

impl Default for RunCmd {
  fn default() -> Self {
    Self {
      program: None,
      input: None,
      input_address: FIB_INPUT_ADDRESS,
      result_address: FIB_RESULT_ADDRESS,
      poke: Vec::new(),
      max_cycles: None,
      profile: false,
      verbose: false,
    }
  }
}
