use anyhow::Result;
use clap::{Parser, Subcommand};
use octet_cli::{
  commands::{
    assemble::AssembleCmd, disassemble::DisassembleCmd, fib::FibCmd, run::RunCmd,
  },
  OCTET_VERSION_MESSAGE,
};

#[derive(Parser)]
#[command(name = "octet", author, about, long_about = None, args_conflicts_with_subcommands = true, version = OCTET_VERSION_MESSAGE)]
pub struct OctetCli {
  #[clap(subcommand)]
  pub command: Option<OctetCliCommands>,

  #[clap(flatten)]
  pub run: RunCmd,
}

#[derive(Subcommand)]
pub enum OctetCliCommands {
  Run(RunCmd),
  Assemble(AssembleCmd),
  Disassemble(DisassembleCmd),
  Fib(FibCmd),
}

fn main() -> Result<()> {
  let args = OctetCli::parse();
  let command = args.command.unwrap_or(OctetCliCommands::Run(args.run));
  match command {
    OctetCliCommands::Run(cmd) => cmd.run(),
    OctetCliCommands::Assemble(cmd) => cmd.run(),
    OctetCliCommands::Disassemble(cmd) => cmd.run(),
    OctetCliCommands::Fib(cmd) => cmd.run(),
  }
}
