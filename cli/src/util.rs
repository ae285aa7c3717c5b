use std::{fmt::Display, path::Path, str::FromStr, time::Duration};

use anyhow::Result;
use octet_core::runtime::Program;
use octet_interface::Address;

/// Parse a number written in decimal, `0x` hex or `$` hex.
pub(crate) fn parse_number(s: &str) -> Result<u64, String> {
  let s = s.trim();
  let parsed = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix('$')) {
    u64::from_str_radix(hex, 16)
  } else {
    s.parse::<u64>()
  };
  parsed.map_err(|e| format!("invalid number '{s}': {e}"))
}

pub(crate) fn parse_byte(s: &str) -> Result<u8, String> {
  let value = parse_number(s)?;
  u8::try_from(value).map_err(|_| format!("{value} does not fit in a byte"))
}

pub(crate) fn parse_address(s: &str) -> Result<Address, String> {
  let value = parse_number(s)?;
  Address::try_from(value).map_err(|_| format!("{value:#x} is not a 16-bit address"))
}

/// Bytes to place in memory before execution, written `ADDR=HEXBYTES`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Poke {
  pub(crate) address: Address,
  pub(crate) bytes: Vec<u8>,
}

impl FromStr for Poke {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let (address, data) = s
      .split_once('=')
      .ok_or_else(|| "expected ADDR=HEXBYTES".to_string())?;
    let address = parse_address(address)?;
    let data = data.strip_prefix("0x").unwrap_or(data);
    let bytes = hex::decode(data).map_err(|e| e.to_string())?;
    if bytes.is_empty() {
      return Err("no bytes given".to_string());
    }
    Ok(Poke { address, bytes })
  }
}

/// Assembly sources are assembled, anything else is loaded as an image.
pub(crate) fn load_program(path: &Path) -> Result<Program> {
  match path.extension().and_then(|ext| ext.to_str()) {
    Some("s" | "asm") => Ok(octet_asm::assemble_file(path)?.into()),
    _ => Program::from_file(path),
  }
}

pub(crate) fn write_status(style: &dyn Display, status: &str, msg: &str) {
  println!("{style}{status:>12}{style:#} {msg}");
}

pub(crate) fn elapsed(duration: Duration) -> String {
  let secs = duration.as_secs();
  if secs >= 60 {
    format!("{}m {:02}s", secs / 60, secs % 60)
  } else {
    format!("{}.{:02}s", secs, duration.subsec_nanos() / 10_000_000)
  }
}
