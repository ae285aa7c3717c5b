mod instruction;

pub use instruction::*;

use std::{fs::File, io::Read, path::Path};

use anyhow::Context;
use octet_interface::{Address, LOAD_ADDRESS, MEMORY_SIZE};

use crate::runtime::Program;

/// Leading bytes of a container image.
pub const MAGIC: &[u8; 4] = b"\x7fOCT";

/// Magic, load address and start address.
const HEADER_LEN: usize = MAGIC.len() + 4;

impl Program {
  /// Load a program from an image. Input starting with the magic number is
  /// a container image. Anything else is raw machine code loaded and started
  /// at `LOAD_ADDRESS`.
  pub fn from(input: &[u8]) -> anyhow::Result<Self> {
    anyhow::ensure!(!input.is_empty(), "empty input");

    let program = if input.starts_with(MAGIC) {
      anyhow::ensure!(input.len() >= HEADER_LEN, "truncated image header");
      let load_address = Address::from_le_bytes([input[4], input[5]]);
      let pc_start = Address::from_le_bytes([input[6], input[7]]);
      Program::new(input[HEADER_LEN..].to_vec(), load_address, pc_start)
    } else {
      Program::new(input.to_vec(), LOAD_ADDRESS, LOAD_ADDRESS)
    };

    anyhow::ensure!(!program.image.is_empty(), "image has no code");
    anyhow::ensure!(
      program.fits_in_memory(),
      "image of {} bytes at {:#06x} does not fit in {} bytes of memory",
      program.image.len(),
      program.load_address,
      MEMORY_SIZE
    );
    Ok(program)
  }

  /// Load a program from a file path.
  pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
    let path = path.as_ref();
    let mut code = Vec::new();
    File::open(path)
      .with_context(|| format!("failed to open {}", path.display()))?
      .read_to_end(&mut code)
      .with_context(|| format!("failed to read {}", path.display()))?;
    Program::from(&code).with_context(|| format!("malformed image {}", path.display()))
  }

  /// Serialize into a container image. The symbol table is not kept.
  pub fn to_bytes(&self) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(HEADER_LEN + self.image.len());
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&self.load_address.to_le_bytes());
    bytes.extend_from_slice(&self.pc_start.to_le_bytes());
    bytes.extend_from_slice(&self.image);
    bytes
  }
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;
  use crate::utils::FIBONACCI_PROGRAM;

  #[test]
  fn raw_binaries_load_at_the_default_address() {
    let program = Program::from(FIBONACCI_PROGRAM).unwrap();
    assert_eq!(program.load_address, LOAD_ADDRESS);
    assert_eq!(program.pc_start, LOAD_ADDRESS);
    assert_eq!(program.image, FIBONACCI_PROGRAM);
  }

  #[test]
  fn container_header_is_honored() {
    let program = Program::new(vec![0xEA, 0x4C, 0x01, 0x20], 0x2000, 0x2001);
    let bytes = program.to_bytes();
    assert_eq!(&bytes[..8], b"\x7fOCT\x00\x20\x01\x20");
    assert_eq!(Program::from(&bytes).unwrap(), program);
  }

  #[test]
  fn malformed_inputs_are_rejected() {
    assert!(Program::from(&[]).is_err());
    assert!(Program::from(b"\x7fOCT\x00").is_err());
    assert!(Program::from(b"\x7fOCT\x00\x10\x00\x10").is_err());

    let mut oversized = MAGIC.to_vec();
    oversized.extend([0xF0, 0xFF, 0xF0, 0xFF]);
    oversized.extend([0xEA; 0x11]);
    assert!(Program::from(&oversized).is_err());
  }

  #[test]
  fn from_file_reads_images() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file
      .write_all(&Program::new(vec![0xEA], 0x3000, 0x3000).to_bytes())
      .unwrap();
    let program = Program::from_file(file.path()).unwrap();
    assert_eq!(program.load_address, 0x3000);

    assert!(Program::from_file("/nonexistent/image.bin").is_err());
  }
}
