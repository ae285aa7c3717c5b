use std::fmt;

use octet_interface::{Address, Bus, MEMORY_SIZE};

use super::MemoryErr;

/// The flat 64 KiB address space instructions operate over.
#[derive(Clone, PartialEq, Eq)]
pub struct Memory {
  data: Box<[u8; MEMORY_SIZE]>,
}

impl Memory {
  pub fn new() -> Self {
    Self {
      data: Box::new([0; MEMORY_SIZE]),
    }
  }

  /// Copy `bytes` into memory starting at `address`.
  pub fn load(&mut self, address: Address, bytes: &[u8]) -> Result<(), MemoryErr> {
    let start = address as usize;
    let end = start + bytes.len();
    if end > MEMORY_SIZE {
      return Err(MemoryErr::OutOfBounds);
    }
    self.data[start..end].copy_from_slice(bytes);
    Ok(())
  }
}

impl Default for Memory {
  fn default() -> Self {
    Self::new()
  }
}

impl Bus for Memory {
  fn read(&self, address: Address) -> u8 {
    self.data[address as usize]
  }

  fn write(&mut self, address: Address, value: u8) {
    self.data[address as usize] = value;
  }
}

impl fmt::Debug for Memory {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    // the zero page holds the working state of small programs
    write!(f, "Memory {{ zp: {} }}", hex::encode(&self.data[..0x100]))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn load_and_read_back() {
    let mut memory = Memory::new();
    memory.load(0x1000, &[0xA9, 0x01]).unwrap();
    assert_eq!(memory.read(0x1000), 0xA9);
    assert_eq!(memory.read(0x1001), 0x01);
    assert_eq!(memory.read_u16(0x1000), 0x01A9);
  }

  #[test]
  fn load_fills_up_to_the_last_byte() {
    let mut memory = Memory::new();
    memory.load(0xFFFE, &[1, 2]).unwrap();
    assert_eq!(memory.read_u16(0xFFFE), 0x0201);
  }

  #[test]
  fn load_past_the_end_fails() {
    let mut memory = Memory::new();
    assert_eq!(memory.load(0xFFFF, &[1, 2]), Err(MemoryErr::OutOfBounds));
  }

  #[test]
  fn debug_dumps_the_zero_page() {
    let mut memory = Memory::new();
    memory.write(0x01, 0xAB);
    memory.write(0x0100, 0xCD);
    let dump = format!("{memory:?}");
    assert!(dump.starts_with("Memory { zp: 00ab00"));
    assert!(!dump.contains("cd"));
  }
}
