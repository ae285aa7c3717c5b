use octet_interface::Address;
use serde::{Deserialize, Serialize};

/// Memory patches applied after reset and before the first instruction.
/// This is how a program receives its input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryInput {
  /// Patches in the order they are applied. Later patches win.
  pub patches: Vec<(Address, Vec<u8>)>,
}

impl MemoryInput {
  /// Create a new, empty `MemoryInput`.
  pub const fn new() -> Self {
    Self {
      patches: Vec::new(),
    }
  }

  /// Create a `MemoryInput` holding a single patch.
  pub fn from(address: Address, data: &[u8]) -> Self {
    Self {
      patches: vec![(address, data.to_vec())],
    }
  }

  /// Write a single byte.
  pub fn write_byte(&mut self, address: Address, value: u8) {
    self.patches.push((address, vec![value]));
  }

  /// Write a slice of bytes starting at `address`. Wraps at the top of memory.
  pub fn write_slice(&mut self, address: Address, slice: &[u8]) {
    self.patches.push((address, slice.to_vec()));
  }

  /// Append every patch of `other`.
  pub fn extend(&mut self, other: &MemoryInput) {
    self.patches.extend(other.patches.iter().cloned());
  }

  pub fn iter(&self) -> impl Iterator<Item = (Address, &[u8])> {
    self
      .patches
      .iter()
      .map(|(address, data)| (*address, data.as_slice()))
  }

  pub fn is_empty(&self) -> bool {
    self.patches.is_empty()
  }
}
