use std::collections::BTreeMap;

use octet_interface::{Address, MEMORY_SIZE};
use serde::{Deserialize, Serialize};

/// A program that can be executed by the VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
  /// The raw bytes copied into memory before execution.
  pub image: Vec<u8>,

  /// Where the first byte of `image` lands.
  pub load_address: Address,

  /// The start address of the program, written into the reset vector.
  pub pc_start: Address,

  /// Symbol table.
  /// Used to start execution at a label.
  pub symbol_table: BTreeMap<String, Address>,
}

impl Program {
  /// Create a new program.
  pub const fn new(image: Vec<u8>, load_address: Address, pc_start: Address) -> Self {
    Self {
      image,
      load_address,
      pc_start,
      symbol_table: BTreeMap::new(),
    }
  }

  pub fn with_symbols(mut self, symbol_table: BTreeMap<String, Address>) -> Self {
    self.symbol_table = symbol_table;
    self
  }

  /// Whether `address` falls inside the loaded image.
  pub fn contains(&self, address: Address) -> bool {
    let start = self.load_address as usize;
    let address = address as usize;
    address >= start && address < start + self.image.len()
  }

  pub(crate) fn fits_in_memory(&self) -> bool {
    self.load_address as usize + self.image.len() <= MEMORY_SIZE
  }
}
