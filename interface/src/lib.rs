//! # Octet Interface
//!
//! A library with no heavy dependencies that includes the types, memory map and
//! traits shared by the emulator, the assembler and the tooling.

/// A 16-bit address on the 8-bit machine's bus.
pub type Address = u16;

/// Size of the addressable memory in bytes.
pub const MEMORY_SIZE: usize = 0x1_0000;

/// First byte of the hardware stack page.
pub const STACK_BASE: Address = 0x0100;

// System vectors, each holding a little-endian 16-bit address.
pub const NMI_VECTOR: Address = 0xFFFA;
pub const RES_VECTOR: Address = 0xFFFC;
pub const IRQ_VECTOR: Address = 0xFFFE;

/// Default origin of programs that come without a header.
pub const LOAD_ADDRESS: Address = 0x1000;

/// Write-only console cell. Bytes written here are collected as program output.
pub const CONSOLE_ADDRESS: Address = 0xA000;

/// Memory cell holding `N` for the Fibonacci routine.
pub const FIB_INPUT_ADDRESS: Address = 0x0099;

/// Memory cell receiving `fib(N) mod 256`.
pub const FIB_RESULT_ADDRESS: Address = 0x0104;

/// Anything that byte-addressable code can read from and write to.
#[mockall::automock]
pub trait Bus {
  fn read(&self, address: Address) -> u8;
  fn write(&mut self, address: Address, value: u8);

  /// Read a little-endian word. The high byte wraps around to address 0.
  fn read_u16(&self, address: Address) -> u16 {
    let lo = self.read(address);
    let hi = self.read(address.wrapping_add(1));
    u16::from_le_bytes([lo, hi])
  }

  /// Write a little-endian word. The high byte wraps around to address 0.
  fn write_u16(&mut self, address: Address, value: u16) {
    let [lo, hi] = value.to_le_bytes();
    self.write(address, lo);
    self.write(address.wrapping_add(1), hi);
  }
}

// bare RAM, no devices
impl Bus for [u8; MEMORY_SIZE] {
  fn read(&self, address: Address) -> u8 {
    self[address as usize]
  }

  fn write(&mut self, address: Address, value: u8) {
    self[address as usize] = value;
  }
}
