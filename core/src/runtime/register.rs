use std::fmt;

/// An 8-bit register of the CPU. The 16-bit program counter lives in the
/// execution state and is not addressable as a `Register`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
  A = 0,
  X = 1,
  Y = 2,
  SP = 3,
}

impl TryFrom<u8> for Register {
  type Error = &'static str;
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Register::A),
      1 => Ok(Register::X),
      2 => Ok(Register::Y),
      3 => Ok(Register::SP),
      _ => Err("register out of bounds"),
    }
  }
}

#[derive(Clone, PartialEq, Eq)]
pub(crate) struct Registers {
  register_space: [u8; 4],
}

impl Registers {
  pub(crate) fn new() -> Self {
    Self {
      register_space: [0; 4],
    }
  }

  pub(crate) fn write(&mut self, reg: Register, value: u8) {
    self.register_space[reg as usize] = value;
  }

  pub(crate) fn read(&self, reg: Register) -> u8 {
    self.register_space[reg as usize]
  }
}

impl fmt::Debug for Registers {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "A={:02x} X={:02x} Y={:02x} SP={:02x}",
      self.read(Register::A),
      self.read(Register::X),
      self.read(Register::Y),
      self.read(Register::SP)
    )
  }
}

// Status Register
// |N|V| |B|D|I|Z|C|
//  7 6 5 4 3 2 1 0
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusFlags(u8);

impl StatusFlags {
  pub const CARRY: u8 = 1 << 0;
  pub const ZERO: u8 = 1 << 1;
  pub const INTERRUPT: u8 = 1 << 2;
  pub const DECIMAL: u8 = 1 << 3;
  pub const BREAK: u8 = 1 << 4;
  pub const UNUSED: u8 = 1 << 5;
  pub const OVERFLOW: u8 = 1 << 6;
  pub const NEGATIVE: u8 = 1 << 7;

  pub const fn new() -> Self {
    Self(0)
  }

  pub const fn from_bits(bits: u8) -> Self {
    Self(bits)
  }

  pub const fn bits(self) -> u8 {
    self.0
  }

  pub const fn contains(self, flag: u8) -> bool {
    self.0 & flag == flag
  }

  pub fn set(&mut self, flag: u8, value: bool) {
    if value {
      self.0 |= flag;
    } else {
      self.0 &= !flag;
    }
  }

  pub const fn carry(self) -> bool {
    self.contains(Self::CARRY)
  }

  pub const fn zero(self) -> bool {
    self.contains(Self::ZERO)
  }

  pub const fn decimal(self) -> bool {
    self.contains(Self::DECIMAL)
  }

  pub const fn overflow(self) -> bool {
    self.contains(Self::OVERFLOW)
  }

  pub const fn negative(self) -> bool {
    self.contains(Self::NEGATIVE)
  }

  /// Set Z and N from a result byte.
  pub fn update_zn(&mut self, value: u8) {
    self.set(Self::ZERO, value == 0);
    self.set(Self::NEGATIVE, value & 0x80 != 0);
  }
}

impl fmt::Debug for StatusFlags {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    const NAMES: [char; 8] = ['N', 'V', '-', 'B', 'D', 'I', 'Z', 'C'];
    for (i, name) in NAMES.iter().enumerate() {
      let bit = 7 - i;
      if self.0 & (1 << bit) != 0 {
        write!(f, "{name}")?;
      } else {
        write!(f, "{}", name.to_ascii_lowercase())?;
      }
    }
    Ok(())
  }
}
