/// Fibonacci of the byte at `$0099`, written to `$0104`.
pub const FIBONACCI_SOURCE: &str = include_str!("../../programs/fibonacci.s");

/// `FIBONACCI_SOURCE` assembled at `LOAD_ADDRESS`.
#[rustfmt::skip]
pub const FIBONACCI_PROGRAM: &[u8] = &[
  0xA9, 0x00, 0x85, 0x00, 0xA9, 0x01, 0x85, 0x01,
  0xA5, 0x99, 0x38, 0xE9, 0x01, 0x90, 0x16, 0xAA,
  0xF0, 0x0E, 0x18, 0xA5, 0x00, 0x65, 0x01, 0xA4,
  0x01, 0x84, 0x00, 0x85, 0x01, 0xCA, 0xD0, 0xF2,
  0xA5, 0x01, 0x8D, 0x04, 0x01, 0x4C, 0x25, 0x10,
];

/// The same routine without `CLC` in the loop. Its additions inherit the carry.
pub const FIBONACCI_LEGACY_SOURCE: &str = include_str!("../../programs/fibonacci_legacy.s");

#[rustfmt::skip]
pub const FIBONACCI_LEGACY_PROGRAM: &[u8] = &[
  0xA9, 0x00, 0x85, 0x00, 0xA9, 0x01, 0x85, 0x01,
  0xA5, 0x99, 0x38, 0xE9, 0x01, 0x90, 0x15, 0xAA,
  0xF0, 0x0D, 0xA5, 0x00, 0x65, 0x01, 0xA4, 0x01,
  0x84, 0x00, 0x85, 0x01, 0xCA, 0xD0, 0xF3, 0xA5,
  0x01, 0x8D, 0x04, 0x01, 0x4C, 0x24, 0x10,
];
