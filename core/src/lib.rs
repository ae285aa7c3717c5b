#![allow(
  clippy::new_without_default,
  clippy::unnecessary_cast,
  clippy::len_without_is_empty,
  clippy::type_complexity
)]
#![warn(unused_extern_crates)]

pub mod disassembler;
pub mod fibonacci;
pub mod instruction;
pub mod io;
pub mod runtime;
pub mod utils;
