pub mod commands;
mod util;

pub const OCTET_VERSION_MESSAGE: &str = concat!("octet ", env!("CARGO_PKG_VERSION"));
