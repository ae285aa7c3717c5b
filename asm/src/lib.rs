//! A two-pass assembler for the Octet CPU.
//!
//! ```text
//! %define RESULT $0104
//! N = $99
//!         .org $1000
//! start:  lda N
//!         sta RESULT
//! done:   jmp done
//! ```

mod assembler;
mod error;
mod parser;
mod preprocessor;
mod token;

use std::path::Path;

use anyhow::Context;

pub use assembler::{assemble, Assembly, ENTRY_LABEL};
pub use error::{AsmError, ErrorKind, Pos};
pub use preprocessor::RECURSION_LIMIT;

/// Assemble a source file from disk.
pub fn assemble_file(path: impl AsRef<Path>) -> anyhow::Result<Assembly> {
  let path = path.as_ref();
  let source = std::fs::read_to_string(path)
    .with_context(|| format!("failed to read {}", path.display()))?;
  assemble(&source).with_context(|| format!("failed to assemble {}", path.display()))
}
