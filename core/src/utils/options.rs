#[derive(Debug, Clone, Copy, Default)]
pub struct OctetCoreOpts {
  max_cycles: Option<u64>,
}

impl OctetCoreOpts {
  pub fn new() -> Self {
    Self::default()
  }

  // Method to apply options
  pub fn with_options(mut self, opts: impl IntoIterator<Item = impl FnOnce(&mut Self)>) -> Self {
    for opt in opts {
      opt(&mut self);
    }
    self
  }

  pub fn max_cycles(&self) -> Option<u64> {
    self.max_cycles
  }
}

// Functional option for the cycle budget
pub fn with_max_cycles(value: u64) -> impl FnOnce(&mut OctetCoreOpts) {
  move |opts: &mut OctetCoreOpts| {
    opts.max_cycles = Some(value);
  }
}
