use std::ops::RangeInclusive;

use octet_interface::{Address, CONSOLE_ADDRESS};

/// A peripheral mapped into the address space. Accesses that fall into its
/// range are routed to it instead of RAM.
#[mockall::automock]
pub trait Device {
  fn read(&self, address: Address) -> u8;
  fn write(&mut self, address: Address, value: u8);
}

/// A registry of memory-mapped devices, indexed by the address ranges they occupy.
#[derive(Default)]
pub struct DeviceRegistry {
  /// Registered devices, never overlapping.
  table: Vec<(RangeInclusive<Address>, Box<dyn Device>)>,
}

impl DeviceRegistry {
  pub fn new() -> Self {
    Default::default()
  }

  /// Map a device over `range`.
  /// Will fail if the range is empty, overlaps an existing device
  /// or covers the console cell.
  pub fn register(
    &mut self,
    range: RangeInclusive<Address>,
    device: Box<dyn Device>,
  ) -> anyhow::Result<()> {
    anyhow::ensure!(!range.is_empty(), "device range {range:?} is empty");
    anyhow::ensure!(
      !range.contains(&CONSOLE_ADDRESS),
      "address {CONSOLE_ADDRESS:#06x} is reserved for the console"
    );
    if let Some((existing, _)) = self
      .table
      .iter()
      .find(|(r, _)| r.start() <= range.end() && range.start() <= r.end())
    {
      anyhow::bail!("device range {range:?} overlaps with {existing:?}");
    }
    tracing::debug!(?range, "registered device");
    self.table.push((range, device));
    Ok(())
  }

  pub(crate) fn get(&self, address: Address) -> Option<&dyn Device> {
    self
      .table
      .iter()
      .find(|(r, _)| r.contains(&address))
      .map(|(_, d)| d.as_ref())
  }

  pub(crate) fn get_mut(&mut self, address: Address) -> Option<&mut Box<dyn Device>> {
    self
      .table
      .iter_mut()
      .find(|(r, _)| r.contains(&address))
      .map(|(_, d)| d)
  }
}
