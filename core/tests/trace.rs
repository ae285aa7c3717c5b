use octet_core::io::MemoryInput;
use octet_core::runtime::{Program, Runtime};
use octet_core::utils::{OctetCoreOpts, FIBONACCI_PROGRAM};
use octet_interface::FIB_INPUT_ADDRESS;

#[test]
fn trace_file_records_every_pc() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("trace.bin");
  std::env::set_var("TRACE_FILE", &path);

  let mut runtime = Runtime::new(
    Program::from(FIBONACCI_PROGRAM).unwrap(),
    OctetCoreOpts::default(),
  );
  runtime.write_input(&MemoryInput::from(FIB_INPUT_ADDRESS, &[1]));
  runtime.execute().unwrap();
  std::env::remove_var("TRACE_FILE");

  let trace = std::fs::read(&path).unwrap();
  assert_eq!(trace.len() as u64, runtime.state.global_clk * 2);
  // big-endian PCs, starting at the load address
  assert_eq!(&trace[..4], &[0x10, 0x00, 0x10, 0x02]);
  assert_eq!(&trace[trace.len() - 2..], &[0x10, 0x25]);
}
