pub mod assemble;
pub mod disassemble;
pub mod fib;
pub mod run;
