pub mod file;
pub mod sample;
pub mod stdin;
