// Library interface for finteam-cli.
// Argument handling and output rendering live here so integration tests
// can drive them without spawning the binary.

pub mod args;
pub mod render;

pub use args::Cli;
pub use render::{interrupt_on, render_stream, write_report, Rendered};
