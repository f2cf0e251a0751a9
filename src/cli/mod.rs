//! Command line interface: load a JSON-lines file and run one query over it.

pub mod args;
pub mod commands;
pub mod output;

pub use args::*;
pub use commands::*;
pub use output::*;
