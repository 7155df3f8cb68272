//! Outer surfaces: the command line, CSV output and terminal prompts.

pub mod cli;
pub mod csv;
pub mod terminal;
