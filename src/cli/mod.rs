//! Command line parsing

pub mod args;
pub mod size_parser;

pub use args::{Args, OutputFormat};
