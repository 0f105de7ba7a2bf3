//! Plugin Verifier
//!
//! Checks compiled JVM plugins against host application builds. Every class,
//! method and field reference in the plugin bytecode is resolved against the
//! plugin, its dependencies and the host, and anything that would fail at
//! link time is reported as a compatibility problem.

pub mod app;
pub mod bytecode;
pub mod cache;
pub mod cli;
pub mod config;
pub mod dependencies;
pub mod host;
pub mod logging;
pub mod output;
pub mod plugin;
pub mod resolver;
pub mod tasks;
pub mod verification;
pub mod verifier;
