//! Application orchestration module

pub mod execution;
pub mod initialization;

pub use execution::{build_filters, host_selection, open_classpath, resolve_plugins, run_verification};
pub use initialization::{configure_logging, load_configuration, verifier_config};
