//! Dependency graph construction tests

mod builder_tests;
