//! Scheduler behaviour tests
