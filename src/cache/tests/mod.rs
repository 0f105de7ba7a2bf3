//! Resource cache and disk cleanup tests

mod disk_cleanup_tests;
mod resource_cache_tests;
