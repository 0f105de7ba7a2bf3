//! Class file decoding tests against writer-produced bytes

mod class_file_tests;
