//! Integration tests

pub mod config_test;
pub mod engine_test;
pub mod http_remote_test;
