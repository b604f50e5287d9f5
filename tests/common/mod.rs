//! Common test utilities and helpers
//!
//! This module provides shared utilities for all tests including:
//! - Engine and record fixtures
//! - Mock HTTP server helpers
//! - Custom assertion macros


// Re-export commonly used utilities
pub use fixtures::*;
pub use mock_server::*;
