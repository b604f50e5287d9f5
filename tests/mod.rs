//! Test suite for curriculum-sync
//!
//! This module organizes all tests

pub mod common;
pub mod integration;
