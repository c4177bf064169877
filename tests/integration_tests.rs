//! Integration tests entry point
//!
//! Includes every module under tests/integration/ in one test binary.

mod integration;
