//! Unit and integration tests for sqlmap
//!
//! Tests are grouped by the layer they exercise. Database-backed tests each open a
//! uuid-named temporary database through [`test_utils`].

mod binding_tests;
mod cache_tests;
mod proptest_tests;
mod utils_tests;
