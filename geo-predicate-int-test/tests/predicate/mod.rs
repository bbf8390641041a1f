//! Single predicate integration tests.
//!
//! These tests run spatial predicates as Tantivy queries over multi-segment
//! indexes, with and without an attached R-Tree.

mod diagonal_test;
mod error_handling_test;
mod reverse_predicate_test;
