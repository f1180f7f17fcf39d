//! End-to-end tests for the conversion API.

mod batch_test;
mod convert_test;
mod guard_test;
mod helpers;
