//! Unit test modules.

mod encoding_test;
