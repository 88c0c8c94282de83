//! `Taskjr` development server library.
//!
//! An in-memory implementation of the hosted REST backend the `taskjr`
//! client talks to, exposed for integration tests and local development.

pub mod config;
pub mod server;
pub mod store;
