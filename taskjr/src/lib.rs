//! `Taskjr` — personal task board with optimistic sync against a hosted
//! backend.

pub mod backend;
pub mod cli;
pub mod config;
pub mod store;
pub mod views;

#[cfg(test)]
mod test_utils;
