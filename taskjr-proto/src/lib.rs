//! Shared data model and REST wire definitions for Taskjr.

pub mod auth;
pub mod rest;
pub mod task;
pub mod view;
