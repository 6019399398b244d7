//! CLI command implementations.

pub mod common;
pub mod config;
pub mod demo;
pub mod hash;
pub mod render;
