//! Core types, configuration and errors shared by every battle module

pub mod config;
pub mod error;
pub mod types;
