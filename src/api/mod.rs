//! API Module
//!
//! The console surface: one async command per keyword, DTOs shaped for
//! JSON output.

pub mod commands;
