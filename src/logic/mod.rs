//! Logic Module - Simulation Engine & Triggers
//!
//! The single event-driven engine behind every trigger family: timed and
//! event collection, threshold and accuracy watches, schedules, phased
//! runs and the chained workflow.

// Engine core
pub mod engine;
pub mod error;
pub mod opstate;

// Shared state
pub mod activity;
pub mod settings;
pub mod status;
pub mod store;

// Operations
pub mod collection;
pub mod demo;
pub mod monitor;
pub mod prediction;
pub mod schedule;
pub mod workflow;
