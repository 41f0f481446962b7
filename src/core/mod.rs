//! Core primitives shared by every Stocktake subsystem.
//!
//! Connection handling, the single-writer broker, schema DDL, the store
//! handle, session context, configuration, and small shared helpers.

pub mod broker;
pub mod config;
pub mod db;
pub mod error;
pub mod output;
pub mod schemas;
pub mod session;
pub mod store;
pub mod time;
