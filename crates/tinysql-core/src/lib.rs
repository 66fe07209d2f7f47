//! Core types for the Tiny-SQL client.
//!
//! This crate provides the foundation shared by the driver and the pool:
//!
//! - The [`Error`] taxonomy for transport, protocol, auth, query, pool and
//!   usage failures
//! - [`Value`]: dynamically typed SQL values as decoded off the wire
//! - [`Row`] and [`ColumnInfo`]: name- and index-addressable result rows
//! - [`FromValue`]: conversion from wire values to Rust types

pub mod error;
pub mod row;
pub mod value;

pub use error::{Error, Result};
pub use row::{ColumnInfo, FromValue, Row};
pub use value::Value;
