//! RedSeam Core - Shared types library.
//!
//! This crate provides common types used across all RedSeam components:
//! - `storefront` - API client and cart session model
//! - `cli` - Command-line storefront front end
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no HTTP
//! clients, no persistence. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, emails, line
//!   items and checkout details

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
