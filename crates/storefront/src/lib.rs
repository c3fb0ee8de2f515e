//! RedSeam storefront client library.
//!
//! Talks to the RedSeam REST API, keeps the bearer token and display data in
//! a two-tier key/value store, and mirrors the server-owned cart in a
//! [`CartSession`](cart::CartSession).
//!
//! # Modules
//!
//! - `api` - HTTP client and wire types
//! - `cart` - Cart session, quantity debouncing, totals and checkout
//! - `config` - Environment configuration
//! - `error` - Cart error type and Sentry helpers
//! - `services` - Authentication
//! - `store` - Session and durable key/value storage

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod config;
pub mod error;
pub mod services;
pub mod store;
