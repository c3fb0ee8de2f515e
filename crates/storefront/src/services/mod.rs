//! Business logic services for the storefront client.
//!
//! # Services
//!
//! - `auth` - Login, registration and logout against the RedSeam API
pub mod auth;
