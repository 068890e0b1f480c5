//! # API Middleware
//!
//! Tower-layer middleware applied around the route handlers. Bearer
//! authentication lives in [`crate::auth`]; this module holds the rest.

pub mod metrics;
