//! Go Marketplace Core - Shared types library.
//!
//! This crate provides the product and cart types used by the
//! `go-marketplace-cart` and `go-marketplace-cli` crates.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no async
//! runtime. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Product IDs, prices, catalogue products and cart line items

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
