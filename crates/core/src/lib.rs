//! CRM Core - Shared types library.
//!
//! This crate provides the types shared by every CRM component:
//! - `api` - REST server over the CRM database
//! - `client` - Typed HTTP client consumed by front ends
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. Database (de)serialization is available behind the
//! `postgres` feature.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, emails, status labels and document numbers
//! - [`models`] - Entity records and their relation-loaded views
//! - [`response`] - The JSON envelope and pagination wrapper

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod models;
pub mod response;
pub mod types;

pub use response::{ApiResponse, FieldErrors, Page};
pub use types::*;
