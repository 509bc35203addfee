//! Core types for the CRM.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod number;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use number::DocumentKind;
pub use status::*;
