//! HTTP middleware and extractors.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. CORS
//! 3. `TraceLayer` (request span with method, uri, status, latency)
//! 4. Request ID (recorded on the span, echoed in the response)
//!
//! Authentication is an extractor ([`auth::CurrentUser`]) taken by every
//! protected handler rather than a layer.

pub mod auth;
pub mod request_id;

pub use auth::CurrentUser;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
