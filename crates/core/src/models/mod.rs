//! Entity records as stored and as returned by the API.
//!
//! Each entity has a flat record type (one table row, `FromRow` with the
//! `postgres` feature) and, where the API attaches related records, a view
//! type that flattens the record and adds the relations next to it.

pub mod activity;
pub mod company;
pub mod contact;
pub mod dashboard;
pub mod deal;
pub mod invoice;
pub mod product;
pub mod quote;
pub mod task;
pub mod user;

pub use activity::{Activity, ActivityView};
pub use company::{Company, CompanyView};
pub use contact::{Contact, ContactView};
pub use dashboard::{DashboardStats, StageSummary, start_of_week};
pub use deal::{Deal, DealView};
pub use invoice::{Invoice, InvoiceItem, InvoiceView, Payment};
pub use product::Product;
pub use quote::{Quote, QuoteItem, QuoteView};
pub use task::{Task, TaskView};
pub use user::{AuthPayload, UploadedPhoto, User};
