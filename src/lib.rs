//! Client-side data layer for the DonorHub charity dashboard.
//!
//! The backend is an Oracle APEX REST module owned elsewhere; this crate
//! fetches its collections, caches them per name with in-flight
//! deduplication, derives the dashboard's aggregate view models, and manages
//! create/edit form drafts.

pub mod api;
pub mod config;
pub mod error;
pub mod forms;
pub mod models;
pub mod reports;
pub mod stats;
pub mod store;
pub mod views;

pub use api::{Backend, BackendKind, DemoBackend, HttpBackend};
pub use config::{AuthMode, Config, FieldConvention};
pub use error::ApiError;
pub use forms::{FieldError, FormMode, FormSession, FormState, SubmitError};
pub use store::{Collection, Record, RemoteStore};
pub use views::Section;
