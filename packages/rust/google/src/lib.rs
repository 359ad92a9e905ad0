//! Google API clients: credentials, text generation, and spreadsheet values.
//!
//! This crate provides:
//! - [`auth`]: service-account token flow and the [`CredentialHolder`]
//! - [`generative`]: the summarizing [`GenerativeClient`]
//! - [`sheets`]: the [`SheetsClient`] used by the spreadsheet sink

pub mod auth;
pub mod generative;
pub mod sheets;

pub use auth::{
    BearerToken, CredentialHolder, GENERATIVE_LANGUAGE_SCOPE, SPREADSHEETS_SCOPE,
    ServiceAccountKey, TokenSource,
};
pub use generative::GenerativeClient;
pub use sheets::{SheetsClient, UpdateValuesResponse};
