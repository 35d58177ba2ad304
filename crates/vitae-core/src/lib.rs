//! vitae-core - Core library for Vitae
//!
//! This crate contains the share link models, the link storage layer, and the
//! view recording service used by the Vitae API.

pub mod db;
pub mod error;
pub mod models;
pub mod recorder;

pub use error::{Error, Result};
pub use models::{LinkId, ShareLink, ViewEvent};
pub use recorder::{RecordedView, ViewRecorder};
