//! Data models for Vitae

mod link;
mod view;

pub use link::{LinkId, ShareLink};
pub use view::ViewEvent;
