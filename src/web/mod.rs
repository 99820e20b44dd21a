//! HTTP surface: trigger endpoints for schedulers and moderation actions
//! for the admin dashboard.

pub mod error;
pub mod handlers;
pub mod router;

pub use error::ApiError;
pub use router::create_router;
