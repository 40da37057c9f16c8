//! Shared types for omniconscientes authentication.
//!
//! This crate provides:
//! - The read-only `User` and `Session` projections of provider records
//! - The uniform result envelopes returned by every gateway operation
//! - The provider's opaque `ErrorInfo`
//! - Auth change events and supported OAuth providers

mod errors;
mod events;
mod results;
mod session;
mod user;

pub use errors::ErrorInfo;
pub use events::{AuthChangeEvent, OAuthProvider};
pub use results::{ActionResult, AuthData, AuthResult, OAuthRedirect, SessionResult, UserResult};
pub use session::Session;
pub use user::{Metadata, User};
