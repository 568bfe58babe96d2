//! Tamper-evident client-side sessions carried in a signed cookie.
//!
//! Session data lives entirely in the browser: it is serialized, signed with a server-held
//! secret, and round-tripped as a cookie on every exchange. Clients can read their session
//! (the payload is only base64), but cannot undetectably alter it -- any token whose HMAC does
//! not verify is treated exactly like a missing cookie.
//!
//! The core is [`SignedSessionCodec`], a pure transform pair between [`SessionData`] and the
//! `payload.signature` token. [`SessionManagerLayer`] glues it into a tower/axum service:
//! handlers take a [`Session`] extractor, and the layer handles the cookie round-trip.
//!
//! # Security
//! Compromise of the [`Secret`] lets anyone forge sessions, so supply it from the environment
//! (see [`Secret::from_env`]) rather than hard-coding it, and never log it. There is no
//! server-side store: the cookie is the session, and its contents are visible to the client.
//! Do not put anything secret in it.
//!
//! # Example
//! ```no_run
//! use axum::{Router, routing::get};
//! use signed_session::{Secret, Session, SessionManagerLayer};
//!
//! async fn index(session: Session) -> String {
//!     let n: i64 = session.get("n").expect("session get succeeds").unwrap_or(0);
//!     session.insert("n", n + 1).expect("session insert succeeds");
//!     format!("n={n}")
//! }
//!
//! let secret = Secret::from_env("SESSION_SECRET").expect("SESSION_SECRET must be set");
//! let app: Router = Router::new()
//!     .route("/", get(index))
//!     .layer(SessionManagerLayer::new(secret));
//! ```

mod codec;
mod config;
mod error;
pub mod layer;
mod secret;
mod session;
mod value;

pub use tower_cookies::cookie::SameSite;

pub use crate::codec::{DEFAULT_MAX_TOKEN_BYTES, SignedSessionCodec};
pub use crate::config::{DEFAULT_COOKIE_NAME, Expiry, SessionCookieConfig};
pub use crate::error::Error;
pub use crate::layer::SessionManagerLayer;
pub use crate::secret::Secret;
pub use crate::session::Session;
pub use crate::value::{SessionData, Value};
