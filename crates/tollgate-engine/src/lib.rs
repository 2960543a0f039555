//! Token lifecycle and validation engine.
//!
//! Issues opaque bearer tokens, revokes them, lists them per user, and
//! validates a presented token against a required group set. Storage and
//! directory access are injected through the traits in `tollgate-store`.

pub mod engine;
pub mod error;
pub mod generate;
pub mod membership;

pub use engine::TokenEngine;
pub use error::AuthError;
pub use generate::{TOKEN_BYTES, TOKEN_LEN, generate_token};
pub use membership::{MembershipEvaluator, contains_all};
