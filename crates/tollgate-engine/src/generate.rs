//! Opaque token generation.

use crate::error::AuthError;
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;

/// Raw entropy per token.
pub const TOKEN_BYTES: usize = 24;

/// Encoded length: 24 bytes under unpadded base64url.
pub const TOKEN_LEN: usize = 32;

/// Produce a fresh opaque token: 24 bytes from the OS secure-random
/// source, encoded over `[A-Za-z0-9_-]`. The token carries no meaning;
/// it is only ever looked up in storage.
pub fn generate_token() -> Result<String, AuthError> {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| AuthError::RandomSource(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
