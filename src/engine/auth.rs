//! Authentication for the Engine API.
//!
//! Every request carries an HS256 signed token with a fresh `iat` claim.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Result};
use jsonwebtoken::Algorithm;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// JWT hex encoded 256 bit secret key length.
const JWT_SECRET_LEN: usize = 64;

/// The maximum amount of drift from the JWT claims issued-at `iat` time.
const JWT_MAX_IAT_DIFF: Duration = Duration::from_secs(60);

/// The execution layer client MUST support at least the following alg HMAC + SHA256 (HS256)
const JWT_SIGNATURE_ALGO: Algorithm = Algorithm::HS256;

/// JwtSecret is a 256-bit hex-encoded secret key used to perform JWT-based authentication.
///
/// See: [Secret key - Engine API specs](https://github.com/ethereum/execution-apis/blob/main/src/engine/authentication.md#key-distribution)
#[derive(Clone)]
pub struct JwtSecret([u8; 32]);

impl JwtSecret {
    /// Parses a 64 character hex string, with or without a `0x` prefix.
    pub fn from_hex<S: AsRef<str>>(hex: S) -> Result<Self> {
        let hex: &str = hex.as_ref().trim();
        let hex = hex
            .strip_prefix("0x")
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        if hex.len() != JWT_SECRET_LEN {
            bail!(
                "invalid JWT secret key length, expected {} characters, got {}",
                JWT_SECRET_LEN,
                hex.len()
            );
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hex, &mut bytes)?;
        Ok(Self(bytes))
    }

    /// Generates a random [`JwtSecret`]
    pub fn random() -> Self {
        Self(rand::thread_rng().gen())
    }

    /// Claims issued at `time`, or now.
    pub(crate) fn generate_claims(&self, time: Option<SystemTime>) -> Claims {
        let now_secs = unix_secs(time.unwrap_or_else(SystemTime::now));
        Claims {
            iat: now_secs,
            exp: now_secs + JWT_MAX_IAT_DIFF.as_secs(),
        }
    }

    /// Signs the claims into a compact token.
    pub(crate) fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        let key = jsonwebtoken::EncodingKey::from_secret(&self.0);
        let header = jsonwebtoken::Header::new(JWT_SIGNATURE_ALGO);
        jsonwebtoken::encode(&header, claims, &key)
    }
}

impl std::fmt::Debug for JwtSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("JwtSecret").field(&"<redacted>").finish()
    }
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

/// Claims are a set of information about an actor authorized by a JWT.
///
/// The Engine API requires that the `iat` (issued-at) claim is provided.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    /// The number of seconds since the UNIX_EPOCH.
    pub(crate) iat: u64,
    /// The expiration time of the JWT.
    pub(crate) exp: u64,
}
