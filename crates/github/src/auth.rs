//! GitHub App authentication.
//!
//! An app authenticates in two steps: it signs a short-lived RS256 JWT with its
//! private key, then exchanges that JWT for an installation access token
//! scoped to one organization. The installation token is what every other
//! call uses.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::Serialize;

use compliance::GitHubError;

/// Seconds the `iat` claim is backdated to tolerate clock drift.
const CLOCK_DRIFT_SECS: i64 = 60;
/// Lifetime of the app JWT. GitHub rejects anything above ten minutes.
const JWT_LIFETIME_SECS: i64 = 9 * 60;

/// Claims GitHub expects in an app JWT.
#[derive(Debug, Serialize)]
struct AppClaims {
    /// Issued-at (UTC Unix timestamp).
    iat: i64,
    /// Expiration (UTC Unix timestamp).
    exp: i64,
    /// The app id.
    iss: String,
}

/// Normalizes a PEM passed through an environment variable.
///
/// CI secrets frequently carry the key with literal `\n` sequences instead of
/// line breaks.
pub fn normalize_pem(raw: &str) -> String {
    raw.trim().replace("\\n", "\n")
}

/// Signs an app JWT valid for the next nine minutes.
pub fn app_jwt(app_id: &str, private_key_pem: &str) -> Result<String, GitHubError> {
    let key = EncodingKey::from_rsa_pem(private_key_pem.as_bytes()).map_err(|e| {
        GitHubError::Authentication {
            message: format!("invalid app private key: {e}"),
        }
    })?;

    let now = chrono::Utc::now().timestamp();
    let claims = AppClaims {
        iat: now - CLOCK_DRIFT_SECS,
        exp: now + JWT_LIFETIME_SECS,
        iss: app_id.to_string(),
    };

    encode(&Header::new(Algorithm::RS256), &claims, &key).map_err(|e| {
        GitHubError::Authentication {
            message: format!("failed to sign app JWT: {e}"),
        }
    })
}
