/// OAuth 2.0 Proof Key for Code Exchange (RFC 7636) helpers.
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::Rng;
use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// Characters allowed in a code verifier (RFC 7636 §4.1)
const UNRESERVED: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-._~";
const VERIFIER_LEN: usize = 64;
const STATE_LEN: usize = 16;

fn random_string(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| {
            let idx = rng.random_range(0..UNRESERVED.len());
            UNRESERVED[idx] as char
        })
        .collect()
}

#[must_use]
pub fn generate_code_verifier() -> String {
    random_string(VERIFIER_LEN)
}

/// Opaque value echoed back by the authorize redirect
#[must_use]
pub fn generate_state() -> String {
    random_string(STATE_LEN)
}

/// `base64url(SHA-256(verifier))` without padding
#[must_use]
pub fn code_challenge(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Builds the authorize URL for the S256 challenge method
pub fn authorize_url(
    authorize_endpoint: &str,
    client_id: &str,
    redirect_uri: &str,
    challenge: &str,
    state: &str,
    scopes: &[&str],
) -> AppResult<String> {
    let mut url = Url::parse(authorize_endpoint)
        .map_err(|e| AppError::Internal(format!("Bad authorize endpoint: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("code_challenge_method", "S256")
        .append_pair("code_challenge", challenge)
        .append_pair("state", state)
        .append_pair("scope", &scopes.join(" "));
    Ok(url.to_string())
}
