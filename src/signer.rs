//! LMv1 request signing.
//!
//! The signed message is `verb + epoch + body + resource_path`. Query
//! parameters never take part in it, even when the URL carries them; the
//! platform verifies signatures that way.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::digest::InvalidLength;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SCHEME: &str = "LMv1";

/// Everything that went into one Authorization header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub verb: String,
    pub resource_path: String,
    pub body: String,
    pub epoch: i64,
    pub signature: String,
    pub authorization: String,
}

pub fn request_vars(verb: &str, epoch: i64, body: &str, resource_path: &str) -> String {
    format!("{verb}{epoch}{body}{resource_path}")
}

/// Sign one request. No validation happens here: empty credentials still
/// yield a header, which the server then rejects.
pub fn sign(
    access_id: &str,
    access_key: &str,
    verb: &str,
    resource_path: &str,
    body: &str,
    epoch: i64,
) -> Result<SignedRequest, InvalidLength> {
    let message = request_vars(verb, epoch, body, resource_path);
    let mut mac = HmacSha256::new_from_slice(access_key.as_bytes())?;
    mac.update(message.as_bytes());
    let digest_hex = hex::encode(mac.finalize().into_bytes());
    let signature = STANDARD.encode(digest_hex.as_bytes());
    let authorization = format!("{SCHEME} {access_id}:{signature}:{epoch}");

    Ok(SignedRequest {
        verb: verb.to_string(),
        resource_path: resource_path.to_string(),
        body: body.to_string(),
        epoch,
        signature,
        authorization,
    })
}
