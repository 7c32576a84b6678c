
use openssl::hash::{MessageDigest, hash};
use openssl::pkey::PKey;
use openssl::sign::Signer;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::params::{Params, fields};

/// Literal name of the trailing secret segment in the canonical form.
const KEY_SEGMENT: &str = "key";

/// Signature algorithms accepted by the gateway.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignType {
    /// MD5 over the canonical form, wire value `MD5`
    #[default]
    #[serde(rename = "MD5")]
    Md5,
    /// HMAC-SHA256 keyed with the API key, wire value `HMAC-SHA256`
    #[serde(rename = "HMAC-SHA256")]
    HmacSha256,
}

impl SignType {
    /// The value sent in the `sign_type` field
    pub fn as_str(&self) -> &'static str {
        match self {
            SignType::Md5 => "MD5",
            SignType::HmacSha256 => "HMAC-SHA256",
        }
    }

    /// Digest the canonical bytes, returning the raw output
    fn digest(&self, data: &[u8], secret: &str) -> Result<Vec<u8>> {
        match self {
            SignType::Md5 => Ok(hash(MessageDigest::md5(), data)?.to_vec()),
            SignType::HmacSha256 => {
                let key = PKey::hmac(secret.as_bytes())?;
                let mut signer = Signer::new(MessageDigest::sha256(), &key)?;
                signer.update(data)?;
                Ok(signer.sign_to_vec()?)
            }
        }
    }
}

impl fmt::Display for SignType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "MD5" => Ok(SignType::Md5),
            "HMAC-SHA256" => Ok(SignType::HmacSha256),
            other => Err(Error::Configuration(format!(
                "Unsupported sign type: {other}"
            ))),
        }
    }
}

/// Builds the byte string that gets signed.
///
/// Every field except `sign` is taken in byte-wise key order as `k=v&`.
/// Fields with an empty value are left out completely, key included.
/// The API key closes the string as `key=<secret>`.
pub fn canonicalize(params: &Params, secret: &str) -> String {
    let mut buf = String::new();
    for key in params.sorted_keys() {
        if key == fields::SIGN {
            continue;
        }
        let value = params.get_string(key);
        if !value.is_empty() {
            buf.push_str(key);
            buf.push('=');
            buf.push_str(value);
            buf.push('&');
        }
    }
    buf.push_str(KEY_SEGMENT);
    buf.push('=');
    buf.push_str(secret);
    buf
}

/// Computes the upper-case hex signature of `params`.
///
/// Any `sign` already present is ignored, so signing again after changing
/// other fields is safe.
pub fn sign(params: &Params, secret: &str, sign_type: SignType) -> Result<String> {
    let canonical = canonicalize(params, secret);
    let digest = sign_type.digest(canonical.as_bytes(), secret)?;
    Ok(hex::encode_upper(digest))
}

/// Checks the `sign` field of `params` against a freshly computed signature.
///
/// Returns `false` when the field is missing.
pub fn verify(params: &Params, secret: &str, sign_type: SignType) -> Result<bool> {
    let Some(claimed) = params.get(fields::SIGN) else {
        return Ok(false);
    };
    let expected = sign(params, secret, sign_type)?;
    Ok(claimed.eq_ignore_ascii_case(&expected))
}
