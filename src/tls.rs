mod cert_utils;

pub use cert_utils::*;

use openssl::pkcs12::Pkcs12;
use reqwest::Identity;
use tracing::{debug, instrument, trace};

use crate::error::{Error, Result};

/// Turns a PKCS#12 archive into a TLS client identity.
///
/// The archive must hold a private key and a leaf certificate; any bundled CA
/// certificates are appended as the chain. The gateway protects merchant
/// archives with the merchant id as passphrase.
#[instrument(skip_all)]
pub fn client_identity(archive: &[u8], passphrase: &str) -> Result<Identity> {
    let pem = pkcs12_to_pem(archive, passphrase)?;
    Identity::from_pem(&pem).map_err(|e| Error::Certificate(e.to_string()))
}

/// Decodes a PKCS#12 archive into concatenated PEM: key, leaf, then chain.
pub fn pkcs12_to_pem(archive: &[u8], passphrase: &str) -> Result<Vec<u8>> {
    trace!("Parsing PKCS#12 archive...");
    let parsed = Pkcs12::from_der(archive)
        .and_then(|p12| p12.parse2(passphrase))
        .map_err(|e| Error::Certificate(format!("Unable to open PKCS#12 archive: {e}")))?;

    let key = parsed
        .pkey
        .ok_or_else(|| Error::Certificate("PKCS#12 archive has no private key".into()))?;
    let cert = parsed
        .cert
        .ok_or_else(|| Error::Certificate("PKCS#12 archive has no certificate".into()))?;

    let mut pem = key.private_key_to_pem_pkcs8()?;
    pem.extend_from_slice(&cert.to_pem()?);
    if let Some(chain) = parsed.ca {
        debug!(chain_len = chain.len(), "Appending CA chain from PKCS#12 archive");
        for ca in chain.iter() {
            pem.extend_from_slice(&ca.to_pem()?);
        }
    }
    Ok(pem)
}
