use reqwest::Identity;
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use std::path::Path;
use tracing::debug;

use crate::error::{Error, Result};
use crate::tls;

/// Merchant identity used to sign requests and, optionally, to authenticate
/// the TLS connection.
#[derive(Debug)]
pub struct Account {
    app_id: String,
    mch_id: String,
    api_key: SecretString,
    cert_data: Option<SecretSlice<u8>>,
    sandbox: bool,
}

impl Account {
    pub fn new(
        app_id: impl Into<String>,
        mch_id: impl Into<String>,
        api_key: impl Into<String>,
        sandbox: bool,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            mch_id: mch_id.into(),
            api_key: SecretString::from(api_key.into()),
            cert_data: None,
            sandbox,
        }
    }

    /// Loads the merchant PKCS#12 archive from disk.
    pub fn set_cert_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        debug!(path = %path.display(), "Loaded merchant certificate archive");
        self.set_cert_data(data);
        Ok(())
    }

    /// Sets the merchant PKCS#12 archive from raw bytes.
    pub fn set_cert_data(&mut self, data: impl Into<Vec<u8>>) {
        let data: Vec<u8> = data.into();
        self.cert_data = Some(SecretSlice::from(data));
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    pub fn mch_id(&self) -> &str {
        &self.mch_id
    }

    pub fn is_sandbox(&self) -> bool {
        self.sandbox
    }

    pub fn has_cert(&self) -> bool {
        self.cert_data.is_some()
    }

    pub(crate) fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Builds the TLS client identity from the certificate archive.
    ///
    /// The archive passphrase is the merchant id. Without an archive this
    /// fails with [`Error::Configuration`].
    pub fn client_identity(&self) -> Result<Identity> {
        let data = self
            .cert_data
            .as_ref()
            .ok_or_else(|| Error::Configuration("Certificate data is empty".into()))?;
        tls::client_identity(data.expose_secret(), &self.mch_id)
    }
}
