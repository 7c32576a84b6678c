mod api;
mod transport;

pub use api::urls;

use openssl::x509::X509;
use rand::{Rng, distr::Alphanumeric};
use std::time::Duration;
use tracing::{debug, warn};

use crate::account::Account;
use crate::error::{Error, Result};
use crate::params::{FAIL, Params, SUCCESS, fields};
use crate::sign::{self, SignType};
use crate::xml;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(2000);
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);

const NONCE_LEN: usize = 32;

/// Selects which identity fields are injected into a request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RequestKind {
    /// `appid`, `mch_id` and `sign_type`
    #[default]
    Standard,
    /// `mch_appid` and `mchid`, without `sign_type`, as the merchant transfer
    /// endpoint expects
    MchToWallet,
}

/// Whether a `SUCCESS` response must carry a valid signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Verification {
    #[default]
    VerifySignature,
    TrustWithoutVerification,
}

/// Client for the merchant payment API.
///
/// Operations take `&self` and build their own request parameters, so a
/// client can serve concurrent calls. Setters take `&mut self`.
#[derive(Debug)]
pub struct Client {
    account: Account,
    sign_type: SignType,
    connect_timeout: Duration,
    read_timeout: Duration,
    api_base: String,
    open_api_base: String,
    root_certificates: Vec<Vec<u8>>,
}

impl Client {
    pub fn new(account: Account) -> Self {
        Self {
            account,
            sign_type: SignType::default(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            api_base: urls::API_BASE.to_string(),
            open_api_base: urls::OPEN_API_BASE.to_string(),
            root_certificates: Vec::new(),
        }
    }

    pub fn set_http_connect_timeout_ms(&mut self, ms: u64) {
        self.connect_timeout = Duration::from_millis(ms);
    }

    pub fn set_http_read_timeout_ms(&mut self, ms: u64) {
        self.read_timeout = Duration::from_millis(ms);
    }

    pub fn set_sign_type(&mut self, sign_type: SignType) {
        self.sign_type = sign_type;
    }

    pub fn set_account(&mut self, account: Account) {
        self.account = account;
    }

    /// Overrides the merchant API host, e.g. to go through a proxy.
    pub fn set_api_base(&mut self, base: impl Into<String>) {
        self.api_base = base.into().trim_end_matches('/').to_string();
    }

    /// Overrides the host used by [`Client::auth_code_to_openid_mch`].
    pub fn set_open_api_base(&mut self, base: impl Into<String>) {
        self.open_api_base = base.into().trim_end_matches('/').to_string();
    }

    /// Trusts extra PEM-encoded CAs when verifying the gateway, e.g. the CA
    /// of an intercepting proxy.
    pub fn add_root_certificate(&mut self, pem: &[u8]) -> Result<()> {
        let certs = X509::stack_from_pem(pem)
            .map_err(|e| Error::Certificate(format!("Invalid root certificate: {e}")))?;
        if certs.is_empty() {
            return Err(Error::Certificate("No root certificate in PEM".into()));
        }
        for cert in certs {
            self.root_certificates.push(cert.to_der()?);
        }
        Ok(())
    }

    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Mutable access to the account, e.g. to load a certificate after setup.
    pub fn account_mut(&mut self) -> &mut Account {
        &mut self.account
    }

    pub fn sign_type(&self) -> SignType {
        self.sign_type
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// Signs `params` with the account key and the configured algorithm.
    pub fn sign(&self, params: &Params) -> Result<String> {
        sign::sign(params, self.account.api_key(), self.sign_type)
    }

    /// Checks the `sign` field of `params`; `false` when it is missing.
    pub fn valid_sign(&self, params: &Params) -> Result<bool> {
        sign::verify(params, self.account.api_key(), self.sign_type)
    }

    /// Signs `params` in place and serializes them, e.g. to answer a
    /// payment notification.
    pub fn generate_signed_xml(&self, mut params: Params) -> Result<String> {
        let signature = self.sign(&params)?;
        params.set(fields::SIGN, signature);
        xml::to_xml(&params)
    }

    /// Injects identity fields, a fresh nonce and finally the signature.
    ///
    /// The signature is computed last so it covers every injected field.
    pub fn fill_request_data(&self, mut params: Params, kind: RequestKind) -> Result<Params> {
        match kind {
            RequestKind::Standard => {
                params
                    .set(fields::APP_ID, self.account.app_id())
                    .set(fields::MCH_ID, self.account.mch_id())
                    .set(fields::SIGN_TYPE, self.sign_type.as_str());
            }
            RequestKind::MchToWallet => {
                params
                    .set(fields::MCH_APP_ID, self.account.app_id())
                    .set(fields::MCH_ID_TRANSFER, self.account.mch_id());
            }
        }
        params.set(fields::NONCE_STR, nonce_str());
        let signature = self.sign(&params)?;
        params.set(fields::SIGN, signature);
        Ok(params)
    }

    /// Decodes an XML response body and decides whether it can be trusted.
    ///
    /// `FAIL` responses are returned unchecked since the gateway does not
    /// always sign them. `SUCCESS` responses must carry a valid signature
    /// unless `verification` says otherwise.
    pub fn process_response_xml(&self, body: &str, verification: Verification) -> Result<Params> {
        let params = xml::from_xml(body)?;
        self.process_response(params, verification)
    }

    fn process_response(&self, params: Params, verification: Verification) -> Result<Params> {
        let return_code = params
            .get(fields::RETURN_CODE)
            .map(str::to_owned)
            .ok_or_else(|| Error::MalformedResponse("no return_code in XML".into()))?;

        match return_code.as_str() {
            FAIL => {
                debug!(return_msg = params.get_string(fields::RETURN_MSG), "Gateway returned FAIL");
                Ok(params)
            }
            SUCCESS => match verification {
                Verification::TrustWithoutVerification => Ok(params),
                Verification::VerifySignature => {
                    if self.valid_sign(&params)? {
                        Ok(params)
                    } else {
                        warn!("Discarding SUCCESS response with an invalid signature");
                        Err(Error::TrustFailure)
                    }
                }
            },
            other => Err(Error::MalformedResponse(format!(
                "return_code value is invalid in XML: {other}"
            ))),
        }
    }
}

/// Interprets the body of a bulk download.
///
/// The gateway answers with raw tabular data on success and with an XML error
/// document otherwise. The two are told apart by the first character only:
/// a payload starting with `<` is decoded as XML, anything else is wrapped
/// as `{return_code: SUCCESS, return_msg: ok, data: <payload>}`. A future
/// data format that starts with `<` would be misread as an error document.
pub fn process_download(payload: String) -> Result<Params> {
    if payload.starts_with('<') {
        return xml::from_xml(&payload);
    }
    Ok(Params::new()
        .with(fields::RETURN_CODE, SUCCESS)
        .with(fields::RETURN_MSG, "ok")
        .with(fields::DATA, payload))
}

/// A random alphanumeric token for `nonce_str`.
pub fn nonce_str() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect()
}
