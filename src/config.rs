use std::{collections::HashMap, path::PathBuf};

use config::{Config as ConfigLib, ConfigError, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::account::Account;
use crate::client::{Client, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, urls};
use crate::error::Result;
use crate::sign::SignType;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub merchant: MerchantConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MerchantConfig {
    pub app_id: String,
    pub mch_id: String,
    pub api_key: SecretString,
    #[serde(default)]
    pub cert_path: Option<PathBuf>,
    pub sandbox: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    pub connect_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub sign_type: SignType,
    pub api_base: String,
}

impl Config {
    pub fn load() -> std::result::Result<Self, ConfigError> {
        Self::load_with_sources(None)
    }

    pub fn load_with_sources(
        env_vars: Option<HashMap<String, String>>,
    ) -> std::result::Result<Self, ConfigError> {
        let mut builder = ConfigLib::builder()
            .set_default("merchant.sandbox", false)?
            .set_default(
                "http.connect_timeout_ms",
                DEFAULT_CONNECT_TIMEOUT.as_millis() as u64,
            )?
            .set_default("http.read_timeout_ms", DEFAULT_READ_TIMEOUT.as_millis() as u64)?
            .set_default("http.sign_type", SignType::Md5.as_str())?
            .set_default("http.api_base", urls::API_BASE)?
            .add_source(File::with_name("config/settings").required(false));

        // If env_vars is provided, we use it instead of system environment
        // This is to avoid systems variables pollution across tests
        if let Some(vars) = env_vars {
            for (key, value) in vars {
                builder = builder.set_override(&key, value)?;
            }
        } else {
            // Should be in the format APP_MERCHANT__MCH_ID or APP_HTTP__READ_TIMEOUT_MS
            builder = builder.add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );
        }

        builder.build()?.try_deserialize()
    }

    /// Builds a client from this configuration, loading the merchant
    /// certificate when a path is configured.
    pub fn build_client(&self) -> Result<Client> {
        let merchant = &self.merchant;
        let mut account = Account::new(
            merchant.app_id.clone(),
            merchant.mch_id.clone(),
            merchant.api_key.expose_secret(),
            merchant.sandbox,
        );
        if let Some(path) = &merchant.cert_path {
            account.set_cert_file(path)?;
        }

        let mut client = Client::new(account);
        client.set_sign_type(self.http.sign_type);
        client.set_http_connect_timeout_ms(self.http.connect_timeout_ms);
        client.set_http_read_timeout_ms(self.http.read_timeout_ms);
        client.set_api_base(self.http.api_base.clone());
        Ok(client)
    }
}
