use reqwest::Certificate;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use super::{Client, RequestKind};
use crate::error::{Error, Result};
use crate::params::Params;
use crate::xml;

const BODY_TYPE: &str = "application/xml; charset=utf-8";

impl Client {
    fn http_builder(&self) -> Result<reqwest::ClientBuilder> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(self.connect_timeout)
            .read_timeout(self.read_timeout);
        for der in &self.root_certificates {
            builder = builder.add_root_certificate(Certificate::from_der(der)?);
        }
        Ok(builder)
    }

    /// Signs `params` and posts them without a client certificate.
    #[instrument(skip(self, params))]
    pub(crate) async fn post_without_cert(&self, url: &str, params: Params) -> Result<String> {
        let http = self.http_builder()?.build()?;
        let body = xml::to_xml(&self.fill_request_data(params, RequestKind::Standard)?)?;
        send(&http, url, body).await
    }

    /// Signs `params` and posts them over mutual TLS.
    ///
    /// Fails before touching the network when the account has no certificate
    /// or the certificate cannot be turned into a TLS identity.
    #[instrument(skip(self, params))]
    pub(crate) async fn post_with_cert(
        &self,
        url: &str,
        params: Params,
        kind: RequestKind,
    ) -> Result<String> {
        let identity = self.account.client_identity()?;
        let http = self.http_builder()?.identity(identity).build()?;
        let body = xml::to_xml(&self.fill_request_data(params, kind)?)?;
        send(&http, url, body).await
    }

    /// Issues a plain GET and decodes the body as a JSON object.
    ///
    /// The query carries the app secret, so transport errors are stripped of
    /// their URL before being returned.
    #[instrument(skip(self, query))]
    pub(crate) async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Map<String, Value>> {
        let http = self.http_builder()?.build()?;
        let response = http
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(without_url)?;
        debug!(status = %response.status(), "Received JSON response");
        let body = response.bytes().await.map_err(without_url)?;
        Ok(serde_json::from_slice(&body)?)
    }
}

async fn send(http: &reqwest::Client, url: &str, body: String) -> Result<String> {
    let response = http
        .post(url)
        .header(CONTENT_TYPE, BODY_TYPE)
        .body(body)
        .send()
        .await?;
    debug!(status = %response.status(), "Received gateway response");
    Ok(response.text().await?)
}

fn without_url(e: reqwest::Error) -> Error {
    Error::Transport(e.without_url())
}
