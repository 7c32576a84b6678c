use tracing::instrument;

use super::{Client, RequestKind, Verification, process_download};
use crate::error::{Error, Result};
use crate::params::Params;

/// Gateway hosts and endpoint paths.
pub mod urls {
    pub const API_BASE: &str = "https://api.mch.weixin.qq.com";
    pub const OPEN_API_BASE: &str = "https://api.weixin.qq.com";
    pub const SANDBOX_PREFIX: &str = "/sandboxnew";

    pub const MICRO_PAY: &str = "/pay/micropay";
    pub const UNIFIED_ORDER: &str = "/pay/unifiedorder";
    pub const ORDER_QUERY: &str = "/pay/orderquery";
    pub const REVERSE: &str = "/secapi/pay/reverse";
    pub const CLOSE_ORDER: &str = "/pay/closeorder";
    pub const REFUND: &str = "/secapi/pay/refund";
    pub const REFUND_QUERY: &str = "/pay/refundquery";
    pub const DOWNLOAD_BILL: &str = "/pay/downloadbill";
    pub const DOWNLOAD_FUND_FLOW: &str = "/pay/downloadfundflow";
    pub const REPORT: &str = "/payitil/report";
    pub const SHORT_URL: &str = "/tools/shorturl";
    pub const AUTH_CODE_TO_OPENID: &str = "/tools/authcodetoopenid";
    /// Merchant transfer to a user's wallet; there is no sandbox variant.
    pub const MCH_TO_CASH: &str = "/mmpaymkttransfers/promotion/transfers";
    /// OAuth code exchange on the open platform host.
    pub const OAUTH2_ACCESS_TOKEN: &str = "/sns/oauth2/access_token";
}

const OPENID: &str = "openid";

impl Client {
    /// Production or sandbox URL for `path`, depending on the account.
    pub fn endpoint(&self, path: &str) -> String {
        if self.account.is_sandbox() {
            format!("{}{}{}", self.api_base, urls::SANDBOX_PREFIX, path)
        } else {
            format!("{}{}", self.api_base, path)
        }
    }

    async fn call(&self, path: &str, params: Params) -> Result<Params> {
        let body = self.post_without_cert(&self.endpoint(path), params).await?;
        self.process_response_xml(&body, Verification::VerifySignature)
    }

    async fn call_with_cert(&self, path: &str, params: Params) -> Result<Params> {
        let body = self
            .post_with_cert(&self.endpoint(path), params, RequestKind::Standard)
            .await?;
        self.process_response_xml(&body, Verification::VerifySignature)
    }

    /// Places an order.
    #[instrument(skip_all)]
    pub async fn unified_order(&self, params: Params) -> Result<Params> {
        self.call(urls::UNIFIED_ORDER, params).await
    }

    /// Charges a payment code scanned from the customer.
    #[instrument(skip_all)]
    pub async fn micro_pay(&self, params: Params) -> Result<Params> {
        self.call(urls::MICRO_PAY, params).await
    }

    #[instrument(skip_all)]
    pub async fn refund(&self, params: Params) -> Result<Params> {
        self.call_with_cert(urls::REFUND, params).await
    }

    #[instrument(skip_all)]
    pub async fn order_query(&self, params: Params) -> Result<Params> {
        self.call(urls::ORDER_QUERY, params).await
    }

    #[instrument(skip_all)]
    pub async fn refund_query(&self, params: Params) -> Result<Params> {
        self.call(urls::REFUND_QUERY, params).await
    }

    /// Cancels a payment code charge.
    #[instrument(skip_all)]
    pub async fn reverse(&self, params: Params) -> Result<Params> {
        self.call_with_cert(urls::REVERSE, params).await
    }

    #[instrument(skip_all)]
    pub async fn close_order(&self, params: Params) -> Result<Params> {
        self.call(urls::CLOSE_ORDER, params).await
    }

    /// Downloads a statement. See [`process_download`] for the result shape.
    #[instrument(skip_all)]
    pub async fn download_bill(&self, params: Params) -> Result<Params> {
        let body = self
            .post_without_cert(&self.endpoint(urls::DOWNLOAD_BILL), params)
            .await?;
        process_download(body)
    }

    /// Downloads the fund flow. See [`process_download`] for the result shape.
    #[instrument(skip_all)]
    pub async fn download_fund_flow(&self, params: Params) -> Result<Params> {
        let body = self
            .post_with_cert(
                &self.endpoint(urls::DOWNLOAD_FUND_FLOW),
                params,
                RequestKind::Standard,
            )
            .await?;
        process_download(body)
    }

    /// Reports call quality to the gateway.
    #[instrument(skip_all)]
    pub async fn report(&self, params: Params) -> Result<Params> {
        self.call(urls::REPORT, params).await
    }

    #[instrument(skip_all)]
    pub async fn short_url(&self, params: Params) -> Result<Params> {
        self.call(urls::SHORT_URL, params).await
    }

    #[instrument(skip_all)]
    pub async fn auth_code_to_openid(&self, params: Params) -> Result<Params> {
        self.call(urls::AUTH_CODE_TO_OPENID, params).await
    }

    /// Transfers money from the merchant to a user's wallet.
    ///
    /// Uses the transfer identity fields and always targets production. The
    /// response is returned without signature verification.
    #[instrument(skip_all)]
    pub async fn mch_to_cash(&self, params: Params) -> Result<Params> {
        let url = format!("{}{}", self.api_base, urls::MCH_TO_CASH);
        let body = self
            .post_with_cert(&url, params, RequestKind::MchToWallet)
            .await?;
        self.process_response_xml(&body, Verification::TrustWithoutVerification)
    }

    /// Exchanges an OAuth code for the user's openid.
    ///
    /// Reads `appsecret` and `auth_code` from `params`. Unlike the other
    /// operations this is a JSON GET against the open platform host.
    #[instrument(skip_all)]
    pub async fn auth_code_to_openid_mch(&self, params: Params) -> Result<String> {
        let url = format!("{}{}", self.open_api_base, urls::OAUTH2_ACCESS_TOKEN);
        let query = [
            ("appid", self.account.app_id()),
            ("secret", params.get_string("appsecret")),
            ("code", params.get_string("auth_code")),
            ("grant_type", "authorization_code"),
        ];
        let result = self.get_json(&url, &query).await?;
        result
            .get(OPENID)
            .and_then(|v| v.as_str())
            .map(str::to_owned)
            .ok_or_else(|| Error::Configuration("Invalid response: no openid".into()))
    }
}
