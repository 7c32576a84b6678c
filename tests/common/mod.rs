use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, header::CONTENT_TYPE},
    routing::{get, post},
};
use axum_server::tls_openssl::{OpenSSLAcceptor, OpenSSLConfig};
use openssl::pkey::{PKey, Private};
use openssl::ssl::{SslAcceptor, SslMethod, SslVerifyMode};
use openssl::x509::X509;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wxpay_client::{
    Account, Client, Params, SignType,
    sign::{sign, verify},
    telemetry,
    xml::{from_xml, to_xml},
};

pub const APP_ID: &str = "wx2421b1c4370ec43b";
pub const MCH_ID: &str = "10000100";
pub const API_KEY: &str = "192006250b4c09247ec02edce69f6a2d";
pub const BILL_CSV: &str = "交易时间,公众账号ID,商户号,总交易单数\n`2014-06-13 11:45:40,`wx2421b1c4370ec43b,`10000100,`1\n";

/// A request as seen by the mock gateway.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub content_type: String,
    pub params: Params,
}

#[derive(Clone)]
pub struct MockGateway {
    sign_type: SignType,
    requests: Arc<Mutex<Vec<Recorded>>>,
}

impl MockGateway {
    pub fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }

    pub fn last_request(&self) -> Recorded {
        self.requests().pop().expect("no request recorded")
    }

    fn record(&self, path: &str, headers: &HeaderMap, body: &str) -> Params {
        let params = from_xml(body).expect("request body is not XML");
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        self.requests.lock().unwrap().push(Recorded {
            path: path.to_string(),
            content_type,
            params: params.clone(),
        });
        params
    }

    fn request_sign_type(&self, params: &Params) -> SignType {
        params
            .get("sign_type")
            .map(|s| s.parse().expect("unknown sign_type"))
            .unwrap_or(self.sign_type)
    }

    fn signed(&self, mut params: Params, sign_type: SignType) -> String {
        params.set("sign", sign(&params, API_KEY, sign_type).unwrap());
        to_xml(&params).unwrap()
    }

    /// Echoes a signed SUCCESS response, or a FAIL when the request signature is wrong.
    fn answer(&self, request: &Params) -> String {
        let sign_type = self.request_sign_type(request);
        if !verify(request, API_KEY, sign_type).unwrap() {
            return to_xml(&fail("签名错误")).unwrap();
        }
        let mut response = Params::new()
            .with("return_code", "SUCCESS")
            .with("return_msg", "OK")
            .with("result_code", "SUCCESS")
            .with("nonce_str", "5K8264ILTKCH16CQ2502SI8ZNMTM67VS");
        for key in ["appid", "mch_id", "out_trade_no", "out_refund_no"] {
            if let Some(value) = request.get(key) {
                response.set(key, value);
            }
        }
        self.signed(response, sign_type)
    }
}

pub fn fail(msg: &str) -> Params {
    Params::new()
        .with("return_code", "FAIL")
        .with("return_msg", msg)
}

async fn echo(
    State(gw): State<MockGateway>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> String {
    let request = gw.record(uri.path(), &headers, &body);
    gw.answer(&request)
}

async fn tampered(
    State(gw): State<MockGateway>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> String {
    let request = gw.record(uri.path(), &headers, &body);
    let mut params = from_xml(&gw.answer(&request)).unwrap();
    params.set("result_code", "FAIL");
    to_xml(&params).unwrap()
}

async fn unsigned_fail(
    State(gw): State<MockGateway>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> String {
    gw.record(uri.path(), &headers, &body);
    to_xml(&fail("LONG_URL_INVALID")).unwrap()
}

async fn no_return_code(
    State(gw): State<MockGateway>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> String {
    gw.record(uri.path(), &headers, &body);
    "<xml><result_code>SUCCESS</result_code></xml>".to_string()
}

async fn transfer(
    State(gw): State<MockGateway>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> String {
    gw.record(uri.path(), &headers, &body);
    "<xml><return_code>SUCCESS</return_code><result_code>SUCCESS</result_code>\
     <payment_no>1000018301201505190181489473</payment_no></xml>"
        .to_string()
}

async fn download(
    State(gw): State<MockGateway>,
    uri: axum::http::Uri,
    headers: HeaderMap,
    body: String,
) -> String {
    let request = gw.record(uri.path(), &headers, &body);
    if request.get_string("bill_date") == "20140603" {
        BILL_CSV.to_string()
    } else {
        to_xml(&fail("No Bill Exist")).unwrap()
    }
}

async fn slow(State(gw): State<MockGateway>, headers: HeaderMap, body: String) -> String {
    tokio::time::sleep(Duration::from_millis(500)).await;
    let request = gw.record("/pay/micropay", &headers, &body);
    gw.answer(&request)
}

async fn access_token(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let valid = query.get("appid").map(String::as_str) == Some(APP_ID)
        && query.get("secret").map(String::as_str) == Some("app-secret")
        && query.get("grant_type").map(String::as_str) == Some("authorization_code");
    if valid && query.get("code").map(String::as_str) == Some("good-code") {
        Json(json!({
            "access_token": "ACCESS_TOKEN",
            "expires_in": 7200,
            "openid": "oUpF8uMuAJO_M2pxb1Q9zNjWeS6o",
            "scope": "snsapi_base"
        }))
    } else {
        Json(json!({ "errcode": 40029, "errmsg": "invalid code" }))
    }
}

fn gateway(sign_type: SignType) -> MockGateway {
    telemetry::init_tracing();
    MockGateway {
        sign_type,
        requests: Arc::default(),
    }
}

fn router(gateway: MockGateway) -> Router {
    Router::new()
        .route("/pay/unifiedorder", post(echo))
        .route("/sandboxnew/pay/unifiedorder", post(echo))
        .route("/pay/orderquery", post(echo))
        .route("/pay/refundquery", post(echo))
        .route("/secapi/pay/refund", post(echo))
        .route("/secapi/pay/reverse", post(echo))
        .route("/tools/authcodetoopenid", post(echo))
        .route("/pay/closeorder", post(tampered))
        .route("/tools/shorturl", post(unsigned_fail))
        .route("/payitil/report", post(no_return_code))
        .route("/mmpaymkttransfers/promotion/transfers", post(transfer))
        .route("/pay/downloadbill", post(download))
        .route("/pay/downloadfundflow", post(download))
        .route("/pay/micropay", post(slow))
        .route("/sns/oauth2/access_token", get(access_token))
        .with_state(gateway)
}

/// Spawns the mock gateway on a random port and returns its base URL.
pub async fn spawn_gateway(sign_type: SignType) -> (String, MockGateway) {
    let gateway = gateway(sign_type);
    let app = router(gateway.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("failed to run mock gateway");
    });

    (format!("http://{addr}"), gateway)
}

/// Spawns the mock gateway behind TLS, requiring a client certificate issued
/// by `client_ca`.
pub async fn spawn_tls_gateway(
    sign_type: SignType,
    server_cert: &X509,
    server_key: &PKey<Private>,
    client_ca: &X509,
) -> (String, MockGateway) {
    let gateway = gateway(sign_type);
    let app = router(gateway.clone());

    let mut builder = SslAcceptor::mozilla_intermediate_v5(SslMethod::tls_server()).unwrap();
    builder.set_certificate(server_cert).unwrap();
    builder.set_private_key(server_key).unwrap();
    builder.cert_store_mut().add_cert(client_ca.clone()).unwrap();
    builder.set_verify(SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT);
    let config = OpenSSLConfig::from_acceptor(Arc::new(builder.build()));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.set_nonblocking(true).unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum_server::from_tcp(listener).acceptor(OpenSSLAcceptor::new(config))
            .serve(app.into_make_service())
            .await
            .expect("failed to run TLS mock gateway");
    });

    (format!("https://{addr}"), gateway)
}

/// A client pointed at the mock gateway.
pub fn client_for(base: &str, sign_type: SignType, sandbox: bool) -> Client {
    let mut client = Client::new(Account::new(APP_ID, MCH_ID, API_KEY, sandbox));
    client.set_sign_type(sign_type);
    client.set_api_base(base);
    client.set_open_api_base(base);
    client
}
