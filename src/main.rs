use color_eyre::eyre::{OptionExt, WrapErr};
use wxpay_client::{Params, config::Config, telemetry};

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    dotenvy::dotenv().ok();
    color_eyre::install()?;
    telemetry::init_tracing();

    let out_trade_no = std::env::args()
        .nth(1)
        .ok_or_eyre("usage: wxpay <out_trade_no>")?;

    let config = Config::load().wrap_err("Failed to load configuration")?;
    tracing::info!(
        mch_id = %config.merchant.mch_id,
        sandbox = config.merchant.sandbox,
        "Loaded configuration"
    );

    let client = config.build_client()?;
    let response = client
        .order_query(Params::new().with("out_trade_no", out_trade_no))
        .await?;

    let mut fields: Vec<_> = response.into_iter().collect();
    fields.sort();
    for (key, value) in fields {
        println!("{key}={value}");
    }
    Ok(())
}
