pub mod account;
pub mod client;
pub mod config;
pub mod error;
pub mod params;
pub mod sign;
pub mod telemetry;
pub mod tls;
pub mod xml;

pub use account::Account;
pub use client::{Client, RequestKind, Verification};
pub use error::{Error, Result};
pub use params::Params;
pub use sign::SignType;
