use std::str::FromStr;

use anyhow::{Context, Result};

use crate::domain::coupon::CouponPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub payment: PaymentConfig,
    pub coupon: CouponPolicy,
    pub otp_ttl_secs: u64,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct PaymentConfig {
    /// Shared secret presented by the trusted payment backend.
    pub backend_secret: String,
}

pub fn load() -> Result<Config> {
    Ok(Config {
        database: DatabaseConfig {
            url: required("DATABASE_URL")?,
        },
        server: ServerConfig {
            port: parsed_or("PORT", 5002)?,
        },
        payment: PaymentConfig {
            backend_secret: required("PAYMENT_BACKEND_SECRET")?,
        },
        coupon: CouponPolicy {
            min_length: parsed_or("COUPON_MIN_LENGTH", 8)?,
            max_length: parsed_or("COUPON_MAX_LENGTH", 12)?,
            min_discount: parsed_or("COUPON_MIN_DISCOUNT", 5)?,
            max_discount: parsed_or("COUPON_MAX_DISCOUNT", 10)?,
            expiry_days: parsed_or("COUPON_EXPIRY_DAYS", 30)?,
        },
        otp_ttl_secs: parsed_or("OTP_TTL_SECS", 120)?,
    })
}

fn required(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("missing required environment variable {key}"))
}

fn parsed_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("invalid value for environment variable {key}")),
        Err(_) => Ok(default),
    }
}
