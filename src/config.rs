use anyhow::{Context, Result, bail};
use compute::ComputeServices;
use moka::future::Cache;
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::auth::AuthKeys;
use crate::schemas::AppState;

const MIN_PASSWORD_COST: u32 = 4;
const MAX_PASSWORD_COST: u32 = 31;

/// Runtime settings.
///
/// Layered from built-in defaults, an optional `poupabem.{toml,yaml,json}`
/// file in the working directory, then `POUPABEM_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// HMAC secret signing session tokens, required
    pub jwt_secret: String,
    pub token_ttl_hours: i64,
    /// bcrypt cost factor
    pub password_cost: u32,
    /// How long a verified token's user stays cached
    pub session_cache_ttl_secs: u64,
    /// Fraction of a ceiling at which `near_limit` fires
    pub near_limit_ratio: Decimal,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // `load` has no default for it, so a missing secret fails startup
            jwt_secret: String::new(),
            token_ttl_hours: 24,
            password_cost: bcrypt::DEFAULT_COST,
            session_cache_ttl_secs: 300,
            near_limit_ratio: compute::budget::DEFAULT_NEAR_LIMIT_RATIO,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    pub fn load() -> Result<Self> {
        let defaults = Settings::default();
        let settings: Settings = config::Config::builder()
            .set_default("token_ttl_hours", defaults.token_ttl_hours)?
            .set_default("password_cost", i64::from(defaults.password_cost))?
            .set_default("session_cache_ttl_secs", defaults.session_cache_ttl_secs as i64)?
            .set_default("near_limit_ratio", defaults.near_limit_ratio.to_string())?
            .set_default("request_timeout_secs", defaults.request_timeout_secs as i64)?
            .add_source(config::File::with_name("poupabem").required(false))
            .add_source(config::Environment::with_prefix("POUPABEM"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        if self.jwt_secret.trim().is_empty() {
            bail!("jwt_secret must be set (POUPABEM_JWT_SECRET)");
        }
        if self.token_ttl_hours <= 0 {
            bail!("token_ttl_hours must be positive");
        }
        if !(MIN_PASSWORD_COST..=MAX_PASSWORD_COST).contains(&self.password_cost) {
            bail!(
                "password_cost must be between {} and {}",
                MIN_PASSWORD_COST,
                MAX_PASSWORD_COST
            );
        }
        if self.near_limit_ratio <= Decimal::ZERO || self.near_limit_ratio > Decimal::ONE {
            bail!("near_limit_ratio must be in (0, 1]");
        }
        Ok(())
    }
}

/// Builds the shared state around an open connection.
pub fn build_app_state(db: DatabaseConnection, settings: Settings, compute: ComputeServices) -> AppState {
    let cache = Cache::builder()
        .max_capacity(1000)
        .time_to_live(Duration::from_secs(settings.session_cache_ttl_secs))
        .build();
    let auth = AuthKeys::from_secret(&settings.jwt_secret, settings.token_ttl_hours);

    AppState {
        db,
        cache,
        auth,
        compute,
        settings: Arc::new(settings),
    }
}

/// Initialize application configuration and state with a specific database URL
pub async fn initialize_app_state_with_url(database_url: &str) -> Result<AppState> {
    let settings = Settings::load()?;
    debug!("Loaded settings: {:?}", Settings { jwt_secret: "<redacted>".to_string(), ..settings.clone() });

    info!("Connecting to database: {}", database_url);
    let db = Database::connect(database_url)
        .await
        .with_context(|| format!("Failed to connect to database '{}'", database_url))?;

    let compute = ComputeServices::new(None, settings.near_limit_ratio);
    Ok(build_app_state(db, settings, compute))
}
