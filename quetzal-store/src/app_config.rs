use serde::Deserialize;
use std::env;
use uuid::Uuid;

use quetzal_catalog::FareRules;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub fares: FareRules,
    pub import: ImportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Bulk-import settings. Imported records carry no flight reference of
/// their own, so every record lands on this flight.
#[derive(Debug, Deserialize, Clone)]
pub struct ImportConfig {
    pub flight_id: Uuid,
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(config::File::with_name("config/local").required(false))
            // Eg. `QUETZAL__DATABASE__URL=...` overrides `database.url`
            .add_source(config::Environment::with_prefix("QUETZAL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
