use std::path::PathBuf;

use anyhow::Result;
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::sim::Activity;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub occupants: OccupantsConfig,
    pub dwellings: DwellingsConfig,
    pub heating: HeatingConfig,
    pub environment: EnvironmentConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Wall-clock start of the run, RFC 3339.
    pub start_time: DateTime<Utc>,
    /// Tick duration; must evenly divide a day.
    pub time_step_seconds: i64,
    /// Number of ticks to run.
    pub ticks: u64,
    /// IANA time zone the activity tables are defined in.
    pub time_zone: String,
    /// Seed of the activity chain's private random stream.
    pub seed: u64,
}

impl SimulationConfig {
    pub fn time_step(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.time_step_seconds)
    }

    pub fn time_zone(&self) -> Result<Tz> {
        self.time_zone
            .parse()
            .map_err(|err: String| anyhow::anyhow!("invalid time zone `{}`: {err}", self.time_zone))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OccupantsConfig {
    pub count: u32,
    /// Csv file holding the activity transition table.
    pub chain_file: PathBuf,
    pub initial_activity: Activity,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DwellingsConfig {
    pub count: u32,
    pub heat_mass_capacity: f64,
    pub heat_transmission: f64,
    pub maximum_heating_power: f64,
    pub initial_temperature: f64,
    pub conditioned_floor_area: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeatingConfig {
    pub set_point_while_active: f64,
    pub set_point_while_asleep: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentConfig {
    pub outdoor_temperature: f64,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("CITYSIM__").split("__"));
        Ok(figment.extract()?)
    }
}
