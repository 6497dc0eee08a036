use async_trait::async_trait;
use futures::future;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use super::dwelling::{DwellingId, DwellingRef};
use super::error::SimulationError;

/// Result-capture collaborator, invoked once per tick after both agent
/// stages have settled. The persistence format is up to the implementation.
#[async_trait]
pub trait DataLogger: Send + Sync {
    async fn step(&self) -> Result<(), SimulationError>;
}

/// One dwelling's state captured at the end of a tick.
#[derive(Debug, Clone, Serialize)]
pub struct DwellingReading {
    pub dwelling: u32,
    pub temperature: f64,
    pub thermal_power: f64,
}

/// All readings of one tick.
#[derive(Debug, Clone, Serialize)]
pub struct TickRecord {
    pub tick: u64,
    pub readings: Vec<DwellingReading>,
}

/// In-memory logger that snapshots every dwelling's indoor temperature and
/// thermal power once per tick.
pub struct TemperatureLogger {
    dwellings: Vec<DwellingRef>,
    records: Mutex<Vec<TickRecord>>,
}

impl TemperatureLogger {
    pub fn new(dwellings: Vec<DwellingRef>) -> Self {
        Self {
            dwellings,
            records: Mutex::new(Vec::new()),
        }
    }

    /// All records captured so far, in tick order.
    pub fn records(&self) -> Vec<TickRecord> {
        self.records.lock().clone()
    }
}

#[async_trait]
impl DataLogger for TemperatureLogger {
    async fn step(&self) -> Result<(), SimulationError> {
        let readings = future::join_all(self.dwellings.iter().map(|dwelling| async move {
            let DwellingId(id) = dwelling.id();
            DwellingReading {
                dwelling: id,
                temperature: dwelling.current_temperature().await,
                thermal_power: dwelling.current_thermal_power().await,
            }
        }))
        .await;

        let mut records = self.records.lock();
        let tick = records.len() as u64;
        debug!(tick, dwellings = readings.len(), "captured dwelling readings");
        records.push(TickRecord { tick, readings });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::dwelling::{DwellingId, DwellingParams, DwellingRef};
    use crate::sim::environment::ConstantEnvironment;
    use crate::sim::strategy::PresenceBasedStrategy;
    use chrono::{TimeZone, Utc};
    use std::sync::Arc;

    fn test_dwelling(id: u32, initial_temperature: f64) -> DwellingRef {
        DwellingRef::new(
            DwellingId(id),
            DwellingParams {
                heat_mass_capacity: 1.65e8,
                heat_transmission: 200.0,
                maximum_heating_power: 10_000.0,
                conditioned_floor_area: 100.0,
                time_step: chrono::Duration::hours(1),
            },
            initial_temperature,
            Utc.with_ymd_and_hms(2017, 1, 2, 0, 0, 0).unwrap(),
            Arc::new(PresenceBasedStrategy::new(21.0, 18.0)),
            Arc::new(ConstantEnvironment::new(10.0)),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_logger_captures_one_record_per_tick() {
        let dwellings = vec![test_dwelling(0, 20.0), test_dwelling(1, 15.0)];
        let logger = TemperatureLogger::new(dwellings);

        logger.step().await.unwrap();
        logger.step().await.unwrap();

        let records = logger.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].tick, 0);
        assert_eq!(records[1].tick, 1);
        assert_eq!(records[0].readings.len(), 2);
        assert_eq!(records[0].readings[0].temperature, 20.0);
        assert_eq!(records[0].readings[1].temperature, 15.0);
    }
}
