use anyhow::Result;
use city_energy_sim::config::Config;
use city_energy_sim::sim::{CitySimulation, Simulation, SimulationError};
use city_energy_sim::telemetry::{self, init_tracing};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;
    let (mut city, logger) = CitySimulation::from_config(&cfg).await?;

    info!(
        people = cfg.occupants.count,
        dwellings = cfg.dwellings.count,
        ticks = cfg.simulation.ticks,
        "starting city simulation"
    );

    let shutdown = telemetry::shutdown_signal();
    tokio::pin!(shutdown);

    let mut completed = 0u64;
    for _ in 0..cfg.simulation.ticks {
        tokio::select! {
            _ = &mut shutdown => {
                warn!("interrupted, stopping simulation");
                break;
            }
            result = city.step() => match result {
                Ok(()) => completed += 1,
                Err(SimulationError::EndOfSimulation) => {
                    info!("simulation signalled end of run");
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
    city.stop();

    if let Some(last) = logger.records().last() {
        if !last.readings.is_empty() {
            let mean_temperature = last.readings.iter().map(|r| r.temperature).sum::<f64>()
                / last.readings.len() as f64;
            info!(
                ticks = completed,
                mean_indoor_temperature = mean_temperature,
                "simulation complete"
            );
        }
    }

    Ok(())
}
