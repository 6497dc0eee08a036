use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use futures::future;
use tracing::{debug, info};

use crate::config::Config;

use super::chain_reader::read_markov_chain_from_path;
use super::dwelling::{DwellingId, DwellingParams, DwellingRef};
use super::environment::{ConstantEnvironment, Environment};
use super::error::SimulationError;
use super::logger::{DataLogger, TemperatureLogger};
use super::person::{PersonId, PersonRef};
use super::strategy::{HeatingControlStrategy, PresenceBasedStrategy};

/// Host-facing contract of a stepped simulation.
///
/// The host invokes [`step`] once per tick and treats any error as terminal;
/// [`SimulationError::EndOfSimulation`] signals a regular end of the run.
///
/// [`step`]: Simulation::step
#[async_trait]
pub trait Simulation: Send {
    /// Advances the simulation by one tick.
    async fn step(&mut self) -> Result<(), SimulationError>;

    /// Teardown hook. Nothing to do by default.
    fn stop(&mut self) {}
}

/// An entire simulation run: all people, all dwellings, and the logger.
///
/// Each tick fans out three strictly ordered stages. People step first so
/// that dwellings observe post-movement occupancy; the logger runs last,
/// once both agent stages have fully settled. Stages are unordered
/// internally and separated by full barriers: every agent of a stage must
/// complete before the next stage starts, and the first failure anywhere in
/// a stage aborts the tick and the run.
pub struct CitySimulation {
    people: Vec<PersonRef>,
    dwellings: Vec<DwellingRef>,
    logger: Arc<dyn DataLogger>,
    completed_ticks: u64,
}

impl CitySimulation {
    pub fn new(
        people: Vec<PersonRef>,
        dwellings: Vec<DwellingRef>,
        logger: Arc<dyn DataLogger>,
    ) -> Self {
        Self {
            people,
            dwellings,
            logger,
            completed_ticks: 0,
        }
    }

    /// Assembles a city from configuration: reads the activity transition
    /// table, creates dwellings sharing one presence-based strategy and one
    /// constant environment, and distributes people round-robin over the
    /// dwellings as their homes.
    pub async fn from_config(config: &Config) -> anyhow::Result<(Self, Arc<TemperatureLogger>)> {
        anyhow::ensure!(
            config.dwellings.count > 0,
            "at least one dwelling is required"
        );

        let time_zone = config.simulation.time_zone()?;
        let time_step = config.simulation.time_step();
        let chain = read_markov_chain_from_path(
            &config.occupants.chain_file,
            time_step,
            config.simulation.seed,
            time_zone,
        )
        .with_context(|| {
            format!(
                "reading activity chain from {}",
                config.occupants.chain_file.display()
            )
        })?;
        let chain = Arc::new(chain);

        let environment: Arc<dyn Environment> =
            Arc::new(ConstantEnvironment::new(config.environment.outdoor_temperature));
        let strategy: Arc<dyn HeatingControlStrategy> = Arc::new(PresenceBasedStrategy::new(
            config.heating.set_point_while_active,
            config.heating.set_point_while_asleep,
        ));

        let params = DwellingParams {
            heat_mass_capacity: config.dwellings.heat_mass_capacity,
            heat_transmission: config.dwellings.heat_transmission,
            maximum_heating_power: config.dwellings.maximum_heating_power,
            conditioned_floor_area: config.dwellings.conditioned_floor_area,
            time_step,
        };
        let dwellings: Vec<DwellingRef> = (0..config.dwellings.count)
            .map(|index| {
                DwellingRef::new(
                    DwellingId(index),
                    params.clone(),
                    config.dwellings.initial_temperature,
                    config.simulation.start_time,
                    strategy.clone(),
                    environment.clone(),
                )
            })
            .collect::<Result<_, _>>()?;

        let mut people = Vec::with_capacity(config.occupants.count as usize);
        for index in 0..config.occupants.count {
            let home = dwellings[index as usize % dwellings.len()].clone();
            let person = PersonRef::new(
                PersonId(index),
                chain.clone(),
                config.occupants.initial_activity,
                home.clone(),
                config.simulation.start_time,
                time_step,
            );
            if config.occupants.initial_activity.is_at_home() {
                person.move_into(&home).await;
            }
            people.push(person);
        }

        let logger = Arc::new(TemperatureLogger::new(dwellings.clone()));
        info!(
            people = people.len(),
            dwellings = dwellings.len(),
            "city assembled"
        );
        Ok((
            Self::new(people, dwellings, logger.clone() as Arc<dyn DataLogger>),
            logger,
        ))
    }
}

#[async_trait]
impl Simulation for CitySimulation {
    async fn step(&mut self) -> Result<(), SimulationError> {
        future::try_join_all(self.people.iter().map(|person| person.step())).await?;
        future::try_join_all(self.dwellings.iter().map(|dwelling| dwelling.step())).await?;
        self.logger.step().await?;
        self.completed_ticks += 1;
        debug!(tick = self.completed_ticks, "tick complete");
        Ok(())
    }
}
