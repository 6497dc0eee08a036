use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::environment::Environment;
use super::error::SimulationError;
use super::person::{PersonId, PersonRef};
use super::strategy::HeatingControlStrategy;

/// Identity of one dwelling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DwellingId(pub u32);

/// Reference heating power density used to probe the thermal response.
const REFERENCE_POWER_PER_SQUARE_METRE: f64 = 10.0; // W/m²

/// Static thermal parameters of a dwelling.
#[derive(Debug, Clone)]
pub struct DwellingParams {
    /// Capacity of the dwelling's heat mass [J/K].
    pub heat_mass_capacity: f64,
    /// Heat transmission to the outside [W/K].
    pub heat_transmission: f64,
    /// Maximum heating power [W], must be non-negative.
    pub maximum_heating_power: f64,
    /// Conditioned floor area [m²].
    pub conditioned_floor_area: f64,
    /// Time step size of the dwelling simulation.
    pub time_step: chrono::Duration,
}

impl DwellingParams {
    /// One step of the first-order RC recurrence at the given heating power.
    fn next_temperature(&self, current: f64, outdoor: f64, thermal_power: f64) -> f64 {
        let dt_by_cm =
            self.time_step.num_milliseconds() as f64 / 1000.0 / self.heat_mass_capacity;
        current * (1.0 - dt_by_cm * self.heat_transmission)
            + dt_by_cm * (thermal_power + self.heat_transmission * outdoor)
    }

    /// Resolves the heating power for one step and returns the committed
    /// `(next temperature, thermal power)` pair.
    ///
    /// With no set point, or with the zero-power projection already meeting
    /// it, the heating stays off: the system never actively cools. Otherwise
    /// the affine-in-power recurrence is solved by linear interpolation
    /// through a reference probe, and the result is clamped by substituting
    /// the configured maximum as-is whenever its magnitude is exceeded.
    fn resolve_heating(&self, current: f64, outdoor: f64, set_point: Option<f64>) -> (f64, f64) {
        let no_power = 0.0;
        let next_temperature_no_power = self.next_temperature(current, outdoor, no_power);
        let set_point = match set_point {
            Some(target) if next_temperature_no_power < target => target,
            _ => return (next_temperature_no_power, no_power),
        };

        let reference_power = REFERENCE_POWER_PER_SQUARE_METRE * self.conditioned_floor_area;
        let next_temperature_reference = self.next_temperature(current, outdoor, reference_power);
        let unrestricted_power = reference_power * (set_point - next_temperature_no_power)
            / (next_temperature_reference - next_temperature_no_power);
        let thermal_power = if unrestricted_power.abs() <= self.maximum_heating_power {
            unrestricted_power
        } else {
            self.maximum_heating_power
        };
        (
            self.next_temperature(current, outdoor, thermal_power),
            thermal_power,
        )
    }
}

struct DwellingState {
    current_temperature: f64,
    current_thermal_power: f64,
    current_time: DateTime<Utc>,
}

struct DwellingCell {
    id: DwellingId,
    params: DwellingParams,
    strategy: Arc<dyn HeatingControlStrategy>,
    environment: Arc<dyn Environment>,
    state: RwLock<DwellingState>,
    occupants: RwLock<HashMap<PersonId, PersonRef>>,
}

/// Shared handle to one dwelling agent.
///
/// A simple energy model of a dwelling: one thermal capacity and one
/// resistance, derived from the hourly dynamic model of the ISO 13790. It
/// models heating energy demand only.
///
/// Temperature and power are exclusively owned and mutated only during the
/// dwelling's own [`step`]; the occupant set accepts concurrent idempotent
/// [`enter`]/[`leave`] calls from people moving during the same stage.
///
/// [`step`]: DwellingRef::step
/// [`enter`]: DwellingRef::enter
/// [`leave`]: DwellingRef::leave
#[derive(Clone)]
pub struct DwellingRef {
    cell: Arc<DwellingCell>,
}

impl DwellingRef {
    pub fn new(
        id: DwellingId,
        params: DwellingParams,
        initial_temperature: f64,
        start_time: DateTime<Utc>,
        strategy: Arc<dyn HeatingControlStrategy>,
        environment: Arc<dyn Environment>,
    ) -> Result<Self, SimulationError> {
        if !(params.maximum_heating_power >= 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "maximum heating power must be non-negative, got {}",
                params.maximum_heating_power
            )));
        }
        if !(params.heat_mass_capacity > 0.0) {
            return Err(SimulationError::InvalidParameter(format!(
                "heat mass capacity must be positive, got {}",
                params.heat_mass_capacity
            )));
        }
        Ok(Self {
            cell: Arc::new(DwellingCell {
                id,
                params,
                strategy,
                environment,
                state: RwLock::new(DwellingState {
                    current_temperature: initial_temperature,
                    current_thermal_power: 0.0,
                    current_time: start_time,
                }),
                occupants: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn id(&self) -> DwellingId {
        self.cell.id
    }

    pub async fn current_temperature(&self) -> f64 {
        self.cell.state.read().await.current_temperature
    }

    pub async fn current_thermal_power(&self) -> f64 {
        self.cell.state.read().await.current_thermal_power
    }

    pub async fn occupant_count(&self) -> usize {
        self.cell.occupants.read().await.len()
    }

    /// Records a person as an occupant. Adding an already-present occupant
    /// is a no-op.
    pub async fn enter(&self, person: PersonRef) {
        self.cell.occupants.write().await.insert(person.id(), person);
    }

    /// Removes a person from the occupant set. Removing an absent occupant
    /// is a no-op.
    pub async fn leave(&self, person: PersonId) {
        self.cell.occupants.write().await.remove(&person);
    }

    /// Performs dwelling simulation for the next time step.
    ///
    /// Reads the outdoor temperature, asks the control strategy for the
    /// current set point given the occupants, then resolves the heating
    /// power and advances the indoor temperature.
    pub async fn step(&self) -> Result<(), SimulationError> {
        let outdoor_temperature = self.cell.environment.current_temperature().await?;
        let (timestamp, occupants) = {
            let state = self.cell.state.read().await;
            let occupants: Vec<PersonRef> =
                self.cell.occupants.read().await.values().cloned().collect();
            (state.current_time, occupants)
        };
        let set_point = self
            .cell
            .strategy
            .heating_set_point(timestamp, &occupants)
            .await?;

        let mut state = self.cell.state.write().await;
        let (next_temperature, thermal_power) = self.cell.params.resolve_heating(
            state.current_temperature,
            outdoor_temperature,
            set_point,
        );
        state.current_temperature = next_temperature;
        state.current_thermal_power = thermal_power;
        state.current_time = state.current_time + self.cell.params.time_step;
        Ok(())
    }
}
