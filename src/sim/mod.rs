//! # City Co-Simulation Core
//!
//! Co-evolves two interacting models over discrete time steps: occupants
//! whose activity follows a day-type- and time-of-day-dependent Markov
//! chain, and dwellings whose indoor temperature follows a first-order
//! thermal-circuit model driven by an occupancy-reactive heating controller.
//!
//! ## Components
//!
//! - **Markov**: the heterogeneous activity chain and its per-slot
//!   transition distributions, built once from tabular data
//! - **Person**: one occupant agent advancing its activity and dwelling
//!   membership per tick
//! - **Dwelling**: one dwelling agent resolving heating power and indoor
//!   temperature per tick
//! - **Strategy**: the heating control capability and its presence-based
//!   implementation
//! - **City**: the orchestrator driving the barrier-synchronized
//!   people → dwellings → logger tick protocol

pub mod activity;
pub mod chain_reader;
pub mod city;
pub mod dwelling;
pub mod environment;
pub mod error;
pub mod logger;
pub mod markov;
pub mod person;
pub mod strategy;

pub use activity::{Activity, DayType};
pub use chain_reader::{read_markov_chain, read_markov_chain_from_path, ChainReadError};
pub use city::{CitySimulation, Simulation};
pub use dwelling::{DwellingId, DwellingParams, DwellingRef};
pub use environment::{ConstantEnvironment, Environment};
pub use error::SimulationError;
pub use logger::{DataLogger, DwellingReading, TemperatureLogger, TickRecord};
pub use markov::{HeterogeneousMarkovChain, SlotChain};
pub use person::{PersonId, PersonRef};
pub use strategy::{HeatingControlStrategy, PresenceBasedStrategy};
