use chrono::NaiveTime;
use thiserror::Error;

use super::activity::{Activity, DayType};

/// Run-time simulation faults.
///
/// Every variant is terminal: a fault anywhere in a tick stage fails that
/// stage's join and aborts the whole run. There are no retries.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// A dwelling occupant was observed in a non-home activity during a
    /// heating decision. This indicates corrupted agent state, never bad
    /// input, and must stop the run.
    #[error(
        "occupant holds non-home activity {activity} during a heating decision; \
         agent state is corrupted"
    )]
    InconsistentOccupant { activity: Activity },

    #[error("no transition table for {day} slot {slot}")]
    MissingSlot { day: DayType, slot: NaiveTime },

    #[error("invalid agent parameter: {0}")]
    InvalidParameter(String),

    /// Failure surfaced by an external collaborator (environment, logger).
    #[error("collaborator failure: {0}")]
    Collaborator(String),

    /// Terminal signal raised through the host tick contract when a run ends.
    #[error("end of simulation")]
    EndOfSimulation,
}
