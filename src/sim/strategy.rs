use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future;

use super::error::SimulationError;
use super::person::PersonRef;

/// A control strategy for the heating system of dwellings.
///
/// A strategy is a potentially dynamic controller deciding on the heating
/// set point. It can base its decision on the current point in time and on
/// the people occupying the dwelling, but doesn't have to. Resolving
/// occupant activities requires asynchronous reads from each occupant,
/// hence the asynchronous contract.
#[async_trait]
pub trait HeatingControlStrategy: Send + Sync {
    /// Determines the current set point for a dwelling's heating system.
    ///
    /// `None` demands that the heating be switched off.
    async fn heating_set_point(
        &self,
        timestamp: DateTime<Utc>,
        occupants: &[PersonRef],
    ) -> Result<Option<f64>, SimulationError>;
}

/// A strategy based solely on people presence in a dwelling.
///
/// One set point applies while at least one occupant is active at home, one
/// while everyone present is asleep, and with nobody home the heating is
/// switched off.
#[derive(Debug, Clone, Copy)]
pub struct PresenceBasedStrategy {
    set_point_while_active: f64,
    set_point_while_asleep: f64,
}

impl PresenceBasedStrategy {
    pub fn new(set_point_while_active: f64, set_point_while_asleep: f64) -> Self {
        Self {
            set_point_while_active,
            set_point_while_asleep,
        }
    }
}

#[async_trait]
impl HeatingControlStrategy for PresenceBasedStrategy {
    async fn heating_set_point(
        &self,
        _timestamp: DateTime<Utc>,
        occupants: &[PersonRef],
    ) -> Result<Option<f64>, SimulationError> {
        let activities =
            future::join_all(occupants.iter().map(|person| person.current_activity())).await;

        // An occupant outside the at-home subset means the agent state is
        // corrupted; this must stop the run rather than be skipped.
        if let Some(&activity) = activities.iter().find(|activity| !activity.is_at_home()) {
            return Err(SimulationError::InconsistentOccupant { activity });
        }

        if activities.is_empty() {
            Ok(None)
        } else if activities.iter().all(|activity| activity.is_asleep()) {
            Ok(Some(self.set_point_while_asleep))
        } else {
            Ok(Some(self.set_point_while_active))
        }
    }
}
