use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::activity::Activity;
use super::dwelling::DwellingRef;
use super::error::SimulationError;
use super::markov::HeterogeneousMarkovChain;

/// Identity of one simulated occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PersonId(pub u32);

struct PersonState {
    chain: Arc<HeterogeneousMarkovChain>,
    activity: Activity,
    home: DwellingRef,
    current_dwelling: Option<DwellingRef>,
    current_time: DateTime<Utc>,
    time_step: chrono::Duration,
}

/// Shared handle to one occupant agent.
///
/// The person's activity and dwelling-membership pointer are exclusively
/// owned behind this handle and mutated only by the agent's own [`step`];
/// collaborators observe the agent through the asynchronous accessors.
///
/// [`step`]: PersonRef::step
#[derive(Clone)]
pub struct PersonRef {
    id: PersonId,
    state: Arc<RwLock<PersonState>>,
}

impl PersonRef {
    /// Creates a person with no dwelling membership yet; use
    /// [`move_into`](PersonRef::move_into) for the initial placement.
    pub fn new(
        id: PersonId,
        chain: Arc<HeterogeneousMarkovChain>,
        initial_activity: Activity,
        home: DwellingRef,
        start_time: DateTime<Utc>,
        time_step: chrono::Duration,
    ) -> Self {
        Self {
            id,
            state: Arc::new(RwLock::new(PersonState {
                chain,
                activity: initial_activity,
                home,
                current_dwelling: None,
                current_time: start_time,
                time_step,
            })),
        }
    }

    pub fn id(&self) -> PersonId {
        self.id
    }

    pub async fn current_activity(&self) -> Activity {
        self.state.read().await.activity
    }

    /// Places the person in a dwelling, recording it both in the person's
    /// membership pointer and the dwelling's occupant set. Intended for
    /// initial placement; subsequent movement happens through [`step`].
    ///
    /// [`step`]: PersonRef::step
    pub async fn move_into(&self, dwelling: &DwellingRef) {
        {
            let mut state = self.state.write().await;
            state.current_dwelling = Some(dwelling.clone());
        }
        dwelling.enter(self.clone()).await;
    }

    /// Advances the person by one time step.
    ///
    /// Samples the next activity from the chain at the person's current
    /// timestamp, advances the person's clock by one step, and reconciles
    /// dwelling membership: a transition into the at-home subset enters the
    /// home dwelling, a transition out of it leaves the current one.
    pub async fn step(&self) -> Result<(), SimulationError> {
        let (to_leave, to_enter) = {
            let mut state = self.state.write().await;
            let next = state.chain.next_activity(state.activity, state.current_time)?;
            state.current_time = state.current_time + state.time_step;
            state.activity = next;

            let desired = if next.is_at_home() {
                Some(state.home.clone())
            } else {
                None
            };
            let current = state.current_dwelling.clone();
            let moved = match (&current, &desired) {
                (Some(from), Some(to)) => from.id() != to.id(),
                (None, None) => false,
                _ => true,
            };
            if moved {
                state.current_dwelling = desired.clone();
                (current, desired)
            } else {
                (None, None)
            }
        };

        if let Some(dwelling) = to_leave {
            dwelling.leave(self.id).await;
        }
        if let Some(dwelling) = to_enter {
            dwelling.enter(self.clone()).await;
        }
        Ok(())
    }
}
