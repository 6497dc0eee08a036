use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use parking_lot::Mutex;
use rand::distributions::{Distribution, WeightedError, WeightedIndex};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::activity::{Activity, DayType};
use super::error::SimulationError;

const SECONDS_PER_DAY: i64 = 86_400;

/// Outgoing transition distributions of one (day-type, slot) combination.
///
/// One holder per slot; each source activity maps to a weighted draw over
/// destination activities.
#[derive(Debug)]
pub struct SlotChain {
    by_source: HashMap<Activity, Transitions>,
}

#[derive(Debug)]
struct Transitions {
    destinations: Vec<Activity>,
    weights: WeightedIndex<f64>,
}

impl SlotChain {
    /// Builds the per-source distributions from `(from, to, probability)`
    /// rows. The caller is responsible for validating that each source's
    /// probability mass sums to one.
    pub fn from_transitions(
        transitions: &[(Activity, Activity, f64)],
    ) -> Result<Self, WeightedError> {
        let mut grouped: HashMap<Activity, Vec<(Activity, f64)>> = HashMap::new();
        for &(from, to, probability) in transitions {
            grouped.entry(from).or_default().push((to, probability));
        }

        let mut by_source = HashMap::with_capacity(grouped.len());
        for (from, rows) in grouped {
            let destinations: Vec<Activity> = rows.iter().map(|&(to, _)| to).collect();
            let weights = WeightedIndex::new(rows.iter().map(|&(_, p)| p))?;
            by_source.insert(
                from,
                Transitions {
                    destinations,
                    weights,
                },
            );
        }
        Ok(SlotChain { by_source })
    }

    fn sample(&self, from: Activity, rng: &mut StdRng) -> Activity {
        match self.by_source.get(&from) {
            Some(transitions) => transitions.destinations[transitions.weights.sample(rng)],
            // No configured outgoing rows: self-loop with probability 1.
            None => from,
        }
    }
}

/// A time-heterogeneous Markov chain over [`Activity`] states.
///
/// Transition distributions are keyed by (day-type, time slot) in the chain's
/// configured time zone, where slots form a fixed grid starting at local
/// midnight. The chain owns a private, deterministically seeded random
/// stream: the same seed and the same sequence of calls yield the same
/// outputs. Immutable after construction apart from that stream.
#[derive(Debug)]
pub struct HeterogeneousMarkovChain {
    weekday: HashMap<NaiveTime, SlotChain>,
    weekend: HashMap<NaiveTime, SlotChain>,
    time_zone: Tz,
    step_seconds: u32,
    rng: Mutex<StdRng>,
}

impl HeterogeneousMarkovChain {
    /// The time step must evenly divide a day; `weekday`/`weekend` are
    /// expected to hold one [`SlotChain`] per grid slot.
    pub fn new(
        weekday: HashMap<NaiveTime, SlotChain>,
        weekend: HashMap<NaiveTime, SlotChain>,
        time_zone: Tz,
        time_step: chrono::Duration,
        seed: u64,
    ) -> Result<Self, SimulationError> {
        let step_seconds = time_step.num_seconds();
        if step_seconds <= 0 || SECONDS_PER_DAY % step_seconds != 0 {
            return Err(SimulationError::InvalidParameter(format!(
                "chain time step of {step_seconds}s must evenly divide a day"
            )));
        }
        Ok(Self {
            weekday,
            weekend,
            time_zone,
            step_seconds: step_seconds as u32,
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        })
    }

    /// Samples the activity for the next time step.
    ///
    /// `timestamp` is localized to the chain's time zone to derive the
    /// (day-type, slot) key. A source activity without configured outgoing
    /// rows self-loops with probability 1; an entirely missing slot table is
    /// a fault.
    pub fn next_activity(
        &self,
        current: Activity,
        timestamp: DateTime<Utc>,
    ) -> Result<Activity, SimulationError> {
        let (day, slot) = self.localize(timestamp);
        let table = match day {
            DayType::Weekday => &self.weekday,
            DayType::Weekend => &self.weekend,
        };
        let chain = table
            .get(&slot)
            .ok_or(SimulationError::MissingSlot { day, slot })?;
        let mut rng = self.rng.lock();
        Ok(chain.sample(current, &mut rng))
    }

    /// Derives the (day-type, slot) pair of a timestamp in the chain's zone.
    fn localize(&self, timestamp: DateTime<Utc>) -> (DayType, NaiveTime) {
        let local = timestamp.with_timezone(&self.time_zone);
        let day = DayType::from_weekday(local.weekday());
        let seconds = local.time().num_seconds_from_midnight();
        let aligned = seconds - seconds % self.step_seconds;
        let slot = NaiveTime::from_num_seconds_from_midnight_opt(aligned, 0)
            .expect("aligned slot seconds stay within one day");
        (day, slot)
    }

    /// All slot start times of one day for the given step size.
    pub fn slots_of_day(time_step: chrono::Duration) -> Vec<NaiveTime> {
        let step = time_step.num_seconds().max(1) as u32;
        (0..SECONDS_PER_DAY as u32)
            .step_by(step as usize)
            .filter_map(|s| NaiveTime::from_num_seconds_from_midnight_opt(s, 0))
            .collect()
    }
}
