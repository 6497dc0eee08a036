//! Builds [`HeterogeneousMarkovChain`]s from tabular transition data.
//!
//! The source is a csv stream with header columns `day`, `time`,
//! `from_activity`, `to_activity` and `probability`, in any order. Every
//! fault here is a build-time format fault: construction fails before a
//! single simulation tick runs, and no row is ever silently skipped.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike};
use chrono_tz::Tz;
use rand::distributions::WeightedError;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use super::activity::{Activity, DayType};
use super::error::SimulationError;
use super::markov::{HeterogeneousMarkovChain, SlotChain};

const DAY_COLUMN: &str = "day";
const TIME_COLUMN: &str = "time";
const FROM_ACTIVITY_COLUMN: &str = "from_activity";
const TO_ACTIVITY_COLUMN: &str = "to_activity";
const PROBABILITY_COLUMN: &str = "probability";

const REQUIRED_COLUMNS: [&str; 5] = [
    DAY_COLUMN,
    TIME_COLUMN,
    FROM_ACTIVITY_COLUMN,
    TO_ACTIVITY_COLUMN,
    PROBABILITY_COLUMN,
];

const SECONDS_PER_DAY: i64 = 86_400;
const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Error)]
pub enum ChainReadError {
    #[error("failed to open activity chain file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to read activity chain csv: {0}")]
    Csv(#[from] csv::Error),

    #[error("activity chain header must have exactly {expected} columns, found {found}")]
    UnexpectedColumnCount { expected: usize, found: usize },

    #[error("column `{0}` missing from activity chain header")]
    MissingColumn(&'static str),

    #[error("chain time step of {0}s must evenly divide a day")]
    BadStepSize(i64),

    #[error("line {line}: unknown day type `{value}`")]
    BadDayType { line: usize, value: String },

    #[error("line {line}: invalid time-of-day literal `{value}`")]
    BadTime { line: usize, value: String },

    #[error("line {line}: time {value} is not aligned to the {step_seconds}s slot grid")]
    UnalignedTime {
        line: usize,
        value: NaiveTime,
        step_seconds: i64,
    },

    #[error("line {line}: unknown activity `{value}`")]
    BadActivity { line: usize, value: String },

    #[error("line {line}: unparseable probability `{value}`")]
    UnparseableProbability { line: usize, value: String },

    #[error("line {line}: probability {value} is outside [0, 1]")]
    ProbabilityOutOfRange { line: usize, value: f64 },

    #[error("{day} {slot}: outgoing probabilities from {from} sum to {sum}, expected 1")]
    UnnormalizedDistribution {
        day: DayType,
        slot: NaiveTime,
        from: Activity,
        sum: f64,
    },

    #[error("{day} {slot}: invalid transition weights: {source}")]
    InvalidDistribution {
        day: DayType,
        slot: NaiveTime,
        source: WeightedError,
    },

    #[error("chain construction failed: {0}")]
    Chain(#[from] SimulationError),
}

#[derive(Debug, Deserialize)]
struct ChainRow {
    day: String,
    time: String,
    from_activity: String,
    to_activity: String,
    probability: String,
}

#[derive(Debug, Clone, Copy)]
struct ParsedRow {
    day: DayType,
    time: NaiveTime,
    from: Activity,
    to: Activity,
    probability: f64,
}

/// Reads a [`HeterogeneousMarkovChain`] from a csv file on disk.
pub fn read_markov_chain_from_path(
    path: &Path,
    time_step: chrono::Duration,
    seed: u64,
    time_zone: Tz,
) -> Result<HeterogeneousMarkovChain, ChainReadError> {
    let file = std::fs::File::open(path)?;
    read_markov_chain(file, time_step, seed, time_zone)
}

/// Reads a [`HeterogeneousMarkovChain`] from any csv source.
///
/// Useful for testing (pass a `std::io::Cursor`) as well as file input.
pub fn read_markov_chain<R: Read>(
    reader: R,
    time_step: chrono::Duration,
    seed: u64,
    time_zone: Tz,
) -> Result<HeterogeneousMarkovChain, ChainReadError> {
    let step_seconds = time_step.num_seconds();
    if step_seconds <= 0 || SECONDS_PER_DAY % step_seconds != 0 {
        return Err(ChainReadError::BadStepSize(step_seconds));
    }

    let mut csv_reader = csv::Reader::from_reader(reader);
    let headers = csv_reader.headers()?.clone();
    if headers.len() != REQUIRED_COLUMNS.len() {
        return Err(ChainReadError::UnexpectedColumnCount {
            expected: REQUIRED_COLUMNS.len(),
            found: headers.len(),
        });
    }
    for column in REQUIRED_COLUMNS {
        if !headers.iter().any(|header| header == column) {
            return Err(ChainReadError::MissingColumn(column));
        }
    }

    let mut rows = Vec::new();
    for (index, record) in csv_reader.deserialize::<ChainRow>().enumerate() {
        // Header occupies line 1.
        let line = index + 2;
        rows.push(parse_row(record?, line, step_seconds)?);
    }

    let weekday = build_day_table(&rows, DayType::Weekday, time_step)?;
    let weekend = build_day_table(&rows, DayType::Weekend, time_step)?;
    info!(
        rows = rows.len(),
        step_seconds, "loaded activity transition table"
    );
    Ok(HeterogeneousMarkovChain::new(
        weekday, weekend, time_zone, time_step, seed,
    )?)
}

fn parse_row(record: ChainRow, line: usize, step_seconds: i64) -> Result<ParsedRow, ChainReadError> {
    let day = DayType::from_str(record.day.trim()).map_err(|_| ChainReadError::BadDayType {
        line,
        value: record.day.clone(),
    })?;
    let time = parse_time(record.time.trim()).ok_or_else(|| ChainReadError::BadTime {
        line,
        value: record.time.clone(),
    })?;
    if i64::from(time.num_seconds_from_midnight()) % step_seconds != 0 {
        return Err(ChainReadError::UnalignedTime {
            line,
            value: time,
            step_seconds,
        });
    }
    let from =
        Activity::from_str(record.from_activity.trim()).map_err(|_| ChainReadError::BadActivity {
            line,
            value: record.from_activity.clone(),
        })?;
    let to =
        Activity::from_str(record.to_activity.trim()).map_err(|_| ChainReadError::BadActivity {
            line,
            value: record.to_activity.clone(),
        })?;
    let probability = record.probability.trim().parse::<f64>().map_err(|_| {
        ChainReadError::UnparseableProbability {
            line,
            value: record.probability.clone(),
        }
    })?;
    if !(0.0..=1.0).contains(&probability) {
        return Err(ChainReadError::ProbabilityOutOfRange {
            line,
            value: probability,
        });
    }
    Ok(ParsedRow {
        day,
        time,
        from,
        to,
        probability,
    })
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .ok()
}

/// Builds one [`SlotChain`] per grid slot of the given day-type.
///
/// Duplicate `(from, to)` rows follow map semantics: the last row wins.
/// Destination mass is validated per source activity, but only for sources
/// that have configured rows at all; sources without rows fall back to the
/// chain's self-loop policy at sampling time.
fn build_day_table(
    rows: &[ParsedRow],
    day: DayType,
    time_step: chrono::Duration,
) -> Result<HashMap<NaiveTime, SlotChain>, ChainReadError> {
    let mut tables = HashMap::new();
    for slot in HeterogeneousMarkovChain::slots_of_day(time_step) {
        let mut pairs: HashMap<(Activity, Activity), f64> = HashMap::new();
        for row in rows.iter().filter(|r| r.day == day && r.time == slot) {
            pairs.insert((row.from, row.to), row.probability);
        }

        let mut sums: HashMap<Activity, f64> = HashMap::new();
        for (&(from, _), &probability) in &pairs {
            *sums.entry(from).or_insert(0.0) += probability;
        }
        for (&from, &sum) in &sums {
            if (sum - 1.0).abs() > PROBABILITY_TOLERANCE {
                return Err(ChainReadError::UnnormalizedDistribution {
                    day,
                    slot,
                    from,
                    sum,
                });
            }
        }

        let transitions: Vec<(Activity, Activity, f64)> = pairs
            .into_iter()
            .map(|((from, to), probability)| (from, to, probability))
            .collect();
        let chain = SlotChain::from_transitions(&transitions)
            .map_err(|source| ChainReadError::InvalidDistribution { day, slot, source })?;
        tables.insert(slot, chain);
    }
    Ok(tables)
}
