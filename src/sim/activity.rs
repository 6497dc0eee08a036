use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What a person is doing during one time slot.
///
/// The set is closed: the transition tables, the occupancy bookkeeping, and
/// the heating control all agree on exactly these states. Labels in tabular
/// sources use the upper snake case form, e.g. `SLEEP_AT_HOME`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Activity {
    Home,
    SleepAtHome,
    NotAtHome,
    SleepNotAtHome,
}

impl Activity {
    /// True for activities consistent with being a recorded dwelling occupant.
    pub fn is_at_home(self) -> bool {
        matches!(self, Activity::Home | Activity::SleepAtHome)
    }

    /// True for sleeping activities, at home or elsewhere.
    pub fn is_asleep(self) -> bool {
        matches!(self, Activity::SleepAtHome | Activity::SleepNotAtHome)
    }
}

/// Weekday/weekend classification of a date in the chain's time zone.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum DayType {
    Weekday,
    Weekend,
}

impl DayType {
    pub fn from_weekday(weekday: chrono::Weekday) -> Self {
        match weekday {
            chrono::Weekday::Sat | chrono::Weekday::Sun => DayType::Weekend,
            _ => DayType::Weekday,
        }
    }
}
