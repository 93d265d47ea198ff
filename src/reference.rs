use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

/// Provenance attached to every statement written during a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference {
    pub source: String,
    pub reference_url: String,
    pub point_in_time: DateTime<Utc>,
}

impl Reference {
    /// Reference stamped with the start of the current UTC day.
    pub fn new(source: &str, reference_url: &str) -> Self {
        Self::at(source, reference_url, Utc::now())
    }

    /// Reference stamped with the start of the day containing `now`.
    pub fn at(source: &str, reference_url: &str, now: DateTime<Utc>) -> Self {
        Reference {
            source: source.to_string(),
            reference_url: reference_url.to_string(),
            point_in_time: start_of_day(now),
        }
    }

    /// Same source and timestamp, different URL.
    pub fn with_url(&self, reference_url: &str) -> Self {
        Reference {
            source: self.source.clone(),
            reference_url: reference_url.to_string(),
            point_in_time: self.point_in_time,
        }
    }
}

pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}
