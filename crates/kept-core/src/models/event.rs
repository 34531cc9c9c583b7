//! Event model

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Months, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

use super::resource::{Resource, ResourceKind};

/// Upper bound on interval steps when searching for the next occurrence
const MAX_OCCURRENCE_STEPS: usize = 100_000;

/// How often an event repeats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RepeatInterval {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

impl RepeatInterval {
    /// The occurrence following `date`, or `None` for one-off events
    pub fn advance(self, date: DateTime<Utc>) -> Option<DateTime<Utc>> {
        match self {
            Self::None => None,
            Self::Daily => date.checked_add_signed(TimeDelta::days(1)),
            Self::Weekly => date.checked_add_signed(TimeDelta::weeks(1)),
            Self::Monthly => date.checked_add_months(Months::new(1)),
            Self::Yearly => date.checked_add_months(Months::new(12)),
        }
    }
}

impl fmt::Display for RepeatInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::None => "none",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Yearly => "yearly",
        };
        f.write_str(label)
    }
}

impl FromStr for RepeatInterval {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "none" | "never" => Ok(Self::None),
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            "yearly" | "year" | "annually" => Ok(Self::Yearly),
            other => Err(Error::InvalidInput(format!(
                "Unknown repeat interval: {other}"
            ))),
        }
    }
}

/// A calendar event owned by a user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// When the (first) occurrence happens
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub repeat: RepeatInterval,
    #[serde(default)]
    pub is_archived: bool,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Last update timestamp (Unix ms)
    pub updated_at: i64,
}

impl Event {
    /// First occurrence at or after `after`, following the repeat interval
    pub fn next_occurrence(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let mut current = self.date;
        for _ in 0..MAX_OCCURRENCE_STEPS {
            if current >= after {
                return Some(current);
            }
            current = self.repeat.advance(current)?;
        }
        None
    }
}

/// Payload for creating an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub repeat: RepeatInterval,
}

/// Partial event update
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat: Option<RepeatInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_archived: Option<bool>,
}

impl Resource for Event {
    type Input = NewEvent;
    type Patch = EventPatch;

    const KIND: ResourceKind = ResourceKind::Event;

    fn id(&self) -> &str {
        &self.id
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn updated_at(&self) -> i64 {
        self.updated_at
    }

    fn build(id: String, input: &NewEvent, now: i64) -> Self {
        Self {
            id,
            user_id: input.user_id.clone(),
            title: input.title.clone(),
            description: input.description.clone(),
            date: input.date,
            repeat: input.repeat,
            is_archived: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn patched(&self, patch: &EventPatch, now: i64) -> Self {
        Self {
            title: patch.title.clone().unwrap_or_else(|| self.title.clone()),
            description: patch
                .description
                .clone()
                .unwrap_or_else(|| self.description.clone()),
            date: patch.date.unwrap_or(self.date),
            repeat: patch.repeat.unwrap_or(self.repeat),
            is_archived: patch.is_archived.unwrap_or(self.is_archived),
            updated_at: now,
            ..self.clone()
        }
    }

    fn archive_patch(archived: bool) -> Option<EventPatch> {
        Some(EventPatch {
            is_archived: Some(archived),
            ..EventPatch::default()
        })
    }

    fn patch_archived(patch: &EventPatch) -> Option<bool> {
        patch.is_archived
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 0, 0).unwrap()
    }

    fn sample_event(repeat: RepeatInterval) -> Event {
        Event::build(
            "e1".to_string(),
            &NewEvent {
                user_id: "u1".to_string(),
                title: "Standup".to_string(),
                description: String::new(),
                date: at(2024, 1, 31),
                repeat,
            },
            0,
        )
    }

    #[test]
    fn test_repeat_interval_parse() {
        assert_eq!("Weekly".parse::<RepeatInterval>().unwrap(), RepeatInterval::Weekly);
        assert_eq!("".parse::<RepeatInterval>().unwrap(), RepeatInterval::None);
        assert!("fortnightly".parse::<RepeatInterval>().is_err());
    }

    #[test]
    fn test_monthly_advance_clamps_to_month_end() {
        assert_eq!(RepeatInterval::Monthly.advance(at(2024, 1, 31)), Some(at(2024, 2, 29)));
        assert_eq!(RepeatInterval::None.advance(at(2024, 1, 31)), None);
    }

    #[test]
    fn test_next_occurrence_one_off() {
        let event = sample_event(RepeatInterval::None);
        assert_eq!(event.next_occurrence(at(2024, 1, 1)), Some(at(2024, 1, 31)));
        assert_eq!(event.next_occurrence(at(2024, 2, 1)), None);
    }

    #[test]
    fn test_next_occurrence_repeating() {
        let event = sample_event(RepeatInterval::Daily);
        assert_eq!(event.next_occurrence(at(2024, 2, 3)), Some(at(2024, 2, 3)));
        let weekly = sample_event(RepeatInterval::Weekly);
        assert_eq!(weekly.next_occurrence(at(2024, 2, 1)), Some(at(2024, 2, 7)));
    }

    #[test]
    fn test_event_patch_archives() {
        let event = sample_event(RepeatInterval::None);
        let archived = event.patched(&Event::archive_patch(true).unwrap(), 5);
        assert!(archived.is_archived);
        assert_eq!(archived.title, "Standup");
        assert_eq!(archived.updated_at, 5);
    }
}
