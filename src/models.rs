use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Flow {
    None,
    Light,
    Medium,
    Heavy,
}

impl Flow {
    pub fn is_bleeding(self) -> bool {
        !matches!(self, Flow::None)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flow::None => "none",
            Flow::Light => "light",
            Flow::Medium => "medium",
            Flow::Heavy => "heavy",
        }
    }
}

impl FromStr for Flow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Flow::None),
            "light" => Ok(Flow::Light),
            "medium" => Ok(Flow::Medium),
            "heavy" => Ok(Flow::Heavy),
            other => Err(format!("unknown flow '{other}'")),
        }
    }
}

impl fmt::Display for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodLog {
    pub id: i64,
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub flow: Option<Flow>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub mood: Option<String>,
    pub notes: Option<String>,
}

impl PeriodLog {
    pub fn is_bleeding(&self) -> bool {
        self.flow.is_some_and(Flow::is_bleeding)
    }

    pub fn apply(&mut self, patch: PeriodLogPatch) {
        if let Some(date) = patch.date {
            self.date = date;
        }
        if let Some(flow) = patch.flow {
            self.flow = flow;
        }
        if let Some(symptoms) = patch.symptoms {
            self.symptoms = symptoms;
        }
        if let Some(mood) = patch.mood {
            self.mood = mood;
        }
        if let Some(notes) = patch.notes {
            self.notes = notes;
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPeriodLog {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub flow: Option<Flow>,
    #[serde(default)]
    pub symptoms: Vec<String>,
    pub mood: Option<String>,
    pub notes: Option<String>,
}

impl NewPeriodLog {
    pub fn into_log(self, id: i64) -> PeriodLog {
        PeriodLog {
            id,
            user_id: self.user_id,
            date: self.date,
            flow: self.flow,
            symptoms: self.symptoms,
            mood: self.mood,
            notes: self.notes,
        }
    }

    /// Overwrites every field of the log already kept for this date.
    pub fn into_replacement(self) -> PeriodLogPatch {
        PeriodLogPatch {
            date: None,
            flow: Some(self.flow),
            symptoms: Some(self.symptoms),
            mood: Some(self.mood),
            notes: Some(self.notes),
        }
    }
}

// Absent leaves a field alone, `null` clears it.
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PeriodLogPatch {
    pub date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "nullable")]
    pub flow: Option<Option<Flow>>,
    pub symptoms: Option<Vec<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub mood: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cycle {
    pub id: i64,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period_length: i32,
    pub cycle_length: Option<i32>,
}

impl Cycle {
    pub fn apply(&mut self, patch: CyclePatch) {
        if let Some(start_date) = patch.start_date {
            self.start_date = start_date;
        }
        if let Some(end_date) = patch.end_date {
            self.end_date = end_date;
        }
        if let Some(period_length) = patch.period_length {
            self.period_length = period_length;
        }
        if let Some(cycle_length) = patch.cycle_length {
            self.cycle_length = cycle_length;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleDraft {
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub period_length: i32,
    pub cycle_length: Option<i32>,
}

impl CycleDraft {
    pub fn into_cycle(self, id: i64) -> Cycle {
        Cycle {
            id,
            user_id: self.user_id,
            start_date: self.start_date,
            end_date: self.end_date,
            period_length: self.period_length,
            cycle_length: self.cycle_length,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CyclePatch {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub period_length: Option<i32>,
    #[serde(default, deserialize_with = "nullable")]
    pub cycle_length: Option<Option<i32>>,
}

#[derive(Serialize)]
pub struct CycleSummary {
    pub cycle_day: i64,
    pub in_fertile_window: bool,
    pub period_expected_in_days: i64,
    pub start_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderKind {
    Period,
    Ovulation,
    Fertile,
    Medication,
    Custom,
}

impl ReminderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderKind::Period => "period",
            ReminderKind::Ovulation => "ovulation",
            ReminderKind::Fertile => "fertile",
            ReminderKind::Medication => "medication",
            ReminderKind::Custom => "custom",
        }
    }
}

impl FromStr for ReminderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "period" => Ok(ReminderKind::Period),
            "ovulation" => Ok(ReminderKind::Ovulation),
            "fertile" => Ok(ReminderKind::Fertile),
            "medication" => Ok(ReminderKind::Medication),
            "custom" => Ok(ReminderKind::Custom),
            other => Err(format!("unknown reminder type '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReminderWhen {
    Before,
    On,
    After,
}

impl ReminderWhen {
    pub fn as_str(self) -> &'static str {
        match self {
            ReminderWhen::Before => "before",
            ReminderWhen::On => "on",
            ReminderWhen::After => "after",
        }
    }
}

impl FromStr for ReminderWhen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "before" => Ok(ReminderWhen::Before),
            "on" => Ok(ReminderWhen::On),
            "after" => Ok(ReminderWhen::After),
            other => Err(format!("unknown reminder timing '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderTiming {
    pub days: u32,
    pub when: ReminderWhen,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub timing: ReminderTiming,
    pub time: String,
    pub message: String,
    pub enabled: bool,
}

impl Reminder {
    pub fn apply(&mut self, patch: ReminderPatch) {
        if let Some(kind) = patch.kind {
            self.kind = kind;
        }
        if let Some(timing) = patch.timing {
            self.timing = timing;
        }
        if let Some(time) = patch.time {
            self.time = time;
        }
        if let Some(message) = patch.message {
            self.message = message;
        }
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
    }
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewReminder {
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: ReminderKind,
    pub timing: ReminderTiming,
    pub time: String,
    pub message: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl NewReminder {
    pub fn into_reminder(self, id: i64) -> Reminder {
        Reminder {
            id,
            user_id: self.user_id,
            kind: self.kind,
            timing: self.timing,
            time: self.time,
            message: self.message,
            enabled: self.enabled,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReminderPatch {
    #[serde(rename = "type")]
    pub kind: Option<ReminderKind>,
    pub timing: Option<ReminderTiming>,
    pub time: Option<String>,
    pub message: Option<String>,
    pub enabled: Option<bool>,
}

pub fn is_valid_reminder_time(time: &str) -> bool {
    chrono::NaiveTime::parse_from_str(time, "%H:%M").is_ok() && time.len() == 5
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub user_id: Uuid,
}
