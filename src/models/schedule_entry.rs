use serde::{Deserialize, Serialize};

/// One class session as loaded from the dataset. Read-only once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScheduleEntry {
    pub subject: String,
    pub group: String,
    pub doctor_ar: String,
    pub doctor_en: String,
    pub day: String,
    /// `"<start> – <end>"`, each side an `hh:mm AM|PM` token.
    pub time: String,
    pub room: String,
    pub code: String,
    /// Timetable string before a seasonal override replaced `time`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_time: Option<String>,
}

impl ScheduleEntry {
    pub fn field(&self, field: EntryField) -> &str {
        match field {
            EntryField::Subject => &self.subject,
            EntryField::Group => &self.group,
            EntryField::DoctorAr => &self.doctor_ar,
            EntryField::DoctorEn => &self.doctor_en,
            EntryField::Day => &self.day,
            EntryField::Time => &self.time,
            EntryField::Room => &self.room,
            EntryField::Code => &self.code,
        }
    }
}

/// Names one of the string columns of a [`ScheduleEntry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EntryField {
    Subject,
    Group,
    DoctorAr,
    DoctorEn,
    Day,
    Time,
    Room,
    Code,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClassStatus {
    Active,
    Upcoming,
    Finished,
    Future,
}

impl ClassStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClassStatus::Active => "ACTIVE",
            ClassStatus::Upcoming => "UPCOMING",
            ClassStatus::Finished => "FINISHED",
            ClassStatus::Future => "FUTURE",
        }
    }
}

/// A [`ScheduleEntry`] classified against a particular "now".
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedEntry {
    #[serde(flatten)]
    pub entry: ScheduleEntry,
    pub status: ClassStatus,
    /// 0..=100, only meaningful while active.
    pub progress: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_left: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_in: Option<i32>,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip)]
    pub start_minutes: i32,
}

impl ClassifiedEntry {
    pub fn code(&self) -> &str {
        &self.entry.code
    }

    pub fn is_active(&self) -> bool {
        self.status == ClassStatus::Active
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Subject,
    Doctor,
}

/// A "did you mean" candidate.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Suggestion {
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub text: String,
    pub display: String,
}
