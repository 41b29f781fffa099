use chrono::{NaiveTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::impl_resource;
use crate::utils::validation::{Validate, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimetableEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(rename = "class")]
    pub class_id: i64,
    pub teacher: i64,
    pub subject: String,
    pub weekday: Weekday,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub room: Option<String>,
}

impl TimetableEntry {
    /// Same weekday and the half-open time ranges intersect
    pub fn overlaps(&self, other: &TimetableEntry) -> bool {
        self.weekday == other.weekday
            && self.start_time < other.end_time
            && other.start_time < self.end_time
    }

    /// Overlapping slot that shares the teacher, the class or the room
    pub fn conflicts_with(&self, other: &TimetableEntry) -> bool {
        if self.id.is_some() && self.id == other.id {
            return false;
        }
        let same_room = matches!((&self.room, &other.room), (Some(a), Some(b)) if a.eq_ignore_ascii_case(b));
        self.overlaps(other)
            && (self.teacher == other.teacher || self.class_id == other.class_id || same_room)
    }
}

impl Validate for TimetableEntry {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("subject", &self.subject);
        if self.end_time <= self.start_time {
            errors.add("end_time", "Must be after the start time.");
        }
        errors.into_result()
    }
}

impl_resource!(TimetableEntry, "timetable", validated);
