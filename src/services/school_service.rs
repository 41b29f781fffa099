//! School store - classes, people, notices, events, attendance, timetable

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use futures::future::try_join_all;
use serde_json::json;

use crate::domain::{ListParams, StoreError, StoreResult};
use crate::infrastructure::client::ApiClient;
use crate::models::{
    AttendanceRecord, Event, Notice, SchoolClass, Student, Teacher, TimetableEntry,
};
use crate::services::resource_store::ResourceStore;
use crate::utils::validation::{Validate, ValidationErrors};

/// Share of records counted as attended, `None` when there are none
pub fn attendance_rate<'a>(records: impl IntoIterator<Item = &'a AttendanceRecord>) -> Option<f64> {
    let (attended, total) = records.into_iter().fold((0u32, 0u32), |(a, t), r| {
        (a + u32::from(r.status.counts_as_attended()), t + 1)
    });
    (total > 0).then(|| f64::from(attended) / f64::from(total))
}

/// Notices visible on `date`, pinned first, newest first within each group
pub fn active_notices(notices: &[Arc<Notice>], date: NaiveDate) -> Vec<Arc<Notice>> {
    let mut visible: Vec<Arc<Notice>> = notices
        .iter()
        .filter(|n| n.is_visible_on(date))
        .cloned()
        .collect();
    visible.sort_by(|a, b| {
        b.is_pinned
            .cmp(&a.is_pinned)
            .then(b.publish_date.cmp(&a.publish_date))
    });
    visible
}

/// First existing entry the candidate would clash with
pub fn find_conflict<'a>(
    candidate: &TimetableEntry,
    existing: impl IntoIterator<Item = &'a TimetableEntry>,
) -> Option<&'a TimetableEntry> {
    existing.into_iter().find(|e| candidate.conflicts_with(e))
}

pub struct SchoolStore {
    classes: Arc<ResourceStore<SchoolClass>>,
    students: Arc<ResourceStore<Student>>,
    teachers: Arc<ResourceStore<Teacher>>,
    notices: Arc<ResourceStore<Notice>>,
    events: Arc<ResourceStore<Event>>,
    attendance: Arc<ResourceStore<AttendanceRecord>>,
    timetable: Arc<ResourceStore<TimetableEntry>>,
}

impl SchoolStore {
    pub fn new(client: &ApiClient) -> Self {
        Self {
            classes: Arc::new(ResourceStore::rest(client)),
            students: Arc::new(ResourceStore::rest(client)),
            teachers: Arc::new(ResourceStore::rest(client)),
            notices: Arc::new(ResourceStore::rest(client)),
            events: Arc::new(ResourceStore::rest(client)),
            attendance: Arc::new(ResourceStore::rest(client)),
            timetable: Arc::new(ResourceStore::rest(client)),
        }
    }

    pub fn classes(&self) -> &Arc<ResourceStore<SchoolClass>> {
        &self.classes
    }

    pub fn students(&self) -> &Arc<ResourceStore<Student>> {
        &self.students
    }

    pub fn teachers(&self) -> &Arc<ResourceStore<Teacher>> {
        &self.teachers
    }

    pub fn notices(&self) -> &Arc<ResourceStore<Notice>> {
        &self.notices
    }

    pub fn events(&self) -> &Arc<ResourceStore<Event>> {
        &self.events
    }

    pub fn attendance(&self) -> &Arc<ResourceStore<AttendanceRecord>> {
        &self.attendance
    }

    pub fn timetable(&self) -> &Arc<ResourceStore<TimetableEntry>> {
        &self.timetable
    }

    // --- Classes ---

    /// Move a student into a class that still has a free seat
    pub async fn enroll_student(&self, student_id: i64, class_id: i64) -> StoreResult<Arc<Student>> {
        let class = self.classes.get_or_retrieve(class_id).await?;
        if !class.has_free_seat() {
            return Err(StoreError::InvalidState(format!(
                "Class '{}' is full ({}/{})",
                class.name, class.student_count, class.capacity
            )));
        }

        let student = self
            .students
            .patch(student_id, json!({ "class": class_id }))
            .await?;

        let mut class = (*class).clone();
        class.student_count += 1;
        self.classes.replace_cached(class).await;
        Ok(student)
    }

    // --- Attendance ---

    /// Record a register, one row per student, posted concurrently.
    /// Fails with the first error; rows already accepted stay recorded.
    pub async fn record_attendance(
        &self,
        records: &[AttendanceRecord],
    ) -> StoreResult<Vec<Arc<AttendanceRecord>>> {
        let created =
            try_join_all(records.iter().map(|record| self.attendance.create(record))).await?;
        tracing::info!("Recorded attendance for {} students", created.len());
        Ok(created)
    }

    /// Attendance rate of one student over the cached records
    pub async fn student_attendance_rate(&self, student_id: i64) -> Option<f64> {
        let records = self.attendance.results().await;
        attendance_rate(
            records
                .iter()
                .map(|r| r.as_ref())
                .filter(|r| r.student == student_id),
        )
    }

    // --- Timetable ---

    /// Create a slot unless it clashes with an existing one that day
    pub async fn add_timetable_entry(
        &self,
        entry: &TimetableEntry,
    ) -> StoreResult<Arc<TimetableEntry>> {
        entry.validate()?;

        let same_day = self
            .timetable
            .collect_all(ListParams::new().filter("weekday", entry.weekday))
            .await?;

        if let Some(clash) = find_conflict(entry, &same_day) {
            let mut errors = ValidationErrors::new();
            errors.add(
                "start_time",
                format!(
                    "Overlaps with {} ({}-{}).",
                    clash.subject,
                    clash.start_time.format("%H:%M"),
                    clash.end_time.format("%H:%M")
                ),
            );
            return Err(errors.into());
        }

        self.timetable.create(entry).await
    }

    // --- Notices & events ---

    pub async fn active_notices(&self, date: NaiveDate) -> Vec<Arc<Notice>> {
        active_notices(&self.notices.results().await, date)
    }

    /// Cached events that have not started yet, soonest first
    pub async fn upcoming_events(&self, now: DateTime<Utc>) -> Vec<Arc<Event>> {
        let mut events: Vec<Arc<Event>> = self
            .events
            .results()
            .await
            .into_iter()
            .filter(|e| e.is_upcoming(now))
            .collect();
        events.sort_by_key(|e| e.start);
        events
    }

    pub async fn reset(&self) {
        self.classes.reset().await;
        self.students.reset().await;
        self.teachers.reset().await;
        self.notices.reset().await;
        self.events.reset().await;
        self.attendance.reset().await;
        self.timetable.reset().await;
    }
}
