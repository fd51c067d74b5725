// ==========================================
// Cadet Roster - Training days & attendance
// ==========================================
// attendance_record is unique per (person_id, day_id); re-marking overwrites.
// Records are only removed through the owning TrainingDay.
// ==========================================

use crate::domain::types::AttendanceStatus;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDay {
    pub id: String,
    pub date: NaiveDate,
    pub title: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub person_id: String,
    pub day_id: String,
    pub status: AttendanceStatus,
    pub remarks: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Per-person attendance tallies used by grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceCounts {
    pub present: u32,
    pub absent: u32,
    pub late: u32,
    pub excused: u32,
}

impl AttendanceCounts {
    pub fn add(&mut self, status: AttendanceStatus, n: u32) {
        match status {
            AttendanceStatus::Present => self.present += n,
            AttendanceStatus::Absent => self.absent += n,
            AttendanceStatus::Late => self.late += n,
            AttendanceStatus::Excused => self.excused += n,
        }
    }

    /// Days counted as attended.
    pub fn days_present(&self, late_counts_as_present: bool) -> u32 {
        if late_counts_as_present {
            self.present + self.late
        } else {
            self.present
        }
    }
}
