//! Raw student records as delivered by the data-access layer

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current snapshot of a student.
///
/// Every signal is optional; [`super::FeatureExtractor`] owns the defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentRecord {
    pub student_id: String,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub previous_gpa: Option<f64>,
    /// Either a fraction in [0, 1] or a percentage in (1, 100]
    #[serde(default)]
    pub attendance_rate: Option<f64>,
    #[serde(default)]
    pub participation_score: Option<f64>,
    #[serde(default)]
    pub credits_enrolled: Option<f64>,
    #[serde(default)]
    pub failed_courses: Option<u32>,
    #[serde(default)]
    pub disciplinary_incidents: Option<u32>,
    /// Raw category, e.g. "Yes" / "No"
    #[serde(default)]
    pub financial_aid: Option<String>,
    /// Raw category, e.g. "High School", "Bachelor"
    #[serde(default)]
    pub parent_education_level: Option<String>,
    /// Survey score on a 1-10 scale
    #[serde(default)]
    pub motivation_score: Option<f64>,
    /// Survey score on a 1-10 scale
    #[serde(default)]
    pub stress_level: Option<f64>,
}

impl StudentRecord {
    pub fn new(student_id: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            ..Default::default()
        }
    }

    pub fn with_gpa(mut self, gpa: f64) -> Self {
        self.gpa = Some(gpa);
        self
    }

    pub fn with_previous_gpa(mut self, gpa: f64) -> Self {
        self.previous_gpa = Some(gpa);
        self
    }

    pub fn with_attendance_rate(mut self, rate: f64) -> Self {
        self.attendance_rate = Some(rate);
        self
    }

    pub fn with_participation(mut self, score: f64) -> Self {
        self.participation_score = Some(score);
        self
    }

    pub fn with_credits(mut self, credits: f64) -> Self {
        self.credits_enrolled = Some(credits);
        self
    }

    pub fn with_failed_courses(mut self, count: u32) -> Self {
        self.failed_courses = Some(count);
        self
    }

    pub fn with_disciplinary_incidents(mut self, count: u32) -> Self {
        self.disciplinary_incidents = Some(count);
        self
    }

    pub fn with_financial_aid(mut self, aid: impl Into<String>) -> Self {
        self.financial_aid = Some(aid.into());
        self
    }

    pub fn with_parent_education(mut self, level: impl Into<String>) -> Self {
        self.parent_education_level = Some(level.into());
        self
    }

    pub fn with_survey(mut self, motivation: f64, stress: f64) -> Self {
        self.motivation_score = Some(motivation);
        self.stress_level = Some(stress);
        self
    }
}

/// Per-semester academic outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcademicRecord {
    pub semester: String,
    #[serde(default)]
    pub recorded_on: Option<NaiveDate>,
    #[serde(default)]
    pub gpa: Option<f64>,
    #[serde(default)]
    pub assignments_completed: Option<u32>,
    #[serde(default)]
    pub total_assignments: Option<u32>,
    /// Letter grade; "F" counts as a failed course
    #[serde(default)]
    pub grade: Option<String>,
}

impl AcademicRecord {
    pub fn new(semester: impl Into<String>) -> Self {
        Self {
            semester: semester.into(),
            recorded_on: None,
            gpa: None,
            assignments_completed: None,
            total_assignments: None,
            grade: None,
        }
    }

    pub fn with_gpa(mut self, gpa: f64) -> Self {
        self.gpa = Some(gpa);
        self
    }

    pub fn with_assignments(mut self, completed: u32, total: u32) -> Self {
        self.assignments_completed = Some(completed);
        self.total_assignments = Some(total);
        self
    }

    pub fn with_grade(mut self, grade: impl Into<String>) -> Self {
        self.grade = Some(grade.into());
        self
    }

    pub fn recorded_on(mut self, date: NaiveDate) -> Self {
        self.recorded_on = Some(date);
        self
    }

    pub fn is_failed(&self) -> bool {
        self.grade
            .as_deref()
            .map(|g| g.trim().eq_ignore_ascii_case("f"))
            .unwrap_or(false)
    }
}

/// Attendance status for a single class meeting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    Excused,
    #[serde(other)]
    Other,
}

/// One attendance entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub date: NaiveDate,
    #[serde(default)]
    pub semester: Option<String>,
    pub status: AttendanceStatus,
}

impl AttendanceRecord {
    pub fn new(date: NaiveDate, status: AttendanceStatus) -> Self {
        Self {
            date,
            semester: None,
            status,
        }
    }

    pub fn in_semester(mut self, semester: impl Into<String>) -> Self {
        self.semester = Some(semester.into());
        self
    }

    /// Grouping key: the semester when known, else the calendar month
    pub(crate) fn period(&self) -> String {
        match &self.semester {
            Some(s) => s.clone(),
            None => self.date.format("%Y-%m").to_string(),
        }
    }
}

/// One behavioral observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehavioralRecord {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    /// e.g. "incident", "suspension", "commendation"
    pub kind: String,
    #[serde(default)]
    pub severity: Option<u8>,
}

impl BehavioralRecord {
    pub fn incident(kind: impl Into<String>) -> Self {
        Self {
            date: None,
            kind: kind.into(),
            severity: None,
        }
    }

    /// Everything except positive notes counts as a disciplinary incident
    pub fn is_incident(&self) -> bool {
        !self.kind.trim().eq_ignore_ascii_case("commendation")
    }
}

/// Optional joined history for a student.
///
/// Academic records are expected newest-first unless every record carries a
/// `recorded_on` date, in which case they are ordered by date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StudentHistory {
    #[serde(default)]
    pub academic: Vec<AcademicRecord>,
    #[serde(default)]
    pub attendance: Vec<AttendanceRecord>,
    #[serde(default)]
    pub behavioral: Vec<BehavioralRecord>,
}

impl StudentHistory {
    pub fn is_empty(&self) -> bool {
        self.academic.is_empty() && self.attendance.is_empty() && self.behavioral.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attendance_status_deserialize() {
        let rec: AttendanceRecord =
            serde_json::from_str(r#"{"date":"2024-09-02","status":"present"}"#).unwrap();
        assert_eq!(rec.status, AttendanceStatus::Present);

        let rec: AttendanceRecord =
            serde_json::from_str(r#"{"date":"2024-09-02","status":"remote"}"#).unwrap();
        assert_eq!(rec.status, AttendanceStatus::Other);
    }

    #[test]
    fn test_period_falls_back_to_month() {
        let date = NaiveDate::from_ymd_opt(2024, 10, 7).unwrap();
        let rec = AttendanceRecord::new(date, AttendanceStatus::Absent);
        assert_eq!(rec.period(), "2024-10");
        assert_eq!(rec.in_semester("2024-Fall").period(), "2024-Fall");
    }

    #[test]
    fn test_student_record_defaults_from_sparse_json() {
        let rec: StudentRecord = serde_json::from_str(r#"{"student_id":"S-1","gpa":2.4}"#).unwrap();
        assert_eq!(rec.gpa, Some(2.4));
        assert!(rec.stress_level.is_none());
    }

    #[test]
    fn test_incident_classification() {
        assert!(BehavioralRecord::incident("suspension").is_incident());
        assert!(!BehavioralRecord::incident("Commendation").is_incident());
    }
}
