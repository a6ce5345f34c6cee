//! Feature extraction from raw student records

use super::records::{AttendanceStatus, StudentHistory, StudentRecord};
use super::{StudentFeatures, FEATURE_NAMES, N_FEATURES};
use crate::preprocessing::CategoricalEncoder;
use serde::{Deserialize, Serialize};

/// Midpoint of the 1-10 survey scales
pub const SURVEY_MIDPOINT: f64 = 5.0;

/// What to assume when a student has neither attendance history nor a stored rate.
///
/// `WorstCase` (0.0) is the default. It skews risk upward for students with
/// no history, so deployments that prefer a population value can switch to
/// `Assume`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingAttendancePolicy {
    WorstCase,
    Assume(f64),
}

impl Default for MissingAttendancePolicy {
    fn default() -> Self {
        MissingAttendancePolicy::WorstCase
    }
}

impl MissingAttendancePolicy {
    pub fn value(&self) -> f64 {
        match self {
            MissingAttendancePolicy::WorstCase => 0.0,
            MissingAttendancePolicy::Assume(v) => v.clamp(0.0, 1.0),
        }
    }
}

/// Builds canonical feature vectors; owns the canonical column order
#[derive(Debug, Clone, Default)]
pub struct FeatureExtractor {
    encoder: CategoricalEncoder,
    missing_attendance: MissingAttendancePolicy,
}

impl FeatureExtractor {
    pub fn new(encoder: CategoricalEncoder) -> Self {
        Self {
            encoder,
            missing_attendance: MissingAttendancePolicy::default(),
        }
    }

    pub fn with_missing_attendance(mut self, policy: MissingAttendancePolicy) -> Self {
        self.missing_attendance = policy;
        self
    }

    pub fn encoder(&self) -> &CategoricalEncoder {
        &self.encoder
    }

    /// Extract the 14 canonical features. Always fully populated.
    pub fn extract(&self, student: &StudentRecord, history: &StudentHistory) -> StudentFeatures {
        let period_gpas = self.period_gpas(history);

        let gpa = student
            .gpa
            .or_else(|| period_gpas.first().copied())
            .unwrap_or(0.0);
        let gpa_previous = period_gpas
            .get(1)
            .copied()
            .or(student.previous_gpa)
            .unwrap_or(gpa);

        let attendance_rate = self.attendance_rate(student, history);
        let attendance_trend = self.attendance_trend(history);

        // Ungraded records say nothing about failures
        let failed_courses = if history.academic.iter().any(|r| r.grade.is_some()) {
            history.academic.iter().filter(|r| r.is_failed()).count() as f64
        } else {
            student.failed_courses.unwrap_or(0) as f64
        };

        let incidents = if history.behavioral.is_empty() {
            student.disciplinary_incidents.unwrap_or(0) as f64
        } else {
            history.behavioral.iter().filter(|r| r.is_incident()).count() as f64
        };

        let values: [f64; N_FEATURES] = [
            gpa,
            gpa_previous,
            gpa - gpa_previous,
            attendance_rate,
            attendance_trend,
            student.participation_score.unwrap_or(0.0),
            Self::completion_rate(history),
            student.credits_enrolled.unwrap_or(0.0),
            failed_courses,
            incidents,
            self.encoder.encode_financial_aid(student.financial_aid.as_deref()),
            self.encoder
                .encode_parent_education(student.parent_education_level.as_deref()),
            student.motivation_score.unwrap_or(SURVEY_MIDPOINT),
            student.stress_level.unwrap_or(SURVEY_MIDPOINT),
        ];

        StudentFeatures::from_pairs(FEATURE_NAMES.iter().copied().zip(values))
    }

    /// Mean GPA per academic period, newest first
    fn period_gpas(&self, history: &StudentHistory) -> Vec<f64> {
        let mut records: Vec<_> = history.academic.iter().collect();
        if !records.is_empty() && records.iter().all(|r| r.recorded_on.is_some()) {
            records.sort_by(|a, b| b.recorded_on.cmp(&a.recorded_on));
        }

        let mut periods: Vec<(&str, f64, usize)> = Vec::new();
        for record in records {
            let Some(gpa) = record.gpa else { continue };
            match periods.iter_mut().find(|(s, _, _)| *s == record.semester) {
                Some((_, sum, n)) => {
                    *sum += gpa;
                    *n += 1;
                }
                None => periods.push((record.semester.as_str(), gpa, 1)),
            }
        }

        periods
            .into_iter()
            .map(|(_, sum, n)| sum / n as f64)
            .collect()
    }

    fn attendance_rate(&self, student: &StudentRecord, history: &StudentHistory) -> f64 {
        if !history.attendance.is_empty() {
            return Self::present_fraction(history.attendance.iter().map(|r| r.status));
        }

        match student.attendance_rate {
            Some(rate) if rate > 1.0 => (rate / 100.0).clamp(0.0, 1.0),
            Some(rate) => rate.max(0.0),
            None => self.missing_attendance.value(),
        }
    }

    /// Most recent period's attendance minus the one before it
    fn attendance_trend(&self, history: &StudentHistory) -> f64 {
        let mut periods: Vec<(String, chrono::NaiveDate, Vec<AttendanceStatus>)> = Vec::new();
        for record in &history.attendance {
            let key = record.period();
            match periods.iter_mut().find(|(k, _, _)| *k == key) {
                Some((_, latest, statuses)) => {
                    if record.date > *latest {
                        *latest = record.date;
                    }
                    statuses.push(record.status);
                }
                None => periods.push((key, record.date, vec![record.status])),
            }
        }

        if periods.len() < 2 {
            return 0.0;
        }

        periods.sort_by(|a, b| b.1.cmp(&a.1));
        let current = Self::present_fraction(periods[0].2.iter().copied());
        let previous = Self::present_fraction(periods[1].2.iter().copied());
        current - previous
    }

    fn present_fraction(statuses: impl Iterator<Item = AttendanceStatus>) -> f64 {
        let (present, total) = statuses.fold((0usize, 0usize), |(p, t), s| {
            (p + usize::from(s == AttendanceStatus::Present), t + 1)
        });
        if total == 0 {
            0.0
        } else {
            present as f64 / total as f64
        }
    }

    fn completion_rate(history: &StudentHistory) -> f64 {
        let (completed, total) = history.academic.iter().fold((0u64, 0u64), |(c, t), r| {
            (
                c + r.assignments_completed.unwrap_or(0) as u64,
                t + r.total_assignments.unwrap_or(0) as u64,
            )
        });
        if total == 0 {
            0.0
        } else {
            completed as f64 / total as f64
        }
    }
}
