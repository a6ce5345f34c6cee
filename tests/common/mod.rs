//! Shared synthetic cohort for integration tests

#![allow(dead_code)]

use dropout_risk::features::{AcademicRecord, StudentHistory, StudentRecord};
use dropout_risk::service::{LabeledStudent, StudentProfile};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// One student drawn from the dropout or retained population.
///
/// Only GPA and attendance separate the groups cleanly:
/// dropouts have GPA 1.0-2.3 and attendance 0.40-0.70,
/// retained students GPA 2.6-4.0 and attendance 0.80-1.00.
/// Failures, incidents, survey scores and completion overlap between them.
pub fn student(id: &str, dropout: bool, rng: &mut ChaCha8Rng) -> (StudentRecord, StudentHistory) {
    let (gpa, attendance, failed, motivation, stress, completed) = if dropout {
        (
            rng.gen_range(1.0..2.3),
            rng.gen_range(0.40..0.70),
            rng.gen_range(0..4),
            rng.gen_range(1.0..4.0),
            rng.gen_range(2.5..5.0),
            rng.gen_range(3..9),
        )
    } else {
        (
            rng.gen_range(2.6..4.0),
            rng.gen_range(0.80..1.00),
            rng.gen_range(0..2),
            rng.gen_range(2.5..5.0),
            rng.gen_range(1.0..4.0),
            rng.gen_range(6..11),
        )
    };

    let record = StudentRecord::new(id)
        .with_gpa(gpa)
        .with_previous_gpa(gpa + rng.gen_range(-0.2..0.4))
        .with_attendance_rate(attendance)
        .with_participation(rng.gen_range(0.0..10.0))
        .with_credits(rng.gen_range(9.0..18.0))
        .with_failed_courses(failed)
        .with_disciplinary_incidents(rng.gen_range(0..if dropout { 3 } else { 2 }))
        .with_financial_aid(if rng.gen_bool(0.5) { "yes" } else { "no" })
        .with_parent_education(["high_school", "bachelor", "master"][rng.gen_range(0..3)])
        .with_survey(motivation, stress);

    // Ungraded: failures and GPA come from the record itself
    let history = StudentHistory {
        academic: vec![AcademicRecord::new("2024-fall").with_assignments(completed, 10)],
        ..StudentHistory::default()
    };

    (record, history)
}

/// `n` labeled students, 30% dropouts, reproducible for a given seed
pub fn cohort(n: usize, seed: u64) -> Vec<LabeledStudent> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|i| {
            let dropout = i % 10 < 3;
            let (record, history) = student(&format!("s-{:04}", i), dropout, &mut rng);
            LabeledStudent::new(record, history, dropout)
        })
        .collect()
}

/// Repository-ready profiles without labels
pub fn profiles(n: usize, seed: u64) -> Vec<StudentProfile> {
    cohort(n, seed)
        .into_iter()
        .map(|s| StudentProfile {
            record: s.record,
            history: s.history,
        })
        .collect()
}

/// A clearly struggling student
pub fn at_risk(id: &str) -> (StudentRecord, StudentHistory) {
    let record = StudentRecord::new(id)
        .with_gpa(1.8)
        .with_previous_gpa(2.2)
        .with_attendance_rate(0.55)
        .with_participation(2.0)
        .with_credits(12.0)
        .with_failed_courses(2)
        .with_disciplinary_incidents(1)
        .with_financial_aid("yes")
        .with_parent_education("high_school")
        .with_survey(1.5, 4.5);
    let history = StudentHistory {
        academic: vec![AcademicRecord::new("2024-fall").with_assignments(4, 10)],
        ..StudentHistory::default()
    };
    (record, history)
}

/// A clearly thriving student
pub fn thriving(id: &str) -> (StudentRecord, StudentHistory) {
    let record = StudentRecord::new(id)
        .with_gpa(3.7)
        .with_previous_gpa(3.6)
        .with_attendance_rate(0.95)
        .with_participation(8.0)
        .with_credits(15.0)
        .with_failed_courses(0)
        .with_disciplinary_incidents(0)
        .with_financial_aid("no")
        .with_parent_education("bachelor")
        .with_survey(4.5, 1.5);
    let history = StudentHistory {
        academic: vec![AcademicRecord::new("2024-fall").with_assignments(10, 10)],
        ..StudentHistory::default()
    };
    (record, history)
}
