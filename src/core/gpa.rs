//! GPA and degree-progress aggregation.
//!
//! Everything here is pure arithmetic over grade ledger rows joined with their
//! courses: no database access and no failure modes. Empty input degrades to
//! zeros rather than erroring. Callers persist results into the
//! `semester_gpas`/`academic_progress` caches when they want them stored.

use crate::{
    config::settings::{GradingPolicy, ProgressPolicy},
    core::grades::LetterGrade,
    entities::{CourseCategory, GradeStatus, academic_record, course},
};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::{cmp::Ordering, collections::BTreeMap};

/// One ledger row with the course attributes the aggregator needs.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    /// Course the row belongs to
    pub course_id: i64,
    /// Term name
    pub semester: String,
    /// Term year
    pub year: i32,
    /// Letter as stored
    pub letter_grade: Option<String>,
    /// Grade points
    pub numeric_grade: Option<f64>,
    /// Credits granted
    pub credits_earned: i32,
    /// Course credit hours
    pub credits_attempted: i32,
    /// Ledger status
    pub status: GradeStatus,
    /// Course department, compared with the major
    pub department: String,
    /// Requirement bucket of the course
    pub category: CourseCategory,
}

impl LedgerEntry {
    /// Joins a ledger row with its course.
    #[must_use]
    pub fn new(record: &academic_record::Model, course: &course::Model) -> Self {
        Self {
            course_id: record.course_id,
            semester: record.semester.clone(),
            year: record.year,
            letter_grade: record.letter_grade.clone(),
            numeric_grade: record.numeric_grade,
            credits_earned: record.credits_earned,
            credits_attempted: record.credits_attempted,
            status: record.status,
            department: course.department.clone(),
            category: course.category,
        }
    }

    fn counts_toward_gpa(&self, policy: GradingPolicy) -> bool {
        match self.status {
            GradeStatus::Graded => true,
            GradeStatus::Incomplete => policy.count_incomplete,
            GradeStatus::Pending | GradeStatus::Withdrawn => false,
        }
    }

    fn quality_points(&self) -> f64 {
        self.numeric_grade.unwrap_or(0.0) * f64::from(self.credits_attempted)
    }

    fn in_major(&self, major: Option<&str>) -> bool {
        major.is_some_and(|major| self.department.trim().eq_ignore_ascii_case(major.trim()))
    }
}

/// Running quality-point / credit sums.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Tally {
    quality_points: f64,
    gpa_credits: i32,
}

impl Tally {
    fn add(&mut self, entry: &LedgerEntry) {
        self.quality_points += entry.quality_points();
        self.gpa_credits += entry.credits_attempted;
    }

    fn gpa(self) -> f64 {
        if self.gpa_credits == 0 {
            return 0.0;
        }
        round_gpa(self.quality_points / f64::from(self.gpa_credits))
    }
}

/// Rounds to three decimals, the precision GPAs are reported at.
#[must_use]
pub fn round_gpa(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// GPA for one (semester, year).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TermGpa {
    /// Term name
    pub semester: String,
    /// Term year
    pub year: i32,
    /// Quality points over GPA credits
    pub semester_gpa: f64,
    /// Credits earned in the term
    pub credits_earned: i32,
    /// Credits counted toward the term GPA
    pub credits_attempted: i32,
    /// Sum of grade points times credits
    pub quality_points: f64,
    /// Graded courses that earned credit
    pub courses_completed: i32,
    /// Courses counted toward the term GPA
    pub courses_attempted: i32,
}

/// Everything the GPA endpoints and transcripts report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpaSummary {
    /// GPA over every counted record
    pub cumulative_gpa: f64,
    /// GPA over courses in the major department
    pub major_gpa: f64,
    /// GPA of the most recent term with counted records
    pub semester_gpa: f64,
    /// Credits earned
    pub total_credits_earned: i32,
    /// Credits attempted, withdrawn ones only when the policy counts them
    pub total_credits_attempted: i32,
    /// Denominator of the cumulative GPA
    pub gpa_credits: i32,
    /// Numerator of the cumulative GPA
    pub total_quality_points: f64,
    /// Per-term GPA, oldest first
    pub semester_breakdown: Vec<TermGpa>,
    /// Counted records per letter
    pub grade_distribution: BTreeMap<String, u32>,
    /// Graded records
    pub courses_completed: u32,
    /// Incomplete records
    pub courses_incomplete: u32,
    /// Withdrawn records
    pub courses_withdrawn: u32,
    /// Records awaiting a grade
    pub courses_pending: u32,
}

/// Chronological position of a term name within a year.
fn term_rank(semester: &str) -> u8 {
    let lower = semester.trim().to_ascii_lowercase();
    if lower.starts_with("winter") {
        0
    } else if lower.starts_with("spring") {
        1
    } else if lower.starts_with("summer") {
        2
    } else if lower.starts_with("fall") || lower.starts_with("autumn") {
        3
    } else {
        4
    }
}

/// Orders terms oldest first: by year, then by season, then by name.
#[must_use]
pub fn compare_terms(a: (&str, i32), b: (&str, i32)) -> Ordering {
    a.1.cmp(&b.1)
        .then_with(|| term_rank(a.0).cmp(&term_rank(b.0)))
        .then_with(|| a.0.cmp(b.0))
}

/// Computes cumulative, major and per-term GPA plus credit totals.
///
/// `major` is the student's declared major, matched case-insensitively
/// against course departments.
#[must_use]
pub fn summarize(entries: &[LedgerEntry], major: Option<&str>, policy: GradingPolicy) -> GpaSummary {
    let mut cumulative = Tally::default();
    let mut major_tally = Tally::default();
    let mut terms: BTreeMap<(i32, u8, String), (Tally, TermGpa)> = BTreeMap::new();
    let mut grade_distribution = BTreeMap::new();
    let mut total_credits_earned = 0;
    let mut total_credits_attempted = 0;
    let (mut completed, mut incomplete, mut withdrawn, mut pending) = (0, 0, 0, 0);

    for entry in entries {
        match entry.status {
            GradeStatus::Graded => completed += 1,
            GradeStatus::Incomplete => incomplete += 1,
            GradeStatus::Withdrawn => {
                withdrawn += 1;
                if policy.count_withdrawn {
                    total_credits_attempted += entry.credits_attempted;
                }
            }
            GradeStatus::Pending => pending += 1,
        }

        if !entry.counts_toward_gpa(policy) {
            continue;
        }

        cumulative.add(entry);
        if entry.in_major(major) {
            major_tally.add(entry);
        }
        total_credits_attempted += entry.credits_attempted;
        total_credits_earned += entry.credits_earned;

        let letter = entry
            .letter_grade
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        *grade_distribution.entry(letter).or_insert(0) += 1;

        let key = (entry.year, term_rank(&entry.semester), entry.semester.clone());
        let (tally, term) = terms.entry(key).or_insert_with(|| {
            (
                Tally::default(),
                TermGpa {
                    semester: entry.semester.clone(),
                    year: entry.year,
                    semester_gpa: 0.0,
                    credits_earned: 0,
                    credits_attempted: 0,
                    quality_points: 0.0,
                    courses_completed: 0,
                    courses_attempted: 0,
                },
            )
        });
        tally.add(entry);
        term.credits_attempted += entry.credits_attempted;
        term.credits_earned += entry.credits_earned;
        term.courses_attempted += 1;
        if entry.status == GradeStatus::Graded && entry.credits_earned > 0 {
            term.courses_completed += 1;
        }
    }

    let semester_breakdown: Vec<TermGpa> = terms
        .into_values()
        .map(|(tally, mut term)| {
            term.semester_gpa = tally.gpa();
            term.quality_points = tally.quality_points;
            term
        })
        .collect();
    let semester_gpa = semester_breakdown.last().map_or(0.0, |term| term.semester_gpa);

    GpaSummary {
        cumulative_gpa: cumulative.gpa(),
        major_gpa: major_tally.gpa(),
        semester_gpa,
        total_credits_earned,
        total_credits_attempted,
        gpa_credits: cumulative.gpa_credits,
        total_quality_points: cumulative.quality_points,
        semester_breakdown,
        grade_distribution,
        courses_completed: completed,
        courses_incomplete: incomplete,
        courses_withdrawn: withdrawn,
        courses_pending: pending,
    }
}

/// GPA for a single term, `None` when the term has no counted records.
#[must_use]
pub fn term_gpa(
    entries: &[LedgerEntry],
    semester: &str,
    year: i32,
    policy: GradingPolicy,
) -> Option<TermGpa> {
    let term_entries: Vec<LedgerEntry> = entries
        .iter()
        .filter(|entry| entry.semester == semester && entry.year == year)
        .cloned()
        .collect();
    summarize(&term_entries, None, policy)
        .semester_breakdown
        .into_iter()
        .next()
}

/// Earned credits per requirement bucket and the derived progress figures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DegreeProgress {
    /// Earned credits of graded records
    pub total_credits_earned: i32,
    /// Earned credits in the major
    pub major_credits_earned: i32,
    /// Earned general education credits
    pub general_education_credits_earned: i32,
    /// Earned elective credits
    pub elective_credits_earned: i32,
    /// Credits needed to graduate
    pub total_credits_required: i32,
    /// Required minus earned, never negative
    pub credits_remaining: i32,
    /// Earned over required, capped at 100
    pub completion_percentage: f64,
    /// Major bucket completion, capped at 100
    pub major_completion_percentage: f64,
    /// General education bucket completion, capped at 100
    pub general_education_completion_percentage: f64,
    /// Elective bucket completion, capped at 100
    pub elective_completion_percentage: f64,
    /// GPA and credit pace meet the configured thresholds
    pub is_on_track: bool,
    /// Chosen date, else projected from remaining credits
    pub expected_graduation_date: Option<NaiveDate>,
}

/// Credit requirements per bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requirements {
    /// Total credits
    pub total: i32,
    /// Major credits
    pub major: i32,
    /// General education credits
    pub general_education: i32,
    /// Elective credits
    pub elective: i32,
}

impl From<&ProgressPolicy> for Requirements {
    fn from(policy: &ProgressPolicy) -> Self {
        Self {
            total: policy.total_credits_required,
            major: policy.major_credits_required,
            general_education: policy.general_education_credits_required,
            elective: policy.elective_credits_required,
        }
    }
}

/// `earned / required` as a percentage in [0, 100]; 0 when nothing is required.
#[must_use]
pub fn completion_percentage(earned: i32, required: i32) -> f64 {
    if required <= 0 {
        return 0.0;
    }
    let percentage = f64::from(earned.max(0)) / f64::from(required) * 100.0;
    (percentage.min(100.0) * 100.0).round() / 100.0
}

/// Inputs to [`degree_progress`] that do not come from the ledger.
#[derive(Debug, Clone, Copy)]
pub struct ProgressContext<'a> {
    /// The student's major
    pub major: Option<&'a str>,
    /// Credits needed per bucket
    pub requirements: Requirements,
    /// On-track thresholds and pacing
    pub policy: &'a ProgressPolicy,
    /// Start year, anchors the projection
    pub catalog_year: i32,
    /// Student-chosen graduation date; wins over the derived one
    pub expected_graduation_date: Option<NaiveDate>,
    /// Date the pace is measured at
    pub as_of: NaiveDate,
}

/// Groups earned credits of graded records into major / general education /
/// elective buckets and evaluates the on-track predicate.
///
/// A course counts toward the major when its department is the student's
/// major, toward general education when it is categorised so, and as an
/// elective otherwise.
#[must_use]
pub fn degree_progress(
    entries: &[LedgerEntry],
    summary: &GpaSummary,
    ctx: &ProgressContext<'_>,
) -> DegreeProgress {
    let (mut major, mut general_education, mut elective) = (0, 0, 0);
    for entry in entries.iter().filter(|e| e.status == GradeStatus::Graded) {
        if entry.in_major(ctx.major) {
            major += entry.credits_earned;
        } else if entry.category == CourseCategory::GeneralEducation {
            general_education += entry.credits_earned;
        } else {
            elective += entry.credits_earned;
        }
    }
    let total = major + general_education + elective;
    let requirements = ctx.requirements;
    let credits_remaining = (requirements.total - total).max(0);

    DegreeProgress {
        total_credits_earned: total,
        major_credits_earned: major,
        general_education_credits_earned: general_education,
        elective_credits_earned: elective,
        total_credits_required: requirements.total,
        credits_remaining,
        completion_percentage: completion_percentage(total, requirements.total),
        major_completion_percentage: completion_percentage(major, requirements.major),
        general_education_completion_percentage: completion_percentage(
            general_education,
            requirements.general_education,
        ),
        elective_completion_percentage: completion_percentage(elective, requirements.elective),
        is_on_track: is_on_track(summary, total, ctx),
        expected_graduation_date: ctx
            .expected_graduation_date
            .or_else(|| projected_graduation(credits_remaining, ctx)),
    }
}

/// GPA at or above the policy minimum (vacuously true before any GPA credits)
/// and at least `credits_per_year` earned for every full year since the
/// catalog year.
fn is_on_track(summary: &GpaSummary, total_earned: i32, ctx: &ProgressContext<'_>) -> bool {
    let gpa_ok = summary.gpa_credits == 0 || summary.cumulative_gpa >= ctx.policy.minimum_gpa;
    let years_elapsed = (ctx.as_of.year() - ctx.catalog_year).max(0);
    let expected_credits = ctx.policy.credits_per_year.max(0) * years_elapsed;
    gpa_ok && total_earned >= expected_credits
}

/// Spring commencement after the remaining credits at the policy pace.
fn projected_graduation(credits_remaining: i32, ctx: &ProgressContext<'_>) -> Option<NaiveDate> {
    if credits_remaining == 0 {
        return Some(ctx.as_of);
    }
    let pace = ctx.policy.credits_per_year;
    if pace <= 0 {
        return None;
    }
    let years_needed = (credits_remaining + pace - 1) / pace;
    NaiveDate::from_ymd_opt(ctx.as_of.year() + years_needed, 5, 15)
}

/// Score spread and letter distribution over the rows of one course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeStatistics {
    /// Rows with a final grade
    pub graded: u32,
    /// Rows awaiting a grade
    pub pending: u32,
    /// Incomplete rows
    pub incomplete: u32,
    /// Withdrawn rows
    pub withdrawn: u32,
    /// Graded rows with a passing letter
    pub passing: u32,
    /// Graded rows with a failing letter
    pub failing: u32,
    /// Passing over graded, as a percentage
    pub pass_rate: f64,
    /// Mean grade points of graded rows
    pub average_grade_points: f64,
    /// Graded rows that carry a percentage; the percentage figures below
    /// are computed over these only
    pub percentage_count: u32,
    /// Mean percentage
    pub average_percentage: f64,
    /// Median percentage
    pub median_percentage: f64,
    /// Highest percentage
    pub highest_percentage: f64,
    /// Lowest percentage
    pub lowest_percentage: f64,
    /// Sample standard deviation, 0 with fewer than two percentages
    pub standard_deviation: f64,
    /// Graded rows per letter
    pub grade_distribution: BTreeMap<String, u32>,
}

fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn median(sorted: &[f64]) -> f64 {
    match sorted.len() {
        0 => 0.0,
        n if n % 2 == 1 => sorted[n / 2],
        n => (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0,
    }
}

/// Aggregates the grade ledger rows of a single course.
///
/// Only `graded` rows feed the figures; the other statuses are counted.
/// A row passes when its letter grade is a passing one.
#[must_use]
pub fn grade_statistics(records: &[academic_record::Model]) -> GradeStatistics {
    let (mut pending, mut incomplete, mut withdrawn) = (0, 0, 0);
    let mut graded: Vec<&academic_record::Model> = Vec::new();
    for record in records {
        match record.status {
            GradeStatus::Graded => graded.push(record),
            GradeStatus::Pending => pending += 1,
            GradeStatus::Incomplete => incomplete += 1,
            GradeStatus::Withdrawn => withdrawn += 1,
        }
    }

    let mut grade_distribution = BTreeMap::new();
    let mut passing = 0;
    let mut points_sum = 0.0;
    let mut percentages: Vec<f64> = Vec::new();
    for record in &graded {
        let letter = record.letter_grade.as_deref().unwrap_or("Unknown");
        *grade_distribution.entry(letter.to_string()).or_insert(0) += 1;
        if letter.parse::<LetterGrade>().is_ok_and(LetterGrade::is_passing) {
            passing += 1;
        }
        points_sum += record.numeric_grade.unwrap_or(0.0);
        if let Some(percentage) = record.percentage_grade {
            percentages.push(percentage);
        }
    }
    percentages.sort_by(f64::total_cmp);

    let graded_count = u32::try_from(graded.len()).unwrap_or(u32::MAX);
    let count = percentages.len() as f64;
    let mean = if percentages.is_empty() {
        0.0
    } else {
        percentages.iter().sum::<f64>() / count
    };
    let standard_deviation = if percentages.len() < 2 {
        0.0
    } else {
        (percentages.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (count - 1.0)).sqrt()
    };

    GradeStatistics {
        graded: graded_count,
        pending,
        incomplete,
        withdrawn,
        passing,
        failing: graded_count - passing,
        pass_rate: if graded_count == 0 {
            0.0
        } else {
            round_percentage(f64::from(passing) / f64::from(graded_count) * 100.0)
        },
        average_grade_points: if graded_count == 0 {
            0.0
        } else {
            round_gpa(points_sum / f64::from(graded_count))
        },
        percentage_count: u32::try_from(percentages.len()).unwrap_or(u32::MAX),
        average_percentage: round_percentage(mean),
        median_percentage: round_percentage(median(&percentages)),
        highest_percentage: percentages.last().copied().unwrap_or(0.0),
        lowest_percentage: percentages.first().copied().unwrap_or(0.0),
        standard_deviation: round_percentage(standard_deviation),
        grade_distribution,
    }
}
