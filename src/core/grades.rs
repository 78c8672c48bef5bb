//! Grade validation - pure, storage-independent grade rules.
//!
//! Letter grades are an enumerated type with a fixed grade-point and
//! percentage-band table. Everything that accepts grade input runs it through
//! [`GradeSubmission::validate`] before touching the database.

use crate::{
    entities::GradeStatus,
    errors::{Error, Result},
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::{fmt, str::FromStr};

/// Allowed distance between a submitted numeric grade and the letter's points.
pub const NUMERIC_TOLERANCE: f64 = 0.1;

/// Grade points range.
pub const MAX_NUMERIC_GRADE: f64 = 4.0;

/// Percentage range upper bound.
pub const MAX_PERCENTAGE_GRADE: f64 = 100.0;

/// The fixed set of letter grades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LetterGrade {
    /// A+, 4.0
    APlus,
    /// A, 4.0
    A,
    /// A-, 3.7
    AMinus,
    /// B+, 3.3
    BPlus,
    /// B, 3.0
    B,
    /// B-, 2.7
    BMinus,
    /// C+, 2.3
    CPlus,
    /// C, 2.0
    C,
    /// C-, 1.7
    CMinus,
    /// D+, 1.3
    DPlus,
    /// D, 1.0
    D,
    /// D-, 0.7
    DMinus,
    /// F, 0.0
    F,
    /// Pass (pass/fail courses)
    Pass,
    /// No pass
    NoPass,
    /// Incomplete
    Incomplete,
    /// Withdrawn
    Withdrawn,
}

impl LetterGrade {
    /// Every letter grade, best first.
    pub const ALL: [Self; 17] = [
        Self::APlus,
        Self::A,
        Self::AMinus,
        Self::BPlus,
        Self::B,
        Self::BMinus,
        Self::CPlus,
        Self::C,
        Self::CMinus,
        Self::DPlus,
        Self::D,
        Self::DMinus,
        Self::F,
        Self::Pass,
        Self::NoPass,
        Self::Incomplete,
        Self::Withdrawn,
    ];

    /// Transcript notation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::AMinus => "A-",
            Self::BPlus => "B+",
            Self::B => "B",
            Self::BMinus => "B-",
            Self::CPlus => "C+",
            Self::C => "C",
            Self::CMinus => "C-",
            Self::DPlus => "D+",
            Self::D => "D",
            Self::DMinus => "D-",
            Self::F => "F",
            Self::Pass => "P",
            Self::NoPass => "NP",
            Self::Incomplete => "I",
            Self::Withdrawn => "W",
        }
    }

    /// Grade points on the 4.0 scale. `None` for I and W.
    #[must_use]
    pub const fn points(self) -> Option<f64> {
        match self {
            Self::APlus | Self::A | Self::Pass => Some(4.0),
            Self::AMinus => Some(3.7),
            Self::BPlus => Some(3.3),
            Self::B => Some(3.0),
            Self::BMinus => Some(2.7),
            Self::CPlus => Some(2.3),
            Self::C => Some(2.0),
            Self::CMinus => Some(1.7),
            Self::DPlus => Some(1.3),
            Self::D => Some(1.0),
            Self::DMinus => Some(0.7),
            Self::F | Self::NoPass => Some(0.0),
            Self::Incomplete | Self::Withdrawn => None,
        }
    }

    /// Half-open percentage band `[low, high)`; the top band includes 100.
    /// `None` for grades that are not percentage based.
    #[must_use]
    pub const fn percentage_band(self) -> Option<(f64, f64)> {
        match self {
            Self::APlus => Some((97.0, 100.0)),
            Self::A => Some((93.0, 97.0)),
            Self::AMinus => Some((90.0, 93.0)),
            Self::BPlus => Some((87.0, 90.0)),
            Self::B => Some((83.0, 87.0)),
            Self::BMinus => Some((80.0, 83.0)),
            Self::CPlus => Some((77.0, 80.0)),
            Self::C => Some((73.0, 77.0)),
            Self::CMinus => Some((70.0, 73.0)),
            Self::DPlus => Some((67.0, 70.0)),
            Self::D => Some((63.0, 67.0)),
            Self::DMinus => Some((60.0, 63.0)),
            Self::F => Some((0.0, 60.0)),
            Self::Pass | Self::NoPass | Self::Incomplete | Self::Withdrawn => None,
        }
    }

    /// Letter for a percentage in [0, 100].
    pub fn from_percentage(percentage: f64) -> Result<Self> {
        validate_percentage_grade(percentage)?;
        Ok(Self::ALL
            .into_iter()
            .find(|grade| grade.band_contains(percentage))
            .unwrap_or(Self::F))
    }

    fn band_contains(self, percentage: f64) -> bool {
        match self.percentage_band() {
            Some((low, high)) if high >= MAX_PERCENTAGE_GRADE => {
                (low..=high).contains(&percentage)
            }
            Some((low, high)) => (low..high).contains(&percentage),
            None => false,
        }
    }

    /// Whether the grade earns the course's credits.
    #[must_use]
    pub const fn is_passing(self) -> bool {
        !matches!(
            self,
            Self::F | Self::NoPass | Self::Incomplete | Self::Withdrawn
        )
    }

    /// Ledger status implied by the letter.
    #[must_use]
    pub const fn implied_status(self) -> GradeStatus {
        match self {
            Self::Incomplete => GradeStatus::Incomplete,
            Self::Withdrawn => GradeStatus::Withdrawn,
            _ => GradeStatus::Graded,
        }
    }
}

impl fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LetterGrade {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|grade| grade.as_str() == normalized)
            .ok_or_else(|| Error::validation(format!("Invalid letter grade: {s}")))
    }
}

impl Serialize for LetterGrade {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LetterGrade {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Rejects numeric grades outside [0.0, 4.0].
pub fn validate_numeric_grade(numeric_grade: f64) -> Result<f64> {
    if !(0.0..=MAX_NUMERIC_GRADE).contains(&numeric_grade) {
        return Err(Error::validation(format!(
            "Numeric grade must be between 0.0 and 4.0, got {numeric_grade}"
        )));
    }
    Ok(numeric_grade)
}

/// Rejects percentages outside [0.0, 100.0].
pub fn validate_percentage_grade(percentage_grade: f64) -> Result<f64> {
    if !(0.0..=MAX_PERCENTAGE_GRADE).contains(&percentage_grade) {
        return Err(Error::validation(format!(
            "Percentage grade must be between 0.0 and 100.0, got {percentage_grade}"
        )));
    }
    Ok(percentage_grade)
}

/// Rejects credits earned above credits attempted, and negative credits.
pub fn validate_credits(credits_earned: i32, credits_attempted: i32) -> Result<()> {
    if credits_earned < 0 || credits_attempted < 0 {
        return Err(Error::validation("Credits cannot be negative"));
    }
    if credits_earned > credits_attempted {
        return Err(Error::validation(format!(
            "Credits earned ({credits_earned}) cannot exceed credits attempted ({credits_attempted})"
        )));
    }
    Ok(())
}

/// Raw grade input from a professor.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct GradeSubmission {
    /// Letter grade; derived from `percentage_grade` when omitted
    pub letter_grade: Option<LetterGrade>,
    /// Grade points; must match the letter when both are given
    pub numeric_grade: Option<f64>,
    /// Percentage; must fall in the letter's band
    pub percentage_grade: Option<f64>,
    /// Defaults to all attempted credits for passing grades, otherwise 0
    pub credits_earned: Option<i32>,
    /// Stored on the ledger row
    pub professor_notes: Option<String>,
}

/// A submission that passed every rule, with derived fields filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedGrade {
    /// Submitted or derived letter
    pub letter_grade: LetterGrade,
    /// Grade points; `None` for letters without points
    pub numeric_grade: Option<f64>,
    /// Percentage as submitted
    pub percentage_grade: Option<f64>,
    /// Credits granted
    pub credits_earned: i32,
    /// Ledger status implied by the letter
    pub status: GradeStatus,
}

impl GradeSubmission {
    /// Checks ranges and letter/numeric/percentage consistency against the
    /// fixed table, then fills in what the submission left out.
    pub fn validate(&self, credits_attempted: i32) -> Result<ValidatedGrade> {
        let numeric_grade = self.numeric_grade.map(validate_numeric_grade).transpose()?;
        let percentage_grade = self
            .percentage_grade
            .map(validate_percentage_grade)
            .transpose()?;

        let letter_grade = match (self.letter_grade, percentage_grade) {
            (Some(letter), _) => letter,
            (None, Some(percentage)) => LetterGrade::from_percentage(percentage)?,
            (None, None) => {
                return Err(Error::validation(
                    "A letter grade or percentage grade is required",
                ));
            }
        };

        let numeric_grade = match (letter_grade.points(), numeric_grade) {
            (Some(points), Some(numeric)) => {
                if (numeric - points).abs() > NUMERIC_TOLERANCE {
                    return Err(Error::validation(format!(
                        "Letter grade {letter_grade} and numeric grade {numeric} do not match"
                    )));
                }
                Some(numeric)
            }
            (Some(points), None) => Some(points),
            (None, numeric) => numeric,
        };

        if let (Some((low, high)), Some(percentage)) =
            (letter_grade.percentage_band(), percentage_grade)
        {
            if !letter_grade.band_contains(percentage) {
                return Err(Error::validation(format!(
                    "Percentage {percentage} is outside the {letter_grade} band [{low}, {high})"
                )));
            }
        }

        let credits_earned = self.credits_earned.unwrap_or(if letter_grade.is_passing() {
            credits_attempted
        } else {
            0
        });
        validate_credits(credits_earned, credits_attempted)?;

        Ok(ValidatedGrade {
            letter_grade,
            numeric_grade,
            percentage_grade,
            credits_earned,
            status: letter_grade.implied_status(),
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_parse_letter_grades() {
        assert_eq!("A+".parse::<LetterGrade>().unwrap(), LetterGrade::APlus);
        assert_eq!(" b- ".parse::<LetterGrade>().unwrap(), LetterGrade::BMinus);
        assert_eq!("np".parse::<LetterGrade>().unwrap(), LetterGrade::NoPass);
        assert!(matches!(
            "E".parse::<LetterGrade>(),
            Err(Error::Validation { .. })
        ));
        for grade in LetterGrade::ALL {
            assert_eq!(grade.as_str().parse::<LetterGrade>().unwrap(), grade);
        }
    }

    #[test]
    fn test_points_table() {
        assert_eq!(LetterGrade::A.points(), Some(4.0));
        assert_eq!(LetterGrade::BPlus.points(), Some(3.3));
        assert_eq!(LetterGrade::DMinus.points(), Some(0.7));
        assert_eq!(LetterGrade::F.points(), Some(0.0));
        assert_eq!(LetterGrade::Incomplete.points(), None);
        assert_eq!(LetterGrade::Withdrawn.points(), None);
    }

    #[test]
    fn test_from_percentage_boundaries() {
        assert_eq!(LetterGrade::from_percentage(100.0).unwrap(), LetterGrade::APlus);
        assert_eq!(LetterGrade::from_percentage(97.0).unwrap(), LetterGrade::APlus);
        assert_eq!(LetterGrade::from_percentage(96.9).unwrap(), LetterGrade::A);
        assert_eq!(LetterGrade::from_percentage(83.0).unwrap(), LetterGrade::B);
        assert_eq!(LetterGrade::from_percentage(59.99).unwrap(), LetterGrade::F);
        assert_eq!(LetterGrade::from_percentage(0.0).unwrap(), LetterGrade::F);
        assert!(LetterGrade::from_percentage(100.5).is_err());
    }

    #[test]
    fn test_range_validators() {
        assert!(validate_numeric_grade(4.0).is_ok());
        assert!(validate_numeric_grade(0.0).is_ok());
        assert!(validate_numeric_grade(4.01).is_err());
        assert!(validate_numeric_grade(-0.1).is_err());
        assert!(validate_numeric_grade(f64::NAN).is_err());
        assert!(validate_percentage_grade(100.0).is_ok());
        assert!(validate_percentage_grade(100.1).is_err());
        assert!(validate_credits(3, 3).is_ok());
        assert!(validate_credits(4, 3).is_err());
        assert!(validate_credits(-1, 3).is_err());
    }

    #[test]
    fn test_submission_derives_missing_fields() {
        let submission = GradeSubmission {
            letter_grade: Some(LetterGrade::BPlus),
            ..Default::default()
        };
        let grade = submission.validate(3).unwrap();
        assert_eq!(grade.numeric_grade, Some(3.3));
        assert_eq!(grade.credits_earned, 3);
        assert_eq!(grade.status, GradeStatus::Graded);

        let failing = GradeSubmission {
            percentage_grade: Some(42.0),
            ..Default::default()
        };
        let grade = failing.validate(4).unwrap();
        assert_eq!(grade.letter_grade, LetterGrade::F);
        assert_eq!(grade.numeric_grade, Some(0.0));
        assert_eq!(grade.credits_earned, 0);
    }

    #[test]
    fn test_submission_rejects_inconsistent_grades() {
        let mismatched_numeric = GradeSubmission {
            letter_grade: Some(LetterGrade::A),
            numeric_grade: Some(3.0),
            ..Default::default()
        };
        assert!(matches!(
            mismatched_numeric.validate(3),
            Err(Error::Validation { .. })
        ));

        let mismatched_percentage = GradeSubmission {
            letter_grade: Some(LetterGrade::A),
            percentage_grade: Some(85.0),
            ..Default::default()
        };
        assert!(matches!(
            mismatched_percentage.validate(3),
            Err(Error::Validation { .. })
        ));

        let too_many_credits = GradeSubmission {
            letter_grade: Some(LetterGrade::A),
            credits_earned: Some(4),
            ..Default::default()
        };
        assert!(matches!(
            too_many_credits.validate(3),
            Err(Error::Validation { .. })
        ));

        let empty = GradeSubmission::default();
        assert!(empty.validate(3).is_err());
    }

    #[test]
    fn test_incomplete_and_withdrawn_letters_set_status() {
        let incomplete = GradeSubmission {
            letter_grade: Some(LetterGrade::Incomplete),
            ..Default::default()
        }
        .validate(3)
        .unwrap();
        assert_eq!(incomplete.status, GradeStatus::Incomplete);
        assert_eq!(incomplete.numeric_grade, None);
        assert_eq!(incomplete.credits_earned, 0);

        let withdrawn = GradeSubmission {
            letter_grade: Some(LetterGrade::Withdrawn),
            ..Default::default()
        }
        .validate(3)
        .unwrap();
        assert_eq!(withdrawn.status, GradeStatus::Withdrawn);
    }

    #[test]
    fn test_letter_grade_serde() {
        let json = serde_json::to_string(&LetterGrade::CMinus).unwrap();
        assert_eq!(json, "\"C-\"");
        let parsed: LetterGrade = serde_json::from_str("\"B+\"").unwrap();
        assert_eq!(parsed, LetterGrade::BPlus);
        assert!(serde_json::from_str::<LetterGrade>("\"Z\"").is_err());
    }
}
