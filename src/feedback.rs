use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::config::FormPolicy;
use crate::error::ValidationError;

/// Subjects a student can leave feedback for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Subject {
    Physics,
    Chemistry,
    Mathematics,
    #[serde(rename = "Computer Science")]
    ComputerScience,
    English,
}

impl Subject {
    pub const ALL: [Subject; 5] = [
        Subject::Physics,
        Subject::Chemistry,
        Subject::Mathematics,
        Subject::ComputerScience,
        Subject::English,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Subject::Physics => "Physics",
            Subject::Chemistry => "Chemistry",
            Subject::Mathematics => "Mathematics",
            Subject::ComputerScience => "Computer Science",
            Subject::English => "English",
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Subject::ALL
            .into_iter()
            .find(|subject| subject.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("Unknown subject: {}", wanted))
    }
}

/// A rating on the 1 (poor) to 5 (excellent) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Option<Self> {
        (Self::MIN..=Self::MAX).contains(&value).then_some(Rating(value))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Rating {
    fn default() -> Self {
        Rating(4)
    }
}

impl TryFrom<i64> for Rating {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .ok()
            .and_then(Rating::new)
            .ok_or_else(|| format!("rating {} is outside {}..={}", value, Rating::MIN, Rating::MAX))
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The submission form exactly as it arrives from the browser. Fields the
/// browser leaves out deserialise as blank.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct FeedbackForm {
    pub student_name: String,
    pub subject: String,
    pub rating: String,
    pub comments: String,
}

impl FeedbackForm {
    /// The form as first shown, with the subject and rating pickers preset.
    pub fn initial() -> Self {
        Self {
            subject: Subject::Physics.to_string(),
            rating: Rating::default().to_string(),
            ..Self::default()
        }
    }

    /// Checks the form against `policy`. Values are kept as submitted; only
    /// the blank checks look at trimmed text.
    pub fn validate(&self, policy: &FormPolicy) -> Result<NewFeedback, ValidationError> {
        let blank = |value: &str| value.trim().is_empty();

        if policy.require_name && blank(&self.student_name) {
            return Err(ValidationError("Please enter your name.".to_string()));
        }

        if blank(&self.subject) || (policy.require_comments && blank(&self.comments)) {
            let message = if policy.require_comments {
                "Please fill subject and comments."
            } else {
                "Please choose a subject."
            };
            return Err(ValidationError(message.to_string()));
        }

        let subject = self.subject.parse::<Subject>().map_err(ValidationError)?;

        let rating = self
            .rating
            .trim()
            .parse::<u8>()
            .ok()
            .and_then(Rating::new)
            .ok_or_else(|| {
                ValidationError(format!(
                    "Rating must be a whole number between {} and {}.",
                    Rating::MIN,
                    Rating::MAX
                ))
            })?;

        Ok(NewFeedback {
            student_name: self.student_name.clone(),
            subject,
            rating,
            comments: self.comments.clone(),
        })
    }
}

/// A validated submission waiting for storage to assign its identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub student_name: String,
    pub subject: Subject,
    pub rating: Rating,
    pub comments: String,
}

impl NewFeedback {
    pub fn into_record(self, id: i64, submitted_at: Option<DateTime<Utc>>) -> FeedbackRecord {
        FeedbackRecord {
            id,
            student_name: self.student_name,
            subject: self.subject,
            rating: self.rating,
            comments: self.comments,
            submitted_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: i64,
    pub student_name: String,
    pub subject: Subject,
    pub rating: Rating,
    pub comments: String,
    pub submitted_at: Option<DateTime<Utc>>,
}

/// Write-time timestamp, at the precision relational columns keep.
pub fn submission_time() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(0)
}
