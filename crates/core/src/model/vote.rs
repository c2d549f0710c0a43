use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ModelError;
use crate::model::ids::QuestionId;

//
// ─── VOTE OPTION ──────────────────────────────────────────────────────────────
//

/// One of the two answers to a question. Serialized as `"A"` / `"B"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteOption {
    A,
    B,
}

impl VoteOption {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            VoteOption::A => "A",
            VoteOption::B => "B",
        }
    }
}

impl fmt::Display for VoteOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for VoteOption {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(Self::A),
            "B" | "b" => Ok(Self::B),
            other => Err(ModelError::InvalidOption(other.to_string())),
        }
    }
}

//
// ─── VOTE RESULT ──────────────────────────────────────────────────────────────
//

/// Aggregated tally returned after a vote is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoteResult {
    pub question_id: QuestionId,
    pub total_votes: u64,
    pub option_a_votes: u64,
    pub option_b_votes: u64,
    pub option_a_percentage: f64,
    pub option_b_percentage: f64,
}

impl VoteResult {
    /// Builds a result from raw counts. Percentages are whole numbers that
    /// sum to 100, or both 0 when nobody has voted.
    #[must_use]
    pub fn from_counts(question_id: QuestionId, option_a_votes: u64, option_b_votes: u64) -> Self {
        let total_votes = option_a_votes + option_b_votes;
        let (option_a_percentage, option_b_percentage) = if total_votes == 0 {
            (0.0, 0.0)
        } else {
            #[allow(clippy::cast_precision_loss)]
            let a = (option_a_votes as f64 * 100.0 / total_votes as f64).round();
            (a, 100.0 - a)
        };

        Self {
            question_id,
            total_votes,
            option_a_votes,
            option_b_votes,
            option_a_percentage,
            option_b_percentage,
        }
    }

    #[must_use]
    pub fn votes_for(&self, option: VoteOption) -> u64 {
        match option {
            VoteOption::A => self.option_a_votes,
            VoteOption::B => self.option_b_votes,
        }
    }

    #[must_use]
    pub fn percentage_for(&self, option: VoteOption) -> f64 {
        match option {
            VoteOption::A => self.option_a_percentage,
            VoteOption::B => self.option_b_percentage,
        }
    }
}

//
// ─── HISTORY ──────────────────────────────────────────────────────────────────
//

/// A past vote by this device, with the question it answered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteHistoryItem {
    pub question_id: QuestionId,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
    pub selected_option: VoteOption,
    pub voted_at: DateTime<Utc>,
}

impl VoteHistoryItem {
    #[must_use]
    pub fn selected_text(&self) -> &str {
        match self.selected_option {
            VoteOption::A => &self.option_a,
            VoteOption::B => &self.option_b,
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
