use serde::{Deserialize, Serialize};

use crate::model::ids::QuestionId;
use crate::model::vote::VoteOption;

/// A binary "would you rather" question as served by the backend.
///
/// Field names match the backend's row shape so rows deserialize directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub question_id: QuestionId,
    pub question_text: String,
    pub option_a: String,
    pub option_b: String,
}

impl Question {
    #[must_use]
    pub fn new(
        question_id: QuestionId,
        question_text: impl Into<String>,
        option_a: impl Into<String>,
        option_b: impl Into<String>,
    ) -> Self {
        Self {
            question_id,
            question_text: question_text.into(),
            option_a: option_a.into(),
            option_b: option_b.into(),
        }
    }

    #[must_use]
    pub fn id(&self) -> &QuestionId {
        &self.question_id
    }

    /// Text of the given answer option.
    #[must_use]
    pub fn option_text(&self, option: VoteOption) -> &str {
        match option {
            VoteOption::A => &self.option_a,
            VoteOption::B => &self.option_b,
        }
    }
}
