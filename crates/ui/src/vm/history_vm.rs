use split_core::model::{QuestionId, VoteHistoryItem, VoteOption};

use crate::vm::time_fmt::format_date;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryRowVm {
    pub question_id: QuestionId,
    pub question_text: String,
    pub choice_str: String,
    pub other_str: String,
    pub voted_on_str: String,
}

impl From<&VoteHistoryItem> for HistoryRowVm {
    fn from(item: &VoteHistoryItem) -> Self {
        let other = match item.selected_option {
            VoteOption::A => &item.option_b,
            VoteOption::B => &item.option_a,
        };
        Self {
            question_id: item.question_id.clone(),
            question_text: item.question_text.clone(),
            choice_str: item.selected_text().to_string(),
            other_str: other.clone(),
            voted_on_str: format_date(item.voted_at),
        }
    }
}

#[must_use]
pub fn map_history_rows(items: &[VoteHistoryItem]) -> Vec<HistoryRowVm> {
    items.iter().map(HistoryRowVm::from).collect()
}
