use std::fmt::Write as _;

use crate::vm::HistoryRowVm;

#[must_use]
pub fn render_history(rows: &[HistoryRowVm]) -> String {
    if rows.is_empty() {
        return "No votes yet.".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let _ = writeln!(
            out,
            "{date}  {question}\n        chose {choice} over {other}",
            date = row.voted_on_str,
            question = row.question_text,
            choice = row.choice_str,
            other = row.other_str,
        );
    }
    out
}
