mod history_vm;
mod question_vm;
mod result_vm;
mod time_fmt;

pub use history_vm::{HistoryRowVm, map_history_rows};
pub use question_vm::{NextOutcome, QuestionCardVm, QuestionScreen, QuestionVm};
pub use result_vm::{OptionResultVm, ResultVm, bar_width};
pub use time_fmt::{format_date, format_datetime};
