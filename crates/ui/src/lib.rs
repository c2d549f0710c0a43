pub mod views;
pub mod vm;

pub use views::ViewError;
pub use vm::{NextOutcome, QuestionCardVm, QuestionScreen, QuestionVm, ResultVm};
