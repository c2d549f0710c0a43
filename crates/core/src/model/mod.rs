mod ids;
mod question;
mod streak;
mod vote;

pub use ids::{DeviceId, QuestionId};
pub use question::Question;
pub use streak::Streak;
pub use vote::{VoteHistoryItem, VoteOption, VoteResult};
