#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewError {
    Unavailable,
    NothingToVoteOn,
    VoteFailed,
    HistoryFailed,
}

impl ViewError {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            ViewError::NothingToVoteOn => "There is no question to vote on.",
            ViewError::Unavailable | ViewError::VoteFailed | ViewError::HistoryFailed => {
                "Something went wrong. Please try again."
            }
        }
    }
}

impl std::fmt::Display for ViewError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for ViewError {}
