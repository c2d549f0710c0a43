use std::sync::Arc;

use backend::VoteRepository;
use split_core::model::{DeviceId, VoteHistoryItem};

use crate::error::HistoryError;

pub struct HistoryService {
    votes: Arc<dyn VoteRepository>,
}

impl HistoryService {
    #[must_use]
    pub fn new(votes: Arc<dyn VoteRepository>) -> Self {
        Self { votes }
    }

    /// Past votes for `device`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `HistoryError::Backend` if the history cannot be fetched.
    pub async fn history(&self, device: &DeviceId) -> Result<Vec<VoteHistoryItem>, HistoryError> {
        let mut items = self.votes.vote_history(device).await?;
        // stable, so equal timestamps keep the backend's order
        items.sort_by(|a, b| b.voted_at.cmp(&a.voted_at));
        Ok(items)
    }
}
