//! Plain-text renderers for the view models.

mod history;
mod question;
mod result;
mod state;

pub use history::render_history;
pub use question::render_question;
pub use result::render_result;
pub use state::ViewError;

/// Width of result bars and rules, in columns.
pub const DEFAULT_WIDTH: usize = 40;
