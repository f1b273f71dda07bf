pub mod comment_flow;
pub mod item_envelope;

pub use comment_flow::{CommentFlow, ItemExtractor};
pub use item_envelope::run_with_budget;
