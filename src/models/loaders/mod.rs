pub mod comment_loader;
pub mod toml_loader;

pub use comment_loader::load_comments;
pub use toml_loader::{load_rule_set, load_rules_file};
