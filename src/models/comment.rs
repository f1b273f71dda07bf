use serde::{Deserialize, Serialize};

/// 一条评论
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// 评论ID
    #[serde(alias = "cid")]
    pub id: String,
    /// 作者
    #[serde(default)]
    pub author: String,
    /// 评论正文
    #[serde(default)]
    pub text: String,
}

impl Comment {
    pub fn new(id: impl Into<String>, author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author: author.into(),
            text: text.into(),
        }
    }
}
