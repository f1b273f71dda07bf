use crate::error::SourceError;
use crate::models::comment::Comment;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;

#[derive(Debug, Deserialize)]
struct CommentsToml {
    #[serde(default)]
    comments: Vec<Comment>,
}

/// 从导出文件加载评论
///
/// 支持的格式：
/// - `.jsonl`：每行一个 `{id, author, text}` 对象，空行忽略
/// - `.json`：同样结构的数组
/// - `.toml`：`[[comments]]` 表数组
pub async fn load_comments(path: &Path) -> Result<Vec<Comment>, SourceError> {
    let path_str = path.display().to_string();

    if !path.exists() {
        return Err(SourceError::NotFound { path: path_str });
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|source| SourceError::ReadFailed {
            path: path_str.clone(),
            source,
        })?;

    let extension = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.to_ascii_lowercase());

    let comments = match extension.as_deref() {
        Some("jsonl") | Some("ndjson") => parse_json_lines(&content, &path_str)?,
        Some("json") => {
            serde_json::from_str(&content).map_err(|source| SourceError::JsonParseFailed {
                path: path_str.clone(),
                line: source.line(),
                source,
            })?
        }
        Some("toml") => {
            let file: CommentsToml =
                toml::from_str(&content).map_err(|source| SourceError::TomlParseFailed {
                    path: path_str.clone(),
                    source,
                })?;
            file.comments
        }
        _ => return Err(SourceError::UnsupportedFormat { path: path_str }),
    };

    tracing::info!("成功加载 {} 条评论: {}", comments.len(), path_str);
    Ok(comments)
}

fn parse_json_lines(content: &str, path: &str) -> Result<Vec<Comment>, SourceError> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).map_err(|source| SourceError::JsonParseFailed {
                path: path.to_string(),
                line: idx + 1,
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_file(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn test_load_json_lines() {
        let file = temp_file(
            ".jsonl",
            "{\"id\":\"c1\",\"author\":\"a\",\"text\":\"I donated $50\"}\n\n{\"id\":\"c2\",\"author\":\"b\",\"text\":\"hi\"}\n",
        );
        let comments = load_comments(file.path()).await.unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0], Comment::new("c1", "a", "I donated $50"));
    }

    #[tokio::test]
    async fn test_load_toml() {
        let file = temp_file(
            ".toml",
            "[[comments]]\nid = \"c1\"\nauthor = \"a\"\ntext = \"sent ₹1000\"\n",
        );
        let comments = load_comments(file.path()).await.unwrap();
        assert_eq!(comments[0].text, "sent ₹1000");
    }

    #[tokio::test]
    async fn test_bad_line_reports_line_number() {
        let file = temp_file(".jsonl", "{\"id\":\"c1\",\"text\":\"ok\"}\nnot json\n");
        match load_comments(file.path()).await {
            Err(SourceError::JsonParseFailed { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unsupported_extension() {
        let file = temp_file(".csv", "id,author,text\n");
        assert!(matches!(
            load_comments(file.path()).await,
            Err(SourceError::UnsupportedFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_file() {
        assert!(matches!(
            load_comments(Path::new("/nonexistent/comments.jsonl")).await,
            Err(SourceError::NotFound { .. })
        ));
    }
}
