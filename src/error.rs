//! 错误类型
//!
//! 评论级别的问题（金额被拒、单条超时、单条失败）不会出现在这里，
//! 它们以 `Outcome` / `Rejection` 的形式被记录；这里只包含会影响整个运行的错误。

use thiserror::Error;

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 取值不合法
    #[error("配置项 {name} 取值不合法: {reason}")]
    InvalidValue { name: String, reason: String },
    /// 规则文件读取失败
    #[error("无法读取规则文件 {path}: {source}")]
    RulesReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// 规则文件解析失败
    #[error("无法解析规则文件 {path}: {source}")]
    RulesParseFailed {
        path: String,
        source: toml::de::Error,
    },
    /// 匹配规则无效
    #[error("匹配规则 '{pattern}' 无效: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// 评论来源错误
///
/// 来源失败时评论不会进入提取流程
#[derive(Debug, Error)]
pub enum SourceError {
    /// 文件不存在
    #[error("评论文件不存在: {path}")]
    NotFound { path: String },
    /// 读取失败
    #[error("读取评论文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        source: std::io::Error,
    },
    /// JSON 解析失败
    #[error("评论文件 {path} 第 {line} 行 JSON 解析失败: {source}")]
    JsonParseFailed {
        path: String,
        line: usize,
        source: serde_json::Error,
    },
    /// TOML 解析失败
    #[error("评论文件 {path} TOML 解析失败: {source}")]
    TomlParseFailed {
        path: String,
        source: toml::de::Error,
    },
    /// 不支持的文件格式
    #[error("不支持的评论文件格式: {path}（支持 .jsonl / .json / .toml）")]
    UnsupportedFormat { path: String },
}

/// 汇率获取错误（RateFetchFailed）
#[derive(Debug, Error)]
pub enum RateFetchError {
    /// 网络请求失败
    #[error("汇率请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        source: reqwest::Error,
    },
    /// 接口返回错误响应
    #[error("汇率接口返回错误响应 ({endpoint}): {message}")]
    BadResponse { endpoint: String, message: String },
    /// 汇率取值不合法
    #[error("币种 {currency} 的汇率不合法: {value}")]
    InvalidRate { currency: String, value: String },
}

/// 币种换算错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    /// 汇率表缺少某个已统计币种
    #[error("缺少币种 {currency} 到 {base} 的汇率")]
    MissingRate { currency: String, base: String },
    /// 汇率表的基准币种与目标基准币种不一致
    #[error("汇率表基准币种为 {actual}，无法折算为 {expected}")]
    BaseMismatch { expected: String, actual: String },
    /// 换算溢出
    #[error("币种 {currency} 换算溢出")]
    Overflow { currency: String },
}

/// 单条评论提取错误
///
/// 只在提取边界内部使用，最终会被转换成 `Outcome`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// 超过单条评论的执行预算
    #[error("超过单条评论执行时限")]
    DeadlineExceeded,
    /// 其他失败
    #[error("{0}")]
    Failed(String),
}
