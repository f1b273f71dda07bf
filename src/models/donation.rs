//! 捐赠相关的数据模型
//!
//! 从候选金额（`RawCandidate`）到确认的捐赠（`Donation`），
//! 再到每条评论、每个批次的处理结果。

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Range;
use std::time::Duration;

/// 匹配器产生的候选金额，尚未校验
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    /// 币种代码（大写）
    pub currency: String,
    /// 解析后的金额
    pub amount: Decimal,
    /// 来源评论ID
    pub comment_id: String,
    /// 匹配到的文本
    pub matched_text: String,
    /// 匹配位置（字节区间）
    pub span: Range<usize>,
    /// 作者
    pub author: String,
}

/// 校验通过的捐赠记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Donation {
    pub currency: String,
    pub amount: Decimal,
    pub author: String,
    /// 原始匹配文本，例如 "$50"
    pub original: String,
    pub comment_id: String,
}

/// 拒绝原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    BelowMinimum,
    AboveMaximum,
    UnparseableAmount,
    UnsupportedCurrency,
    /// 形如 1900-2100 的整数，多半是年份
    LikelyYear,
}

impl RejectionReason {
    pub fn as_str(self) -> &'static str {
        match self {
            RejectionReason::BelowMinimum => "below_minimum",
            RejectionReason::AboveMaximum => "above_maximum",
            RejectionReason::UnparseableAmount => "unparseable_amount",
            RejectionReason::UnsupportedCurrency => "unsupported_currency",
            RejectionReason::LikelyYear => "likely_year",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 被拒绝的候选金额
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub candidate: RawCandidate,
    pub reason: RejectionReason,
}

/// 单条评论的处理结果
///
/// 每条评论恰好对应一个结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// 处理完成（可能没有任何捐赠）
    Success {
        donations: Vec<Donation>,
        rejected: Vec<Rejection>,
    },
    /// 超时，不会带有任何部分结果
    Timeout,
    /// 处理失败
    Error(String),
}

impl Outcome {
    /// 没有捐赠的成功结果
    pub fn empty() -> Self {
        Outcome::Success {
            donations: Vec::new(),
            rejected: Vec::new(),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, Outcome::Timeout)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Outcome::Error(_))
    }

    /// 成功结果中的捐赠，超时或失败时为空
    pub fn donations(&self) -> &[Donation] {
        match self {
            Outcome::Success { donations, .. } => donations,
            _ => &[],
        }
    }
}

/// 带输入位置的评论处理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    /// 在整个输入序列中的位置（从0开始）
    pub position: usize,
    pub comment_id: String,
    pub outcome: Outcome,
}

/// 一个批次的处理结果
#[derive(Debug, Clone)]
pub struct BatchResult {
    /// 批次编号（从0开始）
    pub batch_index: usize,
    /// 按输入位置排序的结果
    pub items: Vec<ItemOutcome>,
    /// 批次耗时
    pub elapsed: Duration,
    /// 是否触发了批次超时
    pub deadline_exceeded: bool,
}

impl BatchResult {
    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn timed_out(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_timeout()).count()
    }

    pub fn errored(&self) -> usize {
        self.items.iter().filter(|i| i.outcome.is_error()).count()
    }

    pub fn succeeded(&self) -> usize {
        self.len() - self.timed_out() - self.errored()
    }
}
