//! 评论处理流程 - 流程层
//!
//! 核心职责：定义"一条评论"的完整处理流程
//!
//! 流程顺序：
//! 1. 过滤空评论、超长评论
//! 2. 匹配候选金额
//! 3. 逐个校验，分成捐赠和被拒两组

use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::error::ExtractError;
use crate::models::comment::Comment;
use crate::models::currency::RuleSet;
use crate::models::donation::Outcome;
use crate::services::{DonationValidator, PatternMatcher};
use crate::utils::logging::truncate_text;

/// 单条评论提取器
///
/// 在阻塞线程池中执行，必须是无状态的；`deadline` 之后应尽快返回
/// `ExtractError::DeadlineExceeded`
pub trait ItemExtractor: Send + Sync + 'static {
    fn extract(&self, comment: &Comment, deadline: Instant) -> Result<Outcome, ExtractError>;
}

/// 默认的评论处理流程：匹配 + 校验
///
/// - 不持有任何可变状态
/// - 只依赖业务能力（services）
pub struct CommentFlow {
    matcher: PatternMatcher,
    validator: DonationValidator,
    max_comment_length: usize,
}

impl CommentFlow {
    /// 创建新的评论处理流程
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            max_comment_length: rules.max_comment_length(),
            matcher: PatternMatcher::new(rules.clone()),
            validator: DonationValidator::new(rules),
        }
    }
}

impl ItemExtractor for CommentFlow {
    fn extract(&self, comment: &Comment, deadline: Instant) -> Result<Outcome, ExtractError> {
        if comment.text.trim().is_empty() || comment.author.trim().is_empty() {
            debug!("[评论 {}] 正文或作者为空，跳过", comment.id);
            return Ok(Outcome::empty());
        }
        if comment.text.chars().count() > self.max_comment_length {
            debug!(
                "[评论 {}] 超过 {} 字符，跳过: {}",
                comment.id,
                self.max_comment_length,
                truncate_text(&comment.text, 40)
            );
            return Ok(Outcome::empty());
        }

        let candidates = self.matcher.match_until(comment, Some(deadline))?;

        let mut donations = Vec::new();
        let mut rejected = Vec::new();
        for candidate in &candidates {
            match self.validator.validate(candidate) {
                Ok(donation) => {
                    debug!(
                        "[评论 {}] ✓ 发现 {} {} (来自 {})",
                        comment.id, donation.currency, donation.amount, donation.author
                    );
                    donations.push(donation);
                }
                Err(rejection) => {
                    debug!(
                        "[评论 {}] 金额被拒绝: {} ({})",
                        comment.id, candidate.matched_text, rejection.reason
                    );
                    rejected.push(rejection);
                }
            }
        }

        // 校验完成前超时同样不返回部分结果
        if Instant::now() >= deadline {
            return Err(ExtractError::DeadlineExceeded);
        }

        Ok(Outcome::Success { donations, rejected })
    }
}
