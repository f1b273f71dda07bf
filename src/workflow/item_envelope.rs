//! 单条评论的执行预算
//!
//! 提取在阻塞线程池中运行，外层用 `tokio::time::timeout` 限时：
//! 超时后直接放弃该任务，它之后产生的结果会被丢弃。
//! 提取器自身也会拿到截止时间，按协作方式尽早退出。
//! worker 许可随阻塞任务一起移动，被放弃的任务在真正结束前仍占用一个 worker。

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OwnedSemaphorePermit;
use tracing::{error, warn};

use crate::error::ExtractError;
use crate::models::comment::Comment;
use crate::models::donation::Outcome;
use crate::workflow::comment_flow::ItemExtractor;

/// 在 `budget` 时间内处理一条评论
///
/// 任何失败都在这里被转换为 `Outcome`，不会影响同批次的其他评论。
/// `permit` 在提取函数返回后才释放
pub async fn run_with_budget(
    extractor: Arc<dyn ItemExtractor>,
    comment: Comment,
    budget: Duration,
    permit: OwnedSemaphorePermit,
) -> Outcome {
    let comment_id = comment.id.clone();
    let deadline = Instant::now() + budget;

    let handle = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        extractor.extract(&comment, deadline)
    });

    match tokio::time::timeout(budget, handle).await {
        Ok(Ok(Ok(outcome))) => outcome,
        Ok(Ok(Err(ExtractError::DeadlineExceeded))) | Err(_) => {
            warn!("[评论 {}] ⏱️ 超过 {:?} 执行时限，已放弃", comment_id, budget);
            Outcome::Timeout
        }
        Ok(Ok(Err(ExtractError::Failed(reason)))) => {
            error!("[评论 {}] ❌ 处理失败: {}", comment_id, reason);
            Outcome::Error(reason)
        }
        Ok(Err(join_error)) => {
            let reason = if join_error.is_panic() {
                format!("panic: {}", panic_message(join_error.into_panic()))
            } else {
                join_error.to_string()
            };
            error!("[评论 {}] ❌ 任务执行失败: {}", comment_id, reason);
            Outcome::Error(reason)
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
