//! 批量评论处理器 - 编排层
//!
//! ## 职责
//!
//! 把评论序列切成固定大小的批次，逐批并发处理，并按输入顺序产出 `BatchResult`。
//!
//! ## 核心功能
//!
//! 1. **分批**：连续的 `batch_size` 条评论为一批，最后一批可以更短
//! 2. **并发控制**：使用 Semaphore 限制同时运行的 worker 数量
//! 3. **单条限时**：每条评论经过 `run_with_budget`，拿到许可后开始计时
//! 4. **批次限时**：整批超过 `batch_timeout` 时，未完成的评论记为超时，立即结束本批
//! 5. **惰性产出**：以 `Stream` 形式逐批返回，调用方可以边处理边汇报进度
//!
//! ## 设计特点
//!
//! - 批次之间串行，不会有两个批次同时在跑
//! - worker 只返回结果，不接触任何共享状态
//! - 超时被放弃的提取仍占用 worker，直到它真正返回

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, Stream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use crate::config::Config;
use crate::models::comment::Comment;
use crate::models::donation::{BatchResult, ItemOutcome, Outcome};
use crate::workflow::{run_with_budget, ItemExtractor};

/// 调度参数
#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    pub batch_size: usize,
    pub max_workers: usize,
    pub batch_timeout: Duration,
    pub item_timeout: Duration,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            batch_size: config.batch_size,
            max_workers: config.max_workers,
            batch_timeout: config.batch_timeout(),
            item_timeout: config.item_timeout(),
        }
    }
}

/// 批次调度器
#[derive(Clone)]
pub struct BatchScheduler {
    extractor: Arc<dyn ItemExtractor>,
    settings: SchedulerSettings,
    semaphore: Arc<Semaphore>,
}

impl BatchScheduler {
    pub fn new(extractor: Arc<dyn ItemExtractor>, settings: SchedulerSettings) -> Self {
        let settings = SchedulerSettings {
            batch_size: settings.batch_size.max(1),
            max_workers: settings.max_workers.max(1),
            ..settings
        };
        Self {
            extractor,
            semaphore: Arc::new(Semaphore::new(settings.max_workers)),
            settings,
        }
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    /// 惰性地逐批处理评论
    ///
    /// 只有在调用方拉取下一项时才会读取并处理下一批
    pub fn run<I>(&self, comments: I) -> impl Stream<Item = BatchResult> + Send + 'static
    where
        I: IntoIterator<Item = Comment>,
        I::IntoIter: Send + 'static,
    {
        let state = (self.clone(), comments.into_iter(), 0usize, 0usize);

        stream::unfold(
            state,
            |(scheduler, mut comments, batch_index, position)| async move {
                let batch: Vec<Comment> = comments
                    .by_ref()
                    .take(scheduler.settings.batch_size)
                    .collect();
                if batch.is_empty() {
                    return None;
                }

                let next_position = position + batch.len();
                let result = scheduler.process_batch(batch_index, position, batch).await;
                Some((result, (scheduler, comments, batch_index + 1, next_position)))
            },
        )
    }

    /// 处理单个批次
    ///
    /// `start_position` 是本批第一条评论在整个输入中的位置
    pub async fn process_batch(
        &self,
        batch_index: usize,
        start_position: usize,
        batch: Vec<Comment>,
    ) -> BatchResult {
        let started = Instant::now();
        let deadline = tokio::time::Instant::now() + self.settings.batch_timeout;
        let total = batch.len();

        let comment_ids: Vec<String> = batch.iter().map(|c| c.id.clone()).collect();
        let mut slots: Vec<Option<Outcome>> = (0..total).map(|_| None).collect();
        let mut tasks = JoinSet::new();

        // 为本批创建并发任务
        for (offset, comment) in batch.into_iter().enumerate() {
            let semaphore = self.semaphore.clone();
            let extractor = self.extractor.clone();
            let item_timeout = self.settings.item_timeout;

            tasks.spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (offset, Outcome::Error(format!("worker 池已关闭: {}", e))),
                };
                let outcome = run_with_budget(extractor, comment, item_timeout, permit).await;
                (offset, outcome)
            });
        }

        // 等待本批任务完成，最多等到批次截止时间
        let mut deadline_exceeded = false;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok((offset, outcome)))) => slots[offset] = Some(outcome),
                Ok(Some(Err(e))) => {
                    error!("[批次 {}] 任务执行失败: {}", batch_index + 1, e);
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_exceeded = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        let pending = slots.iter().filter(|s| s.is_none()).count();
        if deadline_exceeded {
            warn!(
                "[批次 {}] ⏱️ 超过 {:?} 批次时限，{} 条未完成的评论记为超时",
                batch_index + 1,
                self.settings.batch_timeout,
                pending
            );
        }

        let items = slots
            .into_iter()
            .zip(comment_ids)
            .enumerate()
            .map(|(offset, (slot, comment_id))| {
                let outcome = slot.unwrap_or_else(|| {
                    if deadline_exceeded {
                        Outcome::Timeout
                    } else {
                        Outcome::Error("任务异常退出".to_string())
                    }
                });
                ItemOutcome {
                    position: start_position + offset,
                    comment_id,
                    outcome,
                }
            })
            .collect();

        let result = BatchResult {
            batch_index,
            items,
            elapsed: started.elapsed(),
            deadline_exceeded,
        };

        debug!(
            "[批次 {}] 完成 {} 条，超时 {}，失败 {}，耗时 {:?}",
            batch_index + 1,
            result.len(),
            result.timed_out(),
            result.errored(),
            result.elapsed
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExtractError;
    use futures::StreamExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 正文为 "sleep:<毫秒>" 时睡眠，其他情况立即返回
    struct Sleepy {
        running: AtomicUsize,
        peak: AtomicUsize,
    }

    impl Sleepy {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                running: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            })
        }
    }

    impl ItemExtractor for Sleepy {
        fn extract(&self, comment: &Comment, _deadline: Instant) -> Result<Outcome, ExtractError> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Some(ms) = comment.text.strip_prefix("sleep:") {
                let ms: u64 = ms.parse().unwrap_or(0);
                std::thread::sleep(Duration::from_millis(ms));
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(Outcome::empty())
        }
    }

    fn comments(texts: &[&str]) -> Vec<Comment> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Comment::new(format!("c{}", i), "a", *t))
            .collect()
    }

    fn settings(batch_size: usize, max_workers: usize, batch_ms: u64, item_ms: u64) -> SchedulerSettings {
        SchedulerSettings {
            batch_size,
            max_workers,
            batch_timeout: Duration::from_millis(batch_ms),
            item_timeout: Duration::from_millis(item_ms),
        }
    }

    #[tokio::test]
    async fn test_partitions_in_input_order() {
        let scheduler = BatchScheduler::new(Sleepy::new(), settings(2, 2, 5_000, 1_000));
        let results: Vec<BatchResult> = scheduler
            .run(comments(&["a", "b", "c", "d", "e"]))
            .collect()
            .await;

        assert_eq!(results.len(), 3);
        assert_eq!(
            results.iter().map(|r| r.batch_index).collect::<Vec<_>>(),
            vec![0, 1, 2]
        );
        assert_eq!(results.iter().map(|r| r.len()).collect::<Vec<_>>(), vec![2, 2, 1]);

        let positions: Vec<usize> = results
            .iter()
            .flat_map(|r| r.items.iter().map(|i| i.position))
            .collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4]);
        assert_eq!(results[2].items[0].comment_id, "c4");
    }

    #[tokio::test]
    async fn test_empty_input_yields_nothing() {
        let scheduler = BatchScheduler::new(Sleepy::new(), settings(10, 2, 1_000, 100));
        let results: Vec<BatchResult> = scheduler.run(Vec::new()).collect().await;
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_hung_item_does_not_block_siblings() {
        let scheduler = BatchScheduler::new(Sleepy::new(), settings(4, 4, 5_000, 50));
        let mut stream = Box::pin(scheduler.run(comments(&["a", "sleep:400", "b", "c"])));
        let batch = stream.next().await.unwrap();

        assert_eq!(batch.len(), 4);
        assert!(!batch.deadline_exceeded);
        assert_eq!(batch.items[1].outcome, Outcome::Timeout);
        assert_eq!(batch.timed_out(), 1);
        assert_eq!(batch.succeeded(), 3);
    }

    #[tokio::test]
    async fn test_batch_timeout_marks_pending_items() {
        let scheduler = BatchScheduler::new(Sleepy::new(), settings(3, 3, 100, 5_000));
        let started = Instant::now();
        let results: Vec<BatchResult> = scheduler
            .run(comments(&["a", "sleep:1000", "b", "c"]))
            .collect()
            .await;

        // 不会等到慢任务结束
        assert!(started.elapsed() < Duration::from_millis(900));
        assert!(results[0].deadline_exceeded);
        assert_eq!(results[0].items[1].outcome, Outcome::Timeout);
        assert_eq!(results[0].items[0].outcome, Outcome::empty());
        // 下一批照常处理
        assert!(!results[1].deadline_exceeded);
        assert_eq!(results[1].items[0].position, 3);
    }

    #[tokio::test]
    async fn test_worker_pool_is_bounded() {
        let extractor = Sleepy::new();
        let scheduler = BatchScheduler::new(extractor.clone(), settings(8, 2, 5_000, 1_000));
        let texts = ["sleep:20"; 8];
        let results: Vec<BatchResult> = scheduler.run(comments(&texts)).collect().await;

        assert_eq!(results[0].succeeded(), 8);
        assert!(extractor.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_timed_out_items_still_count_against_pool() {
        let extractor = Sleepy::new();
        let scheduler = BatchScheduler::new(extractor.clone(), settings(4, 1, 10_000, 30));
        let texts = ["sleep:150"; 4];
        let results: Vec<BatchResult> = scheduler.run(comments(&texts)).collect().await;

        assert_eq!(results[0].timed_out(), 4);
        assert_eq!(extractor.peak.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_batch_timeout_does_not_free_busy_workers() {
        let extractor = Sleepy::new();
        let scheduler = BatchScheduler::new(extractor.clone(), settings(2, 2, 50, 5_000));
        let results: Vec<BatchResult> = scheduler
            .run(comments(&["sleep:300", "sleep:300", "sleep:10", "sleep:10"]))
            .collect()
            .await;

        assert!(results[0].deadline_exceeded);
        assert_eq!(results[0].timed_out(), 2);
        assert!(extractor.peak.load(Ordering::SeqCst) <= 2);
    }
}
