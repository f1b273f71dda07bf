//! 分析入口 - 编排层
//!
//! 管理一次分析的完整生命周期：
//! 加载规则 → 加载评论 → 分批提取 → 汇总 → 获取汇率 → 折算 → 输出报告

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use futures::StreamExt;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::comment::Comment;
use crate::models::currency::RuleSet;
use crate::models::loaders::{load_comments, load_rule_set};
use crate::models::summary::{AnalysisSummary, ExchangeRateTable};
use crate::orchestrator::aggregator::Aggregator;
use crate::orchestrator::batch_processor::{BatchScheduler, SchedulerSettings};
use crate::services::{currency_normalizer, ExchangeRateClient};
use crate::utils::{logging, report};
use crate::workflow::CommentFlow;

/// 应用主结构
pub struct App {
    config: Config,
    rules: Arc<RuleSet>,
    fallback_rates: Option<ExchangeRateTable>,
    scheduler: BatchScheduler,
}

impl App {
    /// 初始化应用：加载并编译规则文件
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::log_startup(&config);

        let (rules, fallback_rates) = load_rule_set(Path::new(&config.rules_file))
            .await
            .with_context(|| format!("无法加载规则文件: {}", config.rules_file))?;

        Ok(Self::with_rules(config, rules, fallback_rates))
    }

    /// 使用已编译的规则创建应用
    pub fn with_rules(
        config: Config,
        rules: RuleSet,
        fallback_rates: Option<ExchangeRateTable>,
    ) -> Self {
        let rules = Arc::new(rules);
        let extractor = Arc::new(CommentFlow::new(rules.clone()));
        let scheduler = BatchScheduler::new(extractor, SchedulerSettings::from_config(&config));

        Self {
            config,
            rules,
            fallback_rates,
            scheduler,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<AnalysisSummary> {
        // 评论来源失败时直接结束，不进入提取流程
        let comments = load_comments(Path::new(&self.config.comments_file))
            .await
            .context("无法加载评论")?;

        if comments.is_empty() {
            warn!("⚠️ 没有找到任何评论，视频可能不可用或没有评论");
        }

        let aggregator = self.process_comments(comments).await;
        let rates = self.resolve_rates().await;
        let summary = self.summarize(&aggregator, rates.as_ref());

        report::render_summary(&summary, rates.as_ref(), &self.rules);

        if !self.config.output_report_file.is_empty() {
            report::write_json_report(Path::new(&self.config.output_report_file), &summary)
                .await?;
            info!("\n报告已保存至: {}", self.config.output_report_file);
        }

        Ok(summary)
    }

    /// 分批处理所有评论并汇总
    pub async fn process_comments(&self, comments: Vec<Comment>) -> Aggregator {
        let total = comments.len();
        let settings = self.scheduler.settings();
        logging::log_comments_loaded(total, settings.batch_size, settings.max_workers);

        let total_batches = total.div_ceil(settings.batch_size);
        let started = Instant::now();
        let mut aggregator = Aggregator::new();
        let mut batches = Box::pin(self.scheduler.run(comments));

        while let Some(batch) = batches.next().await {
            aggregator.merge(&batch);
            logging::log_batch_complete(&batch, total_batches);
            logging::log_progress(aggregator.comments_seen(), started.elapsed());
        }

        logging::log_processing_finished(aggregator.comments_seen(), started.elapsed());
        aggregator
    }

    /// 获取汇率快照
    ///
    /// 接口失败时使用规则文件中的备用汇率；都没有时返回 None，只输出各币种合计
    pub async fn resolve_rates(&self) -> Option<ExchangeRateTable> {
        let fetched = match ExchangeRateClient::new(&self.config) {
            Ok(client) => client.fetch(&self.config.base_currency).await,
            Err(e) => Err(e),
        };

        match fetched {
            Ok(table) => Some(table),
            Err(e) => {
                warn!("⚠️ 获取汇率失败: {}", e);
                match &self.fallback_rates {
                    Some(fallback)
                        if !fallback.base().eq_ignore_ascii_case(&self.config.base_currency) =>
                    {
                        warn!(
                            "⚠️ 备用汇率以 {} 为基准，与配置的基准币种 {} 不一致，将只输出各币种合计",
                            fallback.base(),
                            self.config.base_currency
                        );
                        None
                    }
                    Some(fallback) => {
                        warn!("⚠️ 使用规则文件中的备用汇率 ({} 个币种)", fallback.len());
                        Some(fallback.clone())
                    }
                    None => {
                        warn!("⚠️ 没有备用汇率，将只输出各币种合计");
                        None
                    }
                }
            }
        }
    }

    /// 生成结构化结果
    pub fn summarize(
        &self,
        aggregator: &Aggregator,
        rates: Option<&ExchangeRateTable>,
    ) -> AnalysisSummary {
        let base = &self.config.base_currency;
        let combined_total = rates.and_then(|table| {
            match currency_normalizer::normalize(aggregator.state(), table, base) {
                Ok(total) => Some(total),
                Err(e) => {
                    warn!("⚠️ 无法计算 {} 总额: {}", base, e);
                    None
                }
            }
        });

        AnalysisSummary {
            generated_at: chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            comments_seen: aggregator.comments_seen(),
            per_currency: aggregator.state().clone(),
            base_currency: base.clone(),
            combined_total,
            timed_out: aggregator.timed_out(),
            errored: aggregator.errored(),
            rejected: aggregator.rejected().clone(),
            donations: aggregator.donations().to_vec(),
        }
    }
}
