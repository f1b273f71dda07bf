//! # Donation Analyzer
//!
//! 从评论流中提取捐赠金额、校验、按币种汇总并折算为基准币种的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 数据层（Models）
//! - `models/` - 评论、规则集、捐赠、批次结果、汇总结构
//! - `models::loaders` - 从文件加载规则（TOML）和评论（JSONL / JSON / TOML）
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单条评论或单份汇率
//! - `PatternMatcher` - 找出候选金额
//! - `DonationValidator` - 上下限与精度校验
//! - `ExchangeRateClient` - 获取汇率快照
//! - `currency_normalizer` - 折算为基准币种
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一条评论"的完整处理流程
//! - `CommentFlow` - 流程编排（过滤 → 匹配 → 校验）
//! - `run_with_budget` - 单条评论的执行时限
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_processor` - 分批并发调度，批次时限
//! - `orchestrator/aggregator` - 唯一的累计写入点
//! - `orchestrator/analyzer` - 一次分析的完整生命周期
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{ConfigError, NormalizeError, RateFetchError, SourceError};
pub use models::{AnalysisSummary, Comment, Donation, ExchangeRateTable, Outcome, RuleSet};
pub use orchestrator::{Aggregator, App, BatchScheduler, SchedulerSettings};
pub use workflow::{CommentFlow, ItemExtractor};
