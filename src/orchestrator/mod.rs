//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `analyzer` - 分析入口
//! - 管理一次分析的生命周期（加载、处理、汇率、报告）
//! - 消费批次结果并输出进度
//!
//! ### `batch_processor` - 批次调度器
//! - 分批、控制并发数量（Semaphore）
//! - 单条评论限时与批次限时
//! - 按输入顺序逐批产出结果
//!
//! ### `aggregator` - 结果汇总
//! - 唯一修改累计值的地方
//! - 每个批次合并一次
//!
//! ## 层次关系
//!
//! ```text
//! analyzer (处理 Vec<Comment>)
//!     ↓
//! batch_processor (处理一批评论) ──→ aggregator (逐批合并)
//!     ↓
//! workflow::CommentFlow (处理单条评论)
//!     ↓
//! services (能力层：匹配 / 校验 / 汇率 / 换算)
//! ```
//!
//! ## 设计原则
//!
//! 1. **单一职责**：batch_processor 管调度，aggregator 管累计
//! 2. **单一写入点**：worker 只返回结果，累计值只在 aggregator 中修改
//! 3. **向下依赖**：编排层 → workflow → services → models

pub mod aggregator;
pub mod analyzer;
pub mod batch_processor;

// 重新导出主要类型
pub use aggregator::Aggregator;
pub use analyzer::App;
pub use batch_processor::{BatchScheduler, SchedulerSettings};
