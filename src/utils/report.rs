//! 报告输出
//!
//! 把 `AnalysisSummary` 渲染为可读文本（通过 tracing 输出），或写成 JSON 文件

use std::path::Path;

use anyhow::{Context, Result};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;

use crate::models::currency::RuleSet;
use crate::models::donation::Donation;
use crate::models::summary::{AnalysisSummary, ExchangeRateTable};
use crate::services::currency_normalizer::convert;

/// 带符号的金额，保留两位小数，例如 "₹1000.00"
pub fn format_amount(amount: Decimal, currency: &str, rules: &RuleSet) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    match rules.currency(currency).map(|r| r.symbol.as_str()) {
        Some(symbol) if !symbol.is_empty() => format!("{}{:.2}", symbol, rounded),
        _ => format!("{} {:.2}", currency, rounded),
    }
}

/// 单条捐赠，例如 "$50.00 from alice (original: $50)"
pub fn format_donation(donation: &Donation, rules: &RuleSet) -> String {
    format!(
        "{} from {} (original: {})",
        format_amount(donation.amount, &donation.currency, rules),
        donation.author,
        donation.original
    )
}

/// 可读报告的各行内容
///
/// 先逐条列出提取到的捐赠，再输出各币种合计与汇总
pub fn summary_lines(
    summary: &AnalysisSummary,
    rates: Option<&ExchangeRateTable>,
    rules: &RuleSet,
) -> Vec<String> {
    let rule = "-".repeat(50);
    let mut lines = Vec::new();

    if summary.donations.is_empty() {
        lines.push("\n没有找到有效的捐赠".to_string());
    } else {
        lines.push("\n📋 提取到的捐赠:".to_string());
        lines.push(rule.clone());
        lines.extend(summary.donations.iter().map(|d| format_donation(d, rules)));
    }

    if !summary.per_currency.is_empty() {
        lines.push("\n💰 各币种合计:".to_string());
        lines.push(rule.clone());
        for (currency, total) in &summary.per_currency {
            lines.push(format!(
                "{}: {} ({} 笔)",
                currency,
                format_amount(total.total, currency, rules),
                total.count
            ));
            if let Some(converted) = rates
                .filter(|r| r.base().eq_ignore_ascii_case(&summary.base_currency))
                .and_then(|r| convert(total.total, currency, r))
            {
                lines.push(format!(
                    "  = {}",
                    format_amount(converted, &summary.base_currency, rules)
                ));
            }
        }
    }

    lines.push("\n📊 汇总:".to_string());
    lines.push(rule);
    lines.push(format!("评论总数: {}", summary.comments_seen));
    lines.push(format!("捐赠总数: {}", summary.donation_count()));
    lines.push(match summary.combined_total {
        Some(total) => format!(
            "折合 {} 总额: {}",
            summary.base_currency,
            format_amount(total, &summary.base_currency, rules)
        ),
        None => format!("折合 {} 总额: 不可用", summary.base_currency),
    });
    lines.push(format!("超时: {}  失败: {}", summary.timed_out, summary.errored));
    for (reason, count) in &summary.rejected {
        lines.push(format!("被拒绝 ({}): {}", reason, count));
    }
    lines
}

/// 输出可读报告
pub fn render_summary(
    summary: &AnalysisSummary,
    rates: Option<&ExchangeRateTable>,
    rules: &RuleSet,
) {
    for line in summary_lines(summary, rates, rules) {
        info!("{}", line);
    }
}

/// 写入 JSON 报告
pub async fn write_json_report(path: &Path, summary: &AnalysisSummary) -> Result<()> {
    let content = serde_json::to_string_pretty(summary).context("无法序列化报告")?;
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("无法写入报告文件: {}", path.display()))?;
    Ok(())
}
