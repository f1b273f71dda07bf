use crate::models::donation::{Donation, RejectionReason};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 单个币种的累计值
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyTotal {
    pub total: Decimal,
    pub count: usize,
}

/// 币种代码 → 累计值
pub type AggregateState = BTreeMap<String, CurrencyTotal>;

/// 汇率快照：1 单位币种 = rate 单位基准币种
///
/// 一次运行内只读，不会中途刷新
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExchangeRateTable {
    base: String,
    rates: HashMap<String, Decimal>,
}

impl ExchangeRateTable {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().to_uppercase(),
            rates: HashMap::new(),
        }
    }

    pub fn with_rate(mut self, currency: impl Into<String>, rate_to_base: Decimal) -> Self {
        self.insert(currency, rate_to_base);
        self
    }

    pub fn insert(&mut self, currency: impl Into<String>, rate_to_base: Decimal) {
        self.rates.insert(currency.into().to_uppercase(), rate_to_base);
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn rate_to_base(&self, currency: &str) -> Option<Decimal> {
        self.rates.get(currency).copied()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// 一次分析的结构化结果，交给调用方渲染
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisSummary {
    pub generated_at: String,
    pub comments_seen: usize,
    pub per_currency: AggregateState,
    pub base_currency: String,
    /// 汇率不可用或缺失时为空
    pub combined_total: Option<Decimal>,
    pub timed_out: usize,
    pub errored: usize,
    pub rejected: BTreeMap<RejectionReason, usize>,
    pub donations: Vec<Donation>,
}

impl AnalysisSummary {
    pub fn donation_count(&self) -> usize {
        self.per_currency.values().map(|t| t.count).sum()
    }
}
