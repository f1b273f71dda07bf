//! 结果汇总
//!
//! 唯一的写入点：只有 `merge` 会修改累计值，且必须由同一个控制流逐批调用。
//! 同一个 `BatchResult` 只能合并一次，这由调用方保证，这里不做去重。

use std::collections::BTreeMap;

use tracing::warn;

use crate::models::donation::{BatchResult, Donation, Outcome, RejectionReason};
use crate::models::summary::{AggregateState, CurrencyTotal};

#[derive(Debug, Default)]
pub struct Aggregator {
    state: AggregateState,
    donations: Vec<Donation>,
    rejected: BTreeMap<RejectionReason, usize>,
    comments_seen: usize,
    timed_out: usize,
    errored: usize,
    batches_merged: usize,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 合并一个批次的结果
    pub fn merge(&mut self, batch: &BatchResult) -> &AggregateState {
        for item in &batch.items {
            self.comments_seen += 1;
            match &item.outcome {
                Outcome::Success { donations, rejected } => match self.stage(donations) {
                    Ok(staged) => {
                        self.state.extend(staged);
                        self.donations.extend(donations.iter().cloned());
                        for rejection in rejected {
                            *self.rejected.entry(rejection.reason).or_insert(0) += 1;
                        }
                    }
                    Err(currency) => {
                        // 整条评论都不计入，避免只合并一部分
                        warn!(
                            "[评论 {}] ❌ 币种 {} 累计值溢出，该评论记为失败",
                            item.comment_id, currency
                        );
                        self.errored += 1;
                    }
                },
                Outcome::Timeout => self.timed_out += 1,
                Outcome::Error(_) => self.errored += 1,
            }
        }
        self.batches_merged += 1;
        &self.state
    }

    /// 计算一条评论合并后的新累计值，溢出时返回对应币种
    fn stage(&self, donations: &[Donation]) -> Result<AggregateState, String> {
        let mut staged = AggregateState::new();
        for donation in donations {
            let current = staged
                .get(&donation.currency)
                .or_else(|| self.state.get(&donation.currency))
                .copied()
                .unwrap_or_default();
            let total = current
                .total
                .checked_add(donation.amount)
                .ok_or_else(|| donation.currency.clone())?;
            staged.insert(
                donation.currency.clone(),
                CurrencyTotal {
                    total,
                    count: current.count + 1,
                },
            );
        }
        Ok(staged)
    }

    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    pub fn donations(&self) -> &[Donation] {
        &self.donations
    }

    pub fn rejected(&self) -> &BTreeMap<RejectionReason, usize> {
        &self.rejected
    }

    pub fn comments_seen(&self) -> usize {
        self.comments_seen
    }

    pub fn timed_out(&self) -> usize {
        self.timed_out
    }

    pub fn errored(&self) -> usize {
        self.errored
    }

    pub fn batches_merged(&self) -> usize {
        self.batches_merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::donation::{ItemOutcome, RawCandidate, Rejection};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::time::Duration;

    fn donation(currency: &str, amount: Decimal, id: &str) -> Donation {
        Donation {
            currency: currency.to_string(),
            amount,
            author: "a".to_string(),
            original: amount.to_string(),
            comment_id: id.to_string(),
        }
    }

    fn success(donations: Vec<Donation>) -> Outcome {
        Outcome::Success {
            donations,
            rejected: Vec::new(),
        }
    }

    fn batch(index: usize, outcomes: Vec<Outcome>) -> BatchResult {
        BatchResult {
            batch_index: index,
            items: outcomes
                .into_iter()
                .enumerate()
                .map(|(i, outcome)| ItemOutcome {
                    position: index * 100 + i,
                    comment_id: format!("c{}", i),
                    outcome,
                })
                .collect(),
            elapsed: Duration::from_millis(1),
            deadline_exceeded: false,
        }
    }

    #[test]
    fn test_merge_counts_and_totals() {
        let mut agg = Aggregator::new();
        agg.merge(&batch(
            0,
            vec![
                success(vec![donation("USD", dec!(50), "c0"), donation("INR", dec!(1000), "c0")]),
                success(vec![donation("USD", dec!(0.10), "c1")]),
                Outcome::Timeout,
                Outcome::Error("boom".to_string()),
                Outcome::empty(),
            ],
        ));

        let usd = agg.state()["USD"];
        assert_eq!(usd.total, dec!(50.10));
        assert_eq!(usd.count, 2);
        assert_eq!(agg.state()["INR"].count, 1);
        assert_eq!(agg.comments_seen(), 5);
        assert_eq!(agg.timed_out(), 1);
        assert_eq!(agg.errored(), 1);
        assert_eq!(agg.donations().len(), 3);
    }

    #[test]
    fn test_decimal_sum_has_no_drift() {
        let mut agg = Aggregator::new();
        let outcomes = (0..10).map(|_| success(vec![donation("USD", dec!(0.1), "c")])).collect();
        agg.merge(&batch(0, outcomes));
        assert_eq!(agg.state()["USD"].total, dec!(1.0));
    }

    #[test]
    fn test_disjoint_merges_are_additive() {
        let first = batch(0, vec![success(vec![donation("USD", dec!(5), "c0")])]);
        let second = batch(
            1,
            vec![success(vec![donation("USD", dec!(7), "c1"), donation("EUR", dec!(3), "c1")])],
        );

        let mut combined = Aggregator::new();
        combined.merge(&first);
        combined.merge(&second);

        let mut a = Aggregator::new();
        a.merge(&first);
        let mut b = Aggregator::new();
        b.merge(&second);

        for (currency, total) in combined.state() {
            let expected_total = a.state().get(currency).map_or(Decimal::ZERO, |t| t.total)
                + b.state().get(currency).map_or(Decimal::ZERO, |t| t.total);
            let expected_count = a.state().get(currency).map_or(0, |t| t.count)
                + b.state().get(currency).map_or(0, |t| t.count);
            assert_eq!(total.total, expected_total);
            assert_eq!(total.count, expected_count);
        }
        assert_eq!(combined.batches_merged(), 2);
    }

    #[test]
    fn test_rejections_counted_not_totalled() {
        let candidate = RawCandidate {
            currency: "USD".to_string(),
            amount: dec!(99999),
            comment_id: "c0".to_string(),
            matched_text: "$99999".to_string(),
            span: 0..6,
            author: "a".to_string(),
        };
        let outcome = Outcome::Success {
            donations: Vec::new(),
            rejected: vec![Rejection {
                candidate,
                reason: RejectionReason::AboveMaximum,
            }],
        };

        let mut agg = Aggregator::new();
        agg.merge(&batch(0, vec![outcome]));
        assert!(agg.state().is_empty());
        assert_eq!(agg.rejected()[&RejectionReason::AboveMaximum], 1);
    }

    #[test]
    fn test_overflowing_comment_is_recorded_as_error() {
        let mut aggregator = Aggregator::new();
        aggregator.merge(&batch(0, vec![success(vec![donation("USD", Decimal::MAX, "c0")])]));
        aggregator.merge(&batch(
            1,
            vec![success(vec![
                donation("INR", dec!(5), "c1"),
                donation("USD", dec!(1), "c1"),
            ])],
        ));

        assert_eq!(aggregator.errored(), 1);
        assert_eq!(aggregator.comments_seen(), 2);
        assert_eq!(aggregator.state()["USD"].total, Decimal::MAX);
        assert_eq!(aggregator.state()["USD"].count, 1);
        assert!(!aggregator.state().contains_key("INR"));
        assert_eq!(aggregator.donations().len(), 1);
    }
}
