//! 捐赠校验服务 - 业务能力层
//!
//! 只负责"这个候选金额能不能算作捐赠"，每个输入都有确定的结果

use crate::models::currency::RuleSet;
use crate::models::donation::{Donation, RawCandidate, Rejection, RejectionReason};
use rust_decimal::Decimal;
use std::sync::Arc;

/// 捐赠校验器
#[derive(Debug, Clone)]
pub struct DonationValidator {
    rules: Arc<RuleSet>,
}

impl DonationValidator {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// 校验候选金额
    ///
    /// 检查顺序：币种 → 精度 → 下限 → 上限 → 年份
    pub fn validate(&self, candidate: &RawCandidate) -> Result<Donation, Rejection> {
        match self.check(candidate) {
            None => Ok(Donation {
                currency: candidate.currency.clone(),
                amount: candidate.amount,
                author: candidate.author.clone(),
                original: candidate.matched_text.clone(),
                comment_id: candidate.comment_id.clone(),
            }),
            Some(reason) => Err(Rejection {
                candidate: candidate.clone(),
                reason,
            }),
        }
    }

    fn check(&self, candidate: &RawCandidate) -> Option<RejectionReason> {
        let Some(rule) = self.rules.currency(&candidate.currency) else {
            return Some(RejectionReason::UnsupportedCurrency);
        };

        let amount = candidate.amount.normalize();
        if amount.scale() > rule.decimal_places {
            return Some(RejectionReason::UnparseableAmount);
        }
        if amount <= Decimal::ZERO || amount < rule.min {
            return Some(RejectionReason::BelowMinimum);
        }
        if amount > rule.max {
            return Some(RejectionReason::AboveMaximum);
        }
        if self.rules.ignore_year_like() && is_year_like(amount) {
            return Some(RejectionReason::LikelyYear);
        }

        None
    }
}

fn is_year_like(amount: Decimal) -> bool {
    amount.fract().is_zero() && amount >= Decimal::from(1900) && amount <= Decimal::from(2100)
}
