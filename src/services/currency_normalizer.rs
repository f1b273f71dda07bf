//! 币种换算
//!
//! 把各币种累计值按汇率折算为基准币种总额

use crate::error::NormalizeError;
use crate::models::summary::{AggregateState, ExchangeRateTable};
use rust_decimal::Decimal;

/// 折算为基准币种总额
///
/// 汇率表必须以 `base_currency` 为基准，否则返回 `BaseMismatch`。
/// 基准币种本身不在汇率表中时按 1 处理；其他币种缺少汇率时返回 `MissingRate`，
/// 不会当作 0 处理
pub fn normalize(
    state: &AggregateState,
    rates: &ExchangeRateTable,
    base_currency: &str,
) -> Result<Decimal, NormalizeError> {
    let base = base_currency.to_uppercase();
    if rates.base() != base {
        return Err(NormalizeError::BaseMismatch {
            expected: base,
            actual: rates.base().to_string(),
        });
    }

    let mut combined = Decimal::ZERO;

    for (currency, total) in state {
        let rate = match rates.rate_to_base(currency) {
            Some(rate) => rate,
            None if *currency == base => Decimal::ONE,
            None => {
                return Err(NormalizeError::MissingRate {
                    currency: currency.clone(),
                    base: base.clone(),
                })
            }
        };

        let converted = total
            .total
            .checked_mul(rate)
            .ok_or_else(|| NormalizeError::Overflow {
                currency: currency.clone(),
            })?;
        combined = combined
            .checked_add(converted)
            .ok_or_else(|| NormalizeError::Overflow {
                currency: currency.clone(),
            })?;
    }

    Ok(combined)
}

/// 单个币种折算后的金额，用于报告
pub fn convert(amount: Decimal, currency: &str, rates: &ExchangeRateTable) -> Option<Decimal> {
    if currency == rates.base() {
        return Some(amount);
    }
    rates.rate_to_base(currency).and_then(|r| amount.checked_mul(r))
}
