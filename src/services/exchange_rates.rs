//! 汇率服务 - 业务能力层
//!
//! 只负责"拿到一份汇率快照"，不参与统计。
//! 接口返回的是"1 基准币种 = x 目标币种"，这里统一转换为"1 目标币种 = y 基准币种"。

use crate::config::Config;
use crate::error::RateFetchError;
use crate::models::summary::ExchangeRateTable;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// 汇率接口响应
#[derive(Debug, Deserialize)]
struct RatesResponse {
    #[serde(default)]
    result: Option<String>,
    #[serde(default, rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    rates: HashMap<String, Decimal>,
}

/// 汇率客户端
pub struct ExchangeRateClient {
    client: reqwest::Client,
    api_base_url: String,
}

impl ExchangeRateClient {
    /// 创建新的汇率客户端
    pub fn new(config: &Config) -> Result<Self, RateFetchError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.rates_timeout_secs))
            .build()
            .map_err(|source| RateFetchError::RequestFailed {
                endpoint: config.rates_api_base_url.clone(),
                source,
            })?;

        Ok(Self {
            client,
            api_base_url: config.rates_api_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 获取以 `base_currency` 为基准的汇率快照
    pub async fn fetch(&self, base_currency: &str) -> Result<ExchangeRateTable, RateFetchError> {
        let base = base_currency.to_uppercase();
        let endpoint = format!("{}/{}", self.api_base_url, base);
        info!("💱 正在获取汇率: {}", endpoint);

        let request_failed = |source: reqwest::Error| RateFetchError::RequestFailed {
            endpoint: endpoint.clone(),
            source,
        };

        let response = self
            .client
            .get(&endpoint)
            .send()
            .await
            .map_err(request_failed)?
            .error_for_status()
            .map_err(request_failed)?;

        let body: RatesResponse = response.json().await.map_err(request_failed)?;
        let table = parse_rates(&base, &endpoint, body)?;

        debug!("获取到 {} 个币种的汇率", table.len());
        Ok(table)
    }
}

fn parse_rates(
    base: &str,
    endpoint: &str,
    body: RatesResponse,
) -> Result<ExchangeRateTable, RateFetchError> {
    if let Some(result) = body.result.as_deref() {
        if result != "success" {
            return Err(RateFetchError::BadResponse {
                endpoint: endpoint.to_string(),
                message: body.error_type.unwrap_or_else(|| result.to_string()),
            });
        }
    }
    if body.rates.is_empty() {
        return Err(RateFetchError::BadResponse {
            endpoint: endpoint.to_string(),
            message: "响应中没有 rates".to_string(),
        });
    }

    let mut table = ExchangeRateTable::new(base).with_rate(base, Decimal::ONE);
    for (currency, units_per_base) in body.rates {
        if units_per_base <= Decimal::ZERO {
            return Err(RateFetchError::InvalidRate {
                currency,
                value: units_per_base.to_string(),
            });
        }
        let Some(rate_to_base) = Decimal::ONE.checked_div(units_per_base) else {
            return Err(RateFetchError::InvalidRate {
                currency,
                value: units_per_base.to_string(),
            });
        };
        table.insert(currency, rate_to_base);
    }

    Ok(table)
}
