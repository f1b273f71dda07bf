use crate::error::ConfigError;
use std::str::FromStr;
use std::time::Duration;

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 每批内同时处理的评论数量
    pub max_workers: usize,
    /// 每批评论数量
    pub batch_size: usize,
    /// 单批次超时（毫秒）
    pub batch_timeout_ms: u64,
    /// 单条评论超时（毫秒）
    pub item_timeout_ms: u64,
    /// 折算用的基准币种
    pub base_currency: String,
    /// 匹配规则文件
    pub rules_file: String,
    /// 评论导出文件
    pub comments_file: String,
    // --- 汇率 API 配置 ---
    pub rates_api_base_url: String,
    pub rates_timeout_secs: u64,
    /// JSON 报告输出文件，为空时不输出
    pub output_report_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: 4,
            batch_size: 1000,
            batch_timeout_ms: 10_000,
            item_timeout_ms: 500,
            base_currency: "USD".to_string(),
            rules_file: "donation_rules.toml".to_string(),
            comments_file: "comments.jsonl".to_string(),
            rates_api_base_url: "https://open.er-api.com/v6/latest".to_string(),
            rates_timeout_secs: 10,
            output_report_file: "donation_report.json".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    /// 默认值 + 环境变量覆盖
    pub fn from_env() -> Result<Self, ConfigError> {
        let default = Self::default();
        let config = Self {
            max_workers: env_parse("MAX_WORKERS", default.max_workers)?,
            batch_size: env_parse("BATCH_SIZE", default.batch_size)?,
            batch_timeout_ms: env_parse("BATCH_TIMEOUT_MS", default.batch_timeout_ms)?,
            item_timeout_ms: env_parse("ITEM_TIMEOUT_MS", default.item_timeout_ms)?,
            base_currency: std::env::var("BASE_CURRENCY")
                .unwrap_or(default.base_currency)
                .to_uppercase(),
            rules_file: std::env::var("RULES_FILE").unwrap_or(default.rules_file),
            comments_file: std::env::var("COMMENTS_FILE").unwrap_or(default.comments_file),
            rates_api_base_url: std::env::var("RATES_API_BASE_URL")
                .unwrap_or(default.rates_api_base_url),
            rates_timeout_secs: env_parse("RATES_TIMEOUT_SECS", default.rates_timeout_secs)?,
            output_report_file: std::env::var("OUTPUT_REPORT_FILE")
                .unwrap_or(default.output_report_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", default.verbose_logging)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// 检查取值范围
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("MAX_WORKERS", self.max_workers as u64),
            ("BATCH_SIZE", self.batch_size as u64),
            ("BATCH_TIMEOUT_MS", self.batch_timeout_ms),
            ("ITEM_TIMEOUT_MS", self.item_timeout_ms),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(ConfigError::InvalidValue {
                    name: name.to_string(),
                    reason: "必须大于 0".to_string(),
                });
            }
        }
        if self.base_currency.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "BASE_CURRENCY".to_string(),
                reason: "不能为空".to_string(),
            });
        }
        Ok(())
    }

    pub fn batch_timeout(&self) -> Duration {
        Duration::from_millis(self.batch_timeout_ms)
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_millis(self.item_timeout_ms)
    }
}

fn env_parse<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: std::any::type_name::<T>().to_string(),
            }),
        Err(_) => Ok(default),
    }
}
