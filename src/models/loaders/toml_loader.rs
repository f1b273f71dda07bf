use crate::error::ConfigError;
use crate::models::currency::{RuleSet, RulesFile};
use crate::models::summary::ExchangeRateTable;
use std::path::Path;
use tokio::fs;

/// 从 TOML 文件加载规则文件
pub async fn load_rules_file(rules_path: &Path) -> Result<RulesFile, ConfigError> {
    let path = rules_path.display().to_string();

    let content = fs::read_to_string(rules_path)
        .await
        .map_err(|source| ConfigError::RulesReadFailed {
            path: path.clone(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| ConfigError::RulesParseFailed { path, source })
}

/// 加载并编译规则集，同时返回规则文件中的备用汇率（如有）
///
/// 备用汇率表的基准币种来自规则文件的 `fallback_base`，与运行时配置的基准币种无关
pub async fn load_rule_set(
    rules_path: &Path,
) -> Result<(RuleSet, Option<ExchangeRateTable>), ConfigError> {
    let file = load_rules_file(rules_path).await?;
    let rules = RuleSet::compile(&file)?;

    tracing::info!(
        "成功加载 {} 条匹配规则，{} 个币种",
        rules.patterns().len(),
        rules.currencies().count()
    );

    let fallback = if file.fallback_rates.is_empty() {
        None
    } else {
        let mut table = ExchangeRateTable::new(file.fallback_base.as_str());
        for (code, rate) in &file.fallback_rates {
            table.insert(code.as_str(), *rate);
        }
        Some(table)
    };

    Ok((rules, fallback))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[tokio::test]
    async fn test_load_rule_set_with_fallback_rates() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            [[currencies]]
            code = "INR"
            max = 100000

            [[patterns]]
            name = "inr"
            currency = "INR"
            symbols = ["₹"]

            [fallback_rates]
            inr = "0.01205"
            "#
        )
        .unwrap();

        let (rules, fallback) = load_rule_set(file.path()).await.unwrap();
        assert_eq!(rules.patterns().len(), 1);

        let fallback = fallback.unwrap();
        assert_eq!(fallback.base(), "USD");
        assert_eq!(fallback.rate_to_base("INR"), Some(dec!(0.01205)));
    }

    #[tokio::test]
    async fn test_fallback_rates_keep_their_own_base() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            fallback_base = "eur"

            [[currencies]]
            code = "USD"
            max = 1000

            [fallback_rates]
            USD = "0.92"
            "#
        )
        .unwrap();

        let (_, fallback) = load_rule_set(file.path()).await.unwrap();
        let fallback = fallback.unwrap();
        assert_eq!(fallback.base(), "EUR");
        assert_eq!(fallback.rate_to_base("USD"), Some(dec!(0.92)));
    }

    #[test]
    fn test_missing_rules_file() {
        let result =
            tokio_test::block_on(load_rule_set(Path::new("/nonexistent/rules.toml")));
        assert!(matches!(result, Err(ConfigError::RulesReadFailed { .. })));
    }
}
