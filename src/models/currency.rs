//! 币种规则与匹配规则
//!
//! 规则文件（TOML）先反序列化为 `RulesFile`，再编译为不可变的 `RuleSet`。
//! `RuleSet` 在启动时加载一次，通过 `Arc` 在所有 worker 之间只读共享。

use crate::error::ConfigError;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// 数字字面量：整数或小数，千分位逗号在解析时再校验分组
const NUMBER: &str = r"[0-9]+(?:,[0-9]+)*(?:\.[0-9]+)?";

/// 符号与数字的相对位置
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    /// `$50`
    SymbolBefore,
    /// `50$`
    SymbolAfter,
    #[default]
    Both,
}

impl Orientation {
    fn includes_before(self) -> bool {
        matches!(self, Orientation::SymbolBefore | Orientation::Both)
    }

    fn includes_after(self) -> bool {
        matches!(self, Orientation::SymbolAfter | Orientation::Both)
    }
}

// ========== 规则文件结构 ==========

/// 规则文件
#[derive(Debug, Clone, Deserialize)]
pub struct RulesFile {
    /// 是否忽略 1900-2100 之间的整数金额
    #[serde(default = "default_true")]
    pub ignore_year_like: bool,
    /// 超过此长度（字符数）的评论直接跳过
    #[serde(default = "default_max_comment_length")]
    pub max_comment_length: usize,
    #[serde(default)]
    pub currencies: Vec<CurrencyRuleConfig>,
    #[serde(default)]
    pub patterns: Vec<PatternConfig>,
    /// 备用汇率所针对的基准币种
    #[serde(default = "default_fallback_base")]
    pub fallback_base: String,
    /// 汇率接口不可用时使用的备用汇率（1 单位币种 = x `fallback_base`）
    #[serde(default)]
    pub fallback_rates: BTreeMap<String, Decimal>,
}

/// 单个币种的配置
#[derive(Debug, Clone, Deserialize)]
pub struct CurrencyRuleConfig {
    pub code: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default = "default_min")]
    pub min: Decimal,
    pub max: Decimal,
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,
}

/// 单条匹配规则的配置
#[derive(Debug, Clone, Deserialize)]
pub struct PatternConfig {
    pub name: String,
    pub currency: String,
    /// 货币符号或文字写法，例如 "$"、"Rs."
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(default)]
    pub orientation: Orientation,
    /// 自定义正则，必须包含命名分组 `amount`
    #[serde(default)]
    pub expressions: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// 是否要求同一分句内出现关键词
    #[serde(default)]
    pub require_keyword: bool,
    #[serde(default)]
    pub case_insensitive: bool,
}

fn default_true() -> bool {
    true
}

fn default_max_comment_length() -> usize {
    500
}

fn default_fallback_base() -> String {
    "USD".to_string()
}

fn default_min() -> Decimal {
    Decimal::ONE
}

fn default_decimal_places() -> u32 {
    2
}

// ========== 编译后的规则 ==========

/// 币种规则：上下限与精度
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrencyRule {
    pub code: String,
    pub symbol: String,
    pub min: Decimal,
    pub max: Decimal,
    pub decimal_places: u32,
}

/// 编译后的匹配规则
#[derive(Debug, Clone)]
pub struct CurrencyPattern {
    pub name: String,
    pub currency: String,
    pub expressions: Vec<Regex>,
    pub keywords: Option<Regex>,
    pub require_keyword: bool,
}

/// 不可变的规则集
#[derive(Debug, Clone)]
pub struct RuleSet {
    patterns: Vec<CurrencyPattern>,
    currencies: HashMap<String, CurrencyRule>,
    ignore_year_like: bool,
    max_comment_length: usize,
}

impl RuleSet {
    /// 从规则文件编译规则集
    pub fn compile(file: &RulesFile) -> Result<Self, ConfigError> {
        let mut currencies = HashMap::new();
        for c in &file.currencies {
            let rule = compile_currency(c)?;
            currencies.insert(rule.code.clone(), rule);
        }

        let patterns = file
            .patterns
            .iter()
            .map(compile_pattern)
            .collect::<Result<Vec<_>, _>>()?;

        if file.max_comment_length == 0 {
            return Err(ConfigError::InvalidValue {
                name: "max_comment_length".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }

        Ok(Self {
            patterns,
            currencies,
            ignore_year_like: file.ignore_year_like,
            max_comment_length: file.max_comment_length,
        })
    }

    /// 从 TOML 文本编译规则集
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: RulesFile =
            toml::from_str(content).map_err(|source| ConfigError::RulesParseFailed {
                path: "<inline>".to_string(),
                source,
            })?;
        Self::compile(&file)
    }

    /// 按配置顺序排列的匹配规则
    pub fn patterns(&self) -> &[CurrencyPattern] {
        &self.patterns
    }

    pub fn currency(&self, code: &str) -> Option<&CurrencyRule> {
        self.currencies.get(code)
    }

    pub fn currencies(&self) -> impl Iterator<Item = &CurrencyRule> {
        self.currencies.values()
    }

    pub fn ignore_year_like(&self) -> bool {
        self.ignore_year_like
    }

    pub fn max_comment_length(&self) -> usize {
        self.max_comment_length
    }
}

fn compile_currency(c: &CurrencyRuleConfig) -> Result<CurrencyRule, ConfigError> {
    let code = c.code.trim().to_uppercase();
    if code.is_empty() {
        return Err(ConfigError::InvalidValue {
            name: "currencies.code".to_string(),
            reason: "币种代码不能为空".to_string(),
        });
    }
    if c.min > c.max {
        return Err(ConfigError::InvalidValue {
            name: format!("currencies.{}", code),
            reason: format!("最小值 {} 大于最大值 {}", c.min, c.max),
        });
    }

    Ok(CurrencyRule {
        code,
        symbol: c.symbol.clone(),
        min: c.min,
        max: c.max,
        decimal_places: c.decimal_places,
    })
}

fn compile_pattern(p: &PatternConfig) -> Result<CurrencyPattern, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidPattern {
        pattern: p.name.clone(),
        reason,
    };

    let flags = if p.case_insensitive { "(?i)" } else { "" };
    let mut sources = Vec::new();

    if !p.symbols.is_empty() {
        // 长的写法优先，"US$" 要先于 "$" 尝试
        let mut symbols: Vec<&str> = p.symbols.iter().map(String::as_str).collect();
        symbols.sort_by_key(|s| std::cmp::Reverse(s.len()));
        let alternation = symbols
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");

        if p.orientation.includes_before() {
            sources.push(format!(
                "{}(?:{})[ \\t]?(?P<amount>{})",
                flags, alternation, NUMBER
            ));
        }
        if p.orientation.includes_after() {
            sources.push(format!(
                "{}(?P<amount>{})[ \\t]?(?:{})",
                flags, NUMBER, alternation
            ));
        }
    }
    sources.extend(p.expressions.iter().map(|e| format!("{}{}", flags, e)));

    if sources.is_empty() {
        return Err(invalid("至少需要一个 symbols 或 expressions".to_string()));
    }

    let mut expressions = Vec::with_capacity(sources.len());
    for source in sources {
        let re = Regex::new(&source).map_err(|e| invalid(e.to_string()))?;
        if !re.capture_names().any(|n| n == Some("amount")) {
            return Err(invalid(format!("正则缺少命名分组 amount: {}", source)));
        }
        expressions.push(re);
    }

    let keywords = if p.keywords.is_empty() {
        None
    } else {
        let alternation = p
            .keywords
            .iter()
            .map(|k| regex::escape(k.trim()))
            .collect::<Vec<_>>()
            .join("|");
        Some(Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).map_err(|e| invalid(e.to_string()))?)
    };

    if p.require_keyword && keywords.is_none() {
        return Err(invalid("require_keyword 已开启但没有配置 keywords".to_string()));
    }

    Ok(CurrencyPattern {
        name: p.name.clone(),
        currency: p.currency.trim().to_uppercase(),
        expressions,
        keywords,
        require_keyword: p.require_keyword,
    })
}
