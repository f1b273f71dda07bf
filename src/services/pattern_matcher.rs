//! 金额匹配服务 - 业务能力层
//!
//! 只负责"从一条评论里找出候选金额"，不做上下限校验

use crate::error::ExtractError;
use crate::models::comment::Comment;
use crate::models::currency::{CurrencyPattern, RuleSet};
use crate::models::donation::RawCandidate;
use regex::Match;
use rust_decimal::Decimal;
use std::ops::Range;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;
use tracing::trace;

/// 金额匹配器
///
/// 纯函数：结果只取决于评论文本和规则集
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    rules: Arc<RuleSet>,
}

impl PatternMatcher {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self { rules }
    }

    /// 找出评论中的所有候选金额
    pub fn match_text(&self, comment: &Comment) -> Vec<RawCandidate> {
        // 没有截止时间时不会返回 DeadlineExceeded
        self.match_until(comment, None).unwrap_or_default()
    }

    /// 带截止时间的匹配，每处理一个匹配位置检查一次
    pub fn match_until(
        &self,
        comment: &Comment,
        deadline: Option<Instant>,
    ) -> Result<Vec<RawCandidate>, ExtractError> {
        let text = comment.text.as_str();
        let mut candidates: Vec<RawCandidate> = Vec::new();

        for pattern in self.rules.patterns() {
            for re in &pattern.expressions {
                for caps in re.captures_iter(text) {
                    check_deadline(deadline)?;

                    let (Some(whole), Some(amount)) = (caps.get(0), caps.name("amount")) else {
                        continue;
                    };

                    if is_glued(text, &whole) {
                        trace!("跳过粘连的匹配: {}", whole.as_str());
                        continue;
                    }

                    let Some(value) = parse_amount(amount.as_str()) else {
                        trace!("跳过格式错误的金额: {}", amount.as_str());
                        continue;
                    };

                    if !keyword_satisfied(pattern, text, whole.range()) {
                        trace!("[{}] 分句内没有关键词: {}", pattern.name, whole.as_str());
                        continue;
                    }

                    // 同一位置只保留先配置的规则
                    if candidates.iter().any(|c| overlaps(&c.span, &whole.range())) {
                        continue;
                    }

                    candidates.push(RawCandidate {
                        currency: pattern.currency.clone(),
                        amount: value,
                        comment_id: comment.id.clone(),
                        matched_text: whole.as_str().trim().to_string(),
                        span: whole.range(),
                        author: comment.author.clone(),
                    });
                }
            }
        }

        Ok(candidates)
    }
}

fn check_deadline(deadline: Option<Instant>) -> Result<(), ExtractError> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(ExtractError::DeadlineExceeded),
        _ => Ok(()),
    }
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

/// 解析数字字面量
///
/// 千分位逗号必须是"1-3 位 + 若干个 3 位"的分组，否则视为格式错误
pub fn parse_amount(literal: &str) -> Option<Decimal> {
    let (integer, fraction) = match literal.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (literal, None),
    };

    let mut groups = integer.split(',');
    let first = groups.next()?;
    let grouped = integer.contains(',');
    if first.is_empty() || (grouped && first.len() > 3) {
        return None;
    }
    if !first.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    for group in groups {
        if group.len() != 3 || !group.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }
    if let Some(f) = fraction {
        if f.is_empty() || !f.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
    }

    let normalized: String = literal.chars().filter(|c| *c != ',').collect();
    Decimal::from_str(&normalized).ok()
}

/// 匹配是否和前后的文字粘在一起，例如 "$50k"、"x50$"、"$1.5.0"
fn is_glued(text: &str, m: &Match<'_>) -> bool {
    let matched = m.as_str();
    let before = text[..m.start()].chars().next_back();
    let mut after = text[m.end()..].chars();
    let next = after.next();
    let next_next = after.next();

    let starts_alnum = matched.chars().next().is_some_and(char::is_alphanumeric);
    if starts_alnum && before.is_some_and(|c| c.is_alphanumeric() || c == '.' || c == ',') {
        return true;
    }

    let last = matched.chars().next_back();
    if last.is_some_and(char::is_alphanumeric) && next.is_some_and(char::is_alphanumeric) {
        return true;
    }
    if last.is_some_and(|c| c.is_ascii_digit())
        && matches!(next, Some('.') | Some(','))
        && next_next.is_some_and(|c| c.is_ascii_digit())
    {
        return true;
    }

    false
}

fn keyword_satisfied(pattern: &CurrencyPattern, text: &str, span: Range<usize>) -> bool {
    if !pattern.require_keyword {
        return true;
    }
    let Some(keywords) = &pattern.keywords else {
        return false;
    };
    let clause = clause_around(text, span);
    keywords.is_match(&text[clause])
}

/// 匹配位置所在的分句
///
/// 分句以 `.`、`!`、`?`、`;` 或换行结束，且标点后必须是空白或文本结尾，
/// 所以小数点不会切断分句
pub fn clause_around(text: &str, span: Range<usize>) -> Range<usize> {
    let is_break = |idx: usize, c: char| -> bool {
        if c == '\n' {
            return true;
        }
        if !matches!(c, '.' | '!' | '?' | ';') {
            return false;
        }
        text[idx + c.len_utf8()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace)
    };

    let start = text[..span.start]
        .char_indices()
        .rev()
        .find(|&(idx, c)| is_break(idx, c))
        .map_or(0, |(idx, c)| idx + c.len_utf8());

    let end = text[span.end..]
        .char_indices()
        .find(|&(idx, c)| is_break(span.end + idx, c))
        .map_or(text.len(), |(idx, _)| span.end + idx);

    start..end
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const RULES: &str = r#"
        [[currencies]]
        code = "USD"
        max = 10000

        [[currencies]]
        code = "INR"
        max = 100000

        [[patterns]]
        name = "usd"
        currency = "USD"
        symbols = ["$"]
        keywords = ["donated", "sent"]
        require_keyword = true

        [[patterns]]
        name = "inr"
        currency = "INR"
        symbols = ["₹", "Rs."]
        orientation = "symbol_before"
        case_insensitive = true

        [[patterns]]
        name = "eur"
        currency = "EUR"
        symbols = ["€"]
    "#;

    fn matcher() -> PatternMatcher {
        PatternMatcher::new(Arc::new(RuleSet::from_toml_str(RULES).unwrap()))
    }

    fn amounts(text: &str) -> Vec<(String, Decimal)> {
        matcher()
            .match_text(&Comment::new("c", "a", text))
            .into_iter()
            .map(|c| (c.currency, c.amount))
            .collect()
    }

    #[test]
    fn test_both_orientations_yield_same_amount() {
        assert_eq!(amounts("I donated $50"), vec![("USD".to_string(), dec!(50))]);
        assert_eq!(amounts("I donated 50$"), vec![("USD".to_string(), dec!(50))]);
        assert_eq!(amounts("donated $ 50 today"), amounts("donated 50 $ today"));
    }

    #[test]
    fn test_keyword_required_in_same_clause() {
        assert!(amounts("this phone costs $500").is_empty());
        assert!(amounts("I donated yesterday. The phone costs $500").is_empty());
        assert_eq!(amounts("The phone costs $500; I donated $5"), vec![("USD".to_string(), dec!(5))]);
    }

    #[test]
    fn test_keyword_is_whole_word() {
        assert!(amounts("present $5").is_empty());
        assert_eq!(amounts("SENT $5!").len(), 1);
    }

    #[test]
    fn test_decimal_point_does_not_end_clause() {
        assert_eq!(
            amounts("donated $5.50 and more"),
            vec![("USD".to_string(), dec!(5.50))]
        );
    }

    #[test]
    fn test_thousands_separators() {
        assert_eq!(amounts("sent ₹1,000 thanks"), vec![("INR".to_string(), dec!(1000))]);
        assert_eq!(amounts("₹12,345.50"), vec![("INR".to_string(), dec!(12345.50))]);
        assert_eq!(amounts("donated $1,000, keep going"), vec![("USD".to_string(), dec!(1000))]);
    }

    #[test]
    fn test_malformed_literals_are_not_emitted() {
        assert!(amounts("donated $1,00").is_empty());
        assert!(amounts("donated $12,3456").is_empty());
        assert!(amounts("donated $1.5.0").is_empty());
        assert!(amounts("donated $50k").is_empty());
    }

    #[test]
    fn test_textual_notation_case_insensitive() {
        assert_eq!(amounts("rs. 200 sent"), vec![("INR".to_string(), dec!(200))]);
        assert_eq!(amounts("Rs.200"), vec![("INR".to_string(), dec!(200))]);
        // symbol_before 规则不匹配后置写法
        assert!(amounts("200 Rs.").is_empty());
    }

    #[test]
    fn test_multiple_patterns_in_one_comment() {
        let found = amounts("donated $20 and €15, also ₹100");
        assert_eq!(
            found,
            vec![
                ("USD".to_string(), dec!(20)),
                ("INR".to_string(), dec!(100)),
                ("EUR".to_string(), dec!(15)),
            ]
        );
    }

    #[test]
    fn test_overlapping_matches_keep_first_pattern() {
        let m = matcher();
        // 前置写法先于后置写法尝试，"10€" 与 "€20" 共用同一个符号
        let found = m.match_text(&Comment::new("c", "a", "10€20"));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].matched_text, "€20");
        assert_eq!(found[0].span, "10".len().."10€20".len());
    }

    #[test]
    fn test_candidate_carries_source() {
        let m = matcher();
        let found = m.match_text(&Comment::new("c42", "alice", "I donated $50"));
        assert_eq!(found[0].comment_id, "c42");
        assert_eq!(found[0].author, "alice");
        assert_eq!(found[0].matched_text, "$50");
    }

    #[test]
    fn test_expired_deadline() {
        let m = matcher();
        let result = m.match_until(&Comment::new("c", "a", "€20"), Some(Instant::now()));
        assert_eq!(result, Err(ExtractError::DeadlineExceeded));
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("50"), Some(dec!(50)));
        assert_eq!(parse_amount("1,234,567.89"), Some(dec!(1234567.89)));
        assert_eq!(parse_amount("1234,567"), None);
        assert_eq!(parse_amount(",123"), None);
        assert_eq!(parse_amount("5."), None);
    }

    #[test]
    fn test_clause_around() {
        let text = "Hello there. I donated $5.50 today! Bye";
        let start = text.find('$').unwrap();
        let clause = clause_around(text, start..start + 5);
        assert_eq!(&text[clause], " I donated $5.50 today");
    }
}
