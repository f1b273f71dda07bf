pub mod comment;
pub mod currency;
pub mod donation;
pub mod loaders;
pub mod summary;

pub use comment::Comment;
pub use currency::{CurrencyPattern, CurrencyRule, Orientation, RuleSet, RulesFile};
pub use donation::{
    BatchResult, Donation, ItemOutcome, Outcome, RawCandidate, Rejection, RejectionReason,
};
pub use loaders::{load_comments, load_rule_set};
pub use summary::{AggregateState, AnalysisSummary, CurrencyTotal, ExchangeRateTable};
