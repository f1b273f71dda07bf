pub mod currency_normalizer;
pub mod donation_validator;
pub mod exchange_rates;
pub mod pattern_matcher;

pub use currency_normalizer::normalize;
pub use donation_validator::DonationValidator;
pub use exchange_rates::ExchangeRateClient;
pub use pattern_matcher::PatternMatcher;
