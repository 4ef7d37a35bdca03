//! Lexical alert detection over vision-model answers.
//!
//! Nothing here looks at images. The classifier and extractor read the text a
//! vision model produced and are pure functions of that text and the tables
//! built at startup.

pub mod classifier;
pub mod objects;
pub mod rules;

pub use classifier::{classify, keyword_confidence, Classification};
pub use objects::{ObjectExtractor, DEFAULT_DISTANCE_WINDOW};
pub use rules::{default_rules, AlertRule, RuleTable};
