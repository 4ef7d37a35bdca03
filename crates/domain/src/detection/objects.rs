//! Object extractor.
//!
//! Looks for known object categories in a model answer and, for each hit, tries
//! to read a distance such as "5 meters" that follows the matched phrase.
//!
//! The distance search is bounded: at most `distance_window` characters (no
//! newlines) may separate the phrase from the number. The unbounded form of
//! this search can scan the whole text for every pattern; the window keeps the
//! work linear in the text length.

use regex::Regex;

use crate::error::ConfigurationError;
use crate::models::{DetectedObject, ObjectCategory, UNKNOWN_DISTANCE};

/// Default number of characters allowed between a phrase and its distance.
pub const DEFAULT_DISTANCE_WINDOW: usize = 200;

/// Units recognised after a number, longest spelling first so "meters" is
/// reported in full rather than as "meter".
const DISTANCE_UNITS: &str = "meters|meter|feet|foot|ft|m";

/// Surface phrases per category, in declaration order.
const CATEGORY_PATTERNS: &[(ObjectCategory, &[&str])] = &[
    (
        ObjectCategory::Person,
        &["person", "people", "human", "pedestrian"],
    ),
    (
        ObjectCategory::Vehicle,
        &["car", "vehicle", "bicycle", "motorcycle", "truck", "bus"],
    ),
    (
        ObjectCategory::Obstacle,
        &["obstacle", "barrier", "pole", "post", "sign"],
    ),
    (
        ObjectCategory::Furniture,
        &["chair", "table", "desk", "shelf", "cabinet"],
    ),
    (
        ObjectCategory::Door,
        &["door", "doorway", "entrance", "exit"],
    ),
    (ObjectCategory::Stairs, &["stairs", "staircase", "steps"]),
    (ObjectCategory::Wall, &["wall"]),
    (
        ObjectCategory::FloorHazard,
        &["wet floor", "uneven", "curb", "pothole"],
    ),
];

#[derive(Debug, Clone)]
struct PhrasePattern {
    phrase: String,
    distance: Regex,
}

#[derive(Debug, Clone)]
struct CategoryPatterns {
    category: ObjectCategory,
    phrases: Vec<PhrasePattern>,
}

/// Compiled category table. Built once at startup and shared read-only.
#[derive(Debug, Clone)]
pub struct ObjectExtractor {
    categories: Vec<CategoryPatterns>,
    distance_window: usize,
}

impl ObjectExtractor {
    /// Compiles the default category table with the given distance window.
    pub fn new(distance_window: usize) -> Result<Self, ConfigurationError> {
        if distance_window == 0 {
            return Err(ConfigurationError::ZeroDistanceWindow);
        }

        let categories = CATEGORY_PATTERNS
            .iter()
            .map(|(category, phrases)| {
                let phrases = phrases
                    .iter()
                    .map(|phrase| {
                        Ok(PhrasePattern {
                            phrase: phrase.to_string(),
                            distance: distance_regex(phrase, distance_window)?,
                        })
                    })
                    .collect::<Result<Vec<_>, ConfigurationError>>()?;
                Ok(CategoryPatterns {
                    category: *category,
                    phrases,
                })
            })
            .collect::<Result<Vec<_>, ConfigurationError>>()?;

        Ok(Self {
            categories,
            distance_window,
        })
    }

    /// Extractor with [`DEFAULT_DISTANCE_WINDOW`].
    pub fn standard() -> Result<Self, ConfigurationError> {
        Self::new(DEFAULT_DISTANCE_WINDOW)
    }

    pub fn distance_window(&self) -> usize {
        self.distance_window
    }

    /// Returns at most one object per category, in category order.
    pub fn extract(&self, text: &str) -> Vec<DetectedObject> {
        let haystack = text.to_lowercase();

        self.categories
            .iter()
            .filter_map(|category| {
                let hit = category
                    .phrases
                    .iter()
                    .find(|p| haystack.contains(p.phrase.as_str()))?;
                Some(DetectedObject::new(
                    category.category,
                    find_distance(&hit.distance, &haystack),
                ))
            })
            .collect()
    }
}

fn distance_regex(phrase: &str, window: usize) -> Result<Regex, ConfigurationError> {
    let pattern = format!(
        r"(?i){}.{{0,{}}}?(\d+)\s*({})",
        regex::escape(phrase),
        window,
        DISTANCE_UNITS
    );
    Regex::new(&pattern).map_err(|e| ConfigurationError::InvalidObjectPattern {
        pattern: phrase.to_string(),
        reason: e.to_string(),
    })
}

fn find_distance(regex: &Regex, haystack: &str) -> String {
    regex
        .captures(haystack)
        .and_then(|caps| Some(format!("{} {}", caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .unwrap_or_else(|| UNKNOWN_DISTANCE.to_string())
}
