//! Objects mentioned in a vision-model answer.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Confidence attached to every extracted object.
///
/// Extraction is presence-based, so there is no measured score to report.
pub const OBJECT_CONFIDENCE: f64 = 0.8;

/// Distance reported when no number and unit follow the object phrase.
pub const UNKNOWN_DISTANCE: &str = "unknown";

/// Fixed set of object categories the extractor recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectCategory {
    Person,
    Vehicle,
    Obstacle,
    Furniture,
    Door,
    Stairs,
    Wall,
    FloorHazard,
}

impl ObjectCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectCategory::Person => "person",
            ObjectCategory::Vehicle => "vehicle",
            ObjectCategory::Obstacle => "obstacle",
            ObjectCategory::Furniture => "furniture",
            ObjectCategory::Door => "door",
            ObjectCategory::Stairs => "stairs",
            ObjectCategory::Wall => "wall",
            ObjectCategory::FloorHazard => "floor_hazard",
        }
    }
}

impl FromStr for ObjectCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "person" => Ok(ObjectCategory::Person),
            "vehicle" => Ok(ObjectCategory::Vehicle),
            "obstacle" => Ok(ObjectCategory::Obstacle),
            "furniture" => Ok(ObjectCategory::Furniture),
            "door" => Ok(ObjectCategory::Door),
            "stairs" => Ok(ObjectCategory::Stairs),
            "wall" => Ok(ObjectCategory::Wall),
            "floor_hazard" => Ok(ObjectCategory::FloorHazard),
            _ => Err(format!("Unknown object category: {}", s)),
        }
    }
}

impl fmt::Display for ObjectCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One object category found in a response, with an optional distance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedObject {
    pub category: ObjectCategory,
    pub confidence: f64,
    pub distance: String,
}

impl DetectedObject {
    pub fn new(category: ObjectCategory, distance: impl Into<String>) -> Self {
        Self {
            category,
            confidence: OBJECT_CONFIDENCE,
            distance: distance.into(),
        }
    }

    pub fn has_known_distance(&self) -> bool {
        self.distance != UNKNOWN_DISTANCE
    }
}
