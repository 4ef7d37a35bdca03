//! Users as seen by the alert pipeline.

use serde::Serialize;
use uuid::Uuid;

/// Name used in notifications when the user has none on record.
pub const FALLBACK_DISPLAY_NAME: &str = "your contact";

/// The user an analysis is performed for.
///
/// Identity and authentication are owned elsewhere; the pipeline only needs
/// an id to attach alerts to and a name to put in notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    pub id: Uuid,
    pub display_name: String,
}

impl UserRef {
    pub fn new(id: Uuid, display_name: Option<&str>) -> Self {
        let display_name = display_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(FALLBACK_DISPLAY_NAME)
            .to_string();
        Self { id, display_name }
    }
}
