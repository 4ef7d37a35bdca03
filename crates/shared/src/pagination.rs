//! Keyset pagination for newest-first listings.
//!
//! Alert history is ordered by `(created_at DESC, id DESC)`. A cursor carries the
//! last row's position so the next page can resume without OFFSET scans.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 200;

/// Error type for cursor operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CursorError {
    #[error("Invalid cursor encoding")]
    InvalidEncoding,
    #[error("Invalid cursor format")]
    InvalidFormat,
    #[error("Invalid timestamp in cursor")]
    InvalidTimestamp,
    #[error("Invalid row id in cursor")]
    InvalidId,
}

/// Position of the last row returned on a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub created_at: DateTime<Utc>,
    pub id: i64,
}

impl PageCursor {
    pub fn new(created_at: DateTime<Utc>, id: i64) -> Self {
        Self { created_at, id }
    }

    /// Encodes as `base64url(rfc3339_micros|id)`.
    pub fn encode(&self) -> String {
        let raw = format!(
            "{}|{}",
            self.created_at
                .to_rfc3339_opts(chrono::SecondsFormat::Micros, true),
            self.id
        );
        URL_SAFE_NO_PAD.encode(raw.as_bytes())
    }

    /// Decodes a cursor previously produced by [`PageCursor::encode`].
    pub fn decode(cursor: &str) -> Result<Self, CursorError> {
        let bytes = URL_SAFE_NO_PAD
            .decode(cursor)
            .map_err(|_| CursorError::InvalidEncoding)?;
        let raw = String::from_utf8(bytes).map_err(|_| CursorError::InvalidFormat)?;

        let (ts, id) = raw.rsplit_once('|').ok_or(CursorError::InvalidFormat)?;

        let id: i64 = id.parse().map_err(|_| CursorError::InvalidId)?;
        let created_at = DateTime::parse_from_rfc3339(ts)
            .map_err(|_| CursorError::InvalidTimestamp)?
            .with_timezone(&Utc);

        Ok(Self { created_at, id })
    }
}

/// Clamps a requested page size into `1..=MAX_PAGE_LIMIT`.
pub fn clamp_limit(requested: Option<i64>) -> i64 {
    requested
        .unwrap_or(DEFAULT_PAGE_LIMIT)
        .clamp(1, MAX_PAGE_LIMIT)
}

/// One page of results plus the cursor for the following page.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    /// Builds a page from `limit + 1` fetched rows.
    ///
    /// The extra row only signals that another page exists and is dropped.
    pub fn from_overfetch<F>(mut rows: Vec<T>, limit: i64, cursor_of: F) -> Self
    where
        F: Fn(&T) -> PageCursor,
    {
        let limit = limit.max(0) as usize;
        let has_more = rows.len() > limit;
        rows.truncate(limit);

        let next_cursor = if has_more {
            rows.last().map(|last| cursor_of(last).encode())
        } else {
            None
        };

        Self {
            items: rows,
            next_cursor,
        }
    }
}
