//! HTTP middleware components.

pub mod caller;
pub mod logging;
pub mod metrics;
pub mod rate_limit;
pub mod trace_id;

pub use caller::require_caller;
pub use metrics::{init_metrics, metrics_handler, metrics_middleware};
pub use rate_limit::{rate_limit_middleware, RateLimiterState};
pub use trace_id::{get_request_id, trace_id, RequestId, REQUEST_ID_HEADER};
