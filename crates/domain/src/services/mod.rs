//! Domain services for the alert pipeline.
//!
//! Services contain business logic that operates on domain models and reach
//! storage and email through the ports declared here.

pub mod analysis;
pub mod dispatcher;
pub mod notification;
pub mod store;

pub use analysis::{AnalysisOrchestrator, AnalysisOutcome, AnalysisStage};
pub use dispatcher::{DispatchReport, NotificationDispatcher};
pub use notification::{AlertNotifier, MockAlertNotifier, SentAlertEmail};
pub use store::{
    AlertStore, InMemoryAlertStore, InMemorySubscriptionDirectory, SubscriptionDirectory,
};
