//! External service integrations.

pub mod email;
pub mod vision;

pub use email::{EmailError, EmailMessage, EmailService};
pub use vision::{
    normalize_image, MockVisionModel, OllamaClient, VisionError, VisionHealth, VisionModel,
    VisionResponse,
};
