//! Public types for the Muninn API.

mod message;
mod step;

pub use message::{Conversation, Message, Role};
pub use step::AugmentationStep;
