pub mod messages;

pub use messages::{AudioFrameMessage, TranscriptMessage, TranslationMessage};
