pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod nats;
pub mod recognition;
pub mod session;

pub use audio::{AudioFile, EncoderConfig, Mp3Accumulator};
pub use config::Config;
pub use error::RelayError;
pub use http::{create_router, AppState};
pub use recognition::{
    create_engine, RecognitionCallback, RecognitionConfig, RecognitionEngine, RecognitionEvent,
    RecognitionHandle,
};
pub use session::{FinishedSession, RegistrySettings, ResultBuffer, SessionRegistry};
