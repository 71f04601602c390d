pub mod encoder;
pub mod file;

pub use encoder::{EncoderConfig, Mp3Accumulator};
pub use file::AudioFile;
