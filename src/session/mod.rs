//! Recording session management
//!
//! This module provides the session lifecycle:
//! - `Session` - one MP3 accumulator, result buffer and recognition connection
//! - `SessionCallback` - turns engine events into result strings
//! - `ResultBuffer` - results waiting for the next upload response
//! - `SessionRegistry` - create / ingest / finish over all live sessions

mod registry;
mod results;
mod session;
mod sink;

pub use registry::{FinishedSession, RegistrySettings, SessionRegistry};
pub use results::ResultBuffer;
pub use session::{Session, StoppedSession};
pub use sink::SessionCallback;
