pub mod error;
pub mod handler;
pub mod media;
pub mod protocol;
pub mod session;
pub mod transport;

pub use error::{Result, WfdError};
pub use media::{MediaManager, SinkMediaManager, SourceMediaManager};
pub use protocol::Message;
pub use session::{Engine, SessionConfig, SessionState, Sink, Source};
pub use transport::{Outbox, TimerId, Transport};
