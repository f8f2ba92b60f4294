pub mod client;
pub mod connector;
pub mod launcher;
pub mod protocol;
pub mod report;
pub mod session;

#[cfg(test)]
mod testing;

pub use client::{Conversation, ConversationState, ProtocolClient};
pub use connector::{Connector, Dialer, RetryPolicy, Sleeper, TcpDialer, TokioSleeper};
pub use launcher::{ArtifactResolver, DistributionCache, ExitStatus, FixedArtifact, ServerLauncher};
pub use protocol::{Message, Response};
pub use report::{BuildFileReport, DependencyReport};
pub use session::{ServerOutcome, Session, SessionOrchestrator, SessionReport};
