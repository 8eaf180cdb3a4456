pub mod agent;
pub mod editing;
pub mod models;
pub mod session;
pub mod tracking;

// Re-export key types for easier usage
pub use agent::{AgentError, AgentResponse, EditRequest, ReviewRequest, parse_response};
pub use editing::{BlockSeed, Cmd, Document, Editor, EditorError, Patch};
pub use models::*;
pub use session::{AgentOutcome, ReviewSession, SessionError};
pub use tracking::*;
