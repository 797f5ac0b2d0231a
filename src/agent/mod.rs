pub mod context;
pub mod orchestrator;
pub mod session;
pub mod store;
pub mod system_prompt;

pub use orchestrator::{CyclePhase, Orchestrator};
pub use session::Session;
pub use store::{AssistantReply, ConversationStore};
