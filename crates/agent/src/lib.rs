pub mod conversation;
pub mod llm;
pub mod tools;

pub use conversation::{ChatError, ChatOutcome, ConversationDriver, MAX_TOOL_ROUNDS};
pub use llm::{ChatMessage, ChatModel, LlmError, OpenAiChatModel, Role};
pub use tools::{ReservationIntent, ToolExecutor, ToolName, ToolOutcome};
