pub mod handler;
pub mod manager;
pub mod options;
pub mod orchestrator;
pub mod transform;

pub use handler::{ToolCallHandler, ToolError};
pub use manager::{ToolExecutionManager, ToolExecutionState};
pub use options::SendOptions;
pub use orchestrator::{ChatOrchestrator, ChatStream, MAX_TOOL_ROUNDS};
pub use transform::ChunkTransformer;
