//! Storage Adapters
//!
//! - **InMemoryToolCallLog** - Tool call records kept in process memory

mod in_memory_tool_call_log;

pub use in_memory_tool_call_log::InMemoryToolCallLog;
