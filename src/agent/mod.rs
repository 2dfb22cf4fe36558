/// Agent-facing collaborators consumed by the node executor

pub mod invoker;

pub mod memory;

pub use invoker::{AgentInvoker, EchoInvoker};
pub use memory::{AgentMemory, InMemoryAgentMemory};
