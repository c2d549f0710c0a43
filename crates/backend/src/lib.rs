#![forbid(unsafe_code)]

pub mod error;
pub mod memory;
pub mod repository;
pub mod rpc;

pub use error::BackendError;
pub use memory::InMemoryBackend;
pub use repository::{Backend, DeviceRegistry, QuestionSource, VoteRepository};
pub use rpc::{RpcBackend, RpcConfig};
