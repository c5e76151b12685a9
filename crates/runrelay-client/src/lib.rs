pub mod backend;
pub mod config;
pub mod error;
pub mod jsonl;
pub mod requests;

pub use backend::{Backend, ItemId};
pub use config::RunConfig;
pub use error::{Error, Result};
pub use jsonl::JsonlBackend;
pub use requests::{FinishRequest, LogRequest, StartItemRequest, StartLaunchRequest};
