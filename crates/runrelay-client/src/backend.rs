use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::requests::{FinishRequest, LogRequest, StartItemRequest, StartLaunchRequest};

/// Identifier assigned by the backend to a created launch or item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub String);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ItemId {
    fn from(value: String) -> Self {
        ItemId(value)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId(value.to_string())
    }
}

/// The remote reporting backend, seen from the publisher.
///
/// Implementations may batch or retry internally; calls block from the
/// caller's point of view and errors propagate unretried.
pub trait Backend {
    fn start_launch(&mut self, request: &StartLaunchRequest) -> Result<ItemId>;

    fn finish_launch(&mut self, request: &FinishRequest) -> Result<()>;

    fn create_item(&mut self, request: &StartItemRequest) -> Result<ItemId>;

    fn finish_item(&mut self, item_id: &ItemId, request: &FinishRequest) -> Result<()>;

    fn log(&mut self, request: &LogRequest) -> Result<()>;
}
