//! A backend that records every call instead of shipping it.

use runrelay_client::{
    Backend, Error, FinishRequest, ItemId, LogRequest, Result, StartItemRequest,
    StartLaunchRequest,
};

/// One captured backend call, in issue order.
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    StartLaunch {
        name: String,
        start_time: String,
    },
    FinishLaunch {
        status: String,
        end_time: String,
    },
    CreateItem {
        item_id: ItemId,
        name: String,
        item_type: String,
        parent_item_id: Option<ItemId>,
        start_time: String,
    },
    FinishItem {
        item_id: ItemId,
        status: String,
        end_time: String,
    },
    Log {
        item_id: Option<ItemId>,
        level: String,
        message: String,
    },
}

/// Records every call and hands out deterministic ids (`launch-1`,
/// `item-1`, `item-2`, …), which keeps scenario assertions readable.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    next_id: usize,
    fail_next: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call fail, for error-propagation tests.
    pub fn fail_next_call(&mut self) {
        self.fail_next = true;
    }

    /// Names of created items, in creation order.
    pub fn created_names(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::CreateItem { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Id of the first created item with the given name.
    pub fn created_id(&self, name: &str) -> Option<&ItemId> {
        self.calls.iter().find_map(|call| match call {
            BackendCall::CreateItem {
                item_id,
                name: item_name,
                ..
            } if item_name == name => Some(item_id),
            _ => None,
        })
    }

    /// Messages of every `Log` call, in order.
    pub fn logged_messages(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Log { message, .. } => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Log messages addressed to the given item.
    pub fn logs_for(&self, target: &ItemId) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Log {
                    item_id: Some(id),
                    message,
                    ..
                } if id == target => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// How many finish calls were issued for the given item id.
    pub fn finish_count(&self, target: &ItemId) -> usize {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::FinishItem { item_id, .. } if item_id == target))
            .count()
    }

    pub fn launch_starts(&self) -> Vec<&BackendCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::StartLaunch { .. }))
            .collect()
    }

    pub fn launch_finishes(&self) -> Vec<&BackendCall> {
        self.calls
            .iter()
            .filter(|call| matches!(call, BackendCall::FinishLaunch { .. }))
            .collect()
    }

    fn next_item_id(&mut self) -> ItemId {
        self.next_id += 1;
        ItemId(format!("item-{}", self.next_id))
    }

    fn check_failure(&mut self, call: &str) -> Result<()> {
        if std::mem::take(&mut self.fail_next) {
            return Err(Error::Backend(format!("injected failure on {}", call)));
        }
        Ok(())
    }
}

impl Backend for RecordingBackend {
    fn start_launch(&mut self, request: &StartLaunchRequest) -> Result<ItemId> {
        self.check_failure("start_launch")?;
        self.calls.push(BackendCall::StartLaunch {
            name: request.name.clone(),
            start_time: request.start_time.clone(),
        });
        Ok(ItemId("launch-1".to_string()))
    }

    fn finish_launch(&mut self, request: &FinishRequest) -> Result<()> {
        self.check_failure("finish_launch")?;
        self.calls.push(BackendCall::FinishLaunch {
            status: request.status.clone(),
            end_time: request.end_time.clone(),
        });
        Ok(())
    }

    fn create_item(&mut self, request: &StartItemRequest) -> Result<ItemId> {
        self.check_failure("create_item")?;
        let item_id = self.next_item_id();
        self.calls.push(BackendCall::CreateItem {
            item_id: item_id.clone(),
            name: request.name.clone(),
            item_type: request.item_type.clone(),
            parent_item_id: request.parent_item_id.clone(),
            start_time: request.start_time.clone(),
        });
        Ok(item_id)
    }

    fn finish_item(&mut self, item_id: &ItemId, request: &FinishRequest) -> Result<()> {
        self.check_failure("finish_item")?;
        self.calls.push(BackendCall::FinishItem {
            item_id: item_id.clone(),
            status: request.status.clone(),
            end_time: request.end_time.clone(),
        });
        Ok(())
    }

    fn log(&mut self, request: &LogRequest) -> Result<()> {
        self.check_failure("log")?;
        self.calls.push(BackendCall::Log {
            item_id: request.item_id.clone(),
            level: request.level.clone(),
            message: request.message.clone(),
        });
        Ok(())
    }
}
