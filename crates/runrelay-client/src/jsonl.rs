//! JSON-lines capture backend.
//!
//! Every backend call becomes one JSON object per line on the underlying
//! writer, in exactly the order the publisher issued it. Item ids are
//! generated locally, so a captured stream is self-contained and can be
//! shipped to a real backend later.

use std::io::Write;

use serde::Serialize;
use uuid::Uuid;

use crate::backend::{Backend, ItemId};
use crate::error::Result;
use crate::requests::{FinishRequest, LogRequest, StartItemRequest, StartLaunchRequest};

pub struct JsonlBackend<W: Write> {
    writer: W,
}

impl<W: Write> JsonlBackend<W> {
    pub fn new(writer: W) -> Self {
        JsonlBackend { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_line<T: Serialize>(&mut self, record: &T) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(tag = "call", rename_all = "snake_case")]
enum CallRecord<'a> {
    StartLaunch {
        launch_id: &'a ItemId,
        #[serde(flatten)]
        request: &'a StartLaunchRequest,
    },
    FinishLaunch {
        #[serde(flatten)]
        request: &'a FinishRequest,
    },
    CreateItem {
        item_id: &'a ItemId,
        #[serde(flatten)]
        request: &'a StartItemRequest,
    },
    FinishItem {
        item_id: &'a ItemId,
        #[serde(flatten)]
        request: &'a FinishRequest,
    },
    Log {
        #[serde(flatten)]
        request: &'a LogRequest,
    },
}

impl<W: Write> Backend for JsonlBackend<W> {
    fn start_launch(&mut self, request: &StartLaunchRequest) -> Result<ItemId> {
        let launch_id = ItemId(Uuid::new_v4().to_string());
        self.write_line(&CallRecord::StartLaunch {
            launch_id: &launch_id,
            request,
        })?;
        Ok(launch_id)
    }

    fn finish_launch(&mut self, request: &FinishRequest) -> Result<()> {
        self.write_line(&CallRecord::FinishLaunch { request })
    }

    fn create_item(&mut self, request: &StartItemRequest) -> Result<ItemId> {
        let item_id = ItemId(Uuid::new_v4().to_string());
        self.write_line(&CallRecord::CreateItem {
            item_id: &item_id,
            request,
        })?;
        Ok(item_id)
    }

    fn finish_item(&mut self, item_id: &ItemId, request: &FinishRequest) -> Result<()> {
        self.write_line(&CallRecord::FinishItem { item_id, request })
    }

    fn log(&mut self, request: &LogRequest) -> Result<()> {
        self.write_line(&CallRecord::Log { request })
    }
}
