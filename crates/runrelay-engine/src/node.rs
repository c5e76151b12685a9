//! The publisher's view of one reporting unit.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use runrelay_client::{ItemId, StartItemRequest};
use runrelay_types::{ItemKind, Keyword, LaunchStart, LogRecord, Status, Suite, Test};

use crate::filter::RemoveReason;

/// Index of a node in the publisher's arena. Parent links are indices, so
/// the arena is the single owner of every node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeId(pub(crate) usize);

/// Kind-specific start attributes, kept verbatim so the backend create
/// request can be built long after the start event, when a buffered subtree
/// is replayed.
#[derive(Debug, Clone)]
pub enum ItemDetail {
    Launch(LaunchStart),
    Suite(Suite),
    Test(Test),
    Keyword(Keyword),
}

/// One open or buffered reporting unit.
///
/// At any time a node is in exactly one of: the open stack, some ancestor's
/// `skipped_children` buffer, or finalized.
#[derive(Debug)]
pub struct Node {
    pub kind: ItemKind,
    /// Local placeholder id, assigned at construction and never changed;
    /// identifies the node before (and whether or not) a remote id exists.
    pub local_id: Uuid,
    /// Backend id; assigned at most once, the moment `posted` flips true.
    pub remote_id: Option<ItemId>,
    pub parent: Option<NodeId>,
    /// Whether the creation event has been transmitted.
    pub posted: bool,
    /// Guard for the single finish call per node.
    pub finished: bool,
    /// Events of this node merge into the parent's remote id; no item of
    /// its own is ever created.
    pub flattened: bool,
    /// Content below this node is currently suppressed.
    pub remove_data: bool,
    pub remove_filter: Option<RemoveReason>,
    /// Topmost ancestor (possibly self) where suppression began.
    pub remove_origin: Option<NodeId>,
    /// Buffered children, in arrival order.
    pub skipped_children: Vec<NodeId>,
    /// Buffered logs addressed directly to this node.
    pub skipped_logs: Vec<LogRecord>,
    pub status: Option<Status>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub detail: ItemDetail,
}

impl Node {
    pub fn new(
        kind: ItemKind,
        parent: Option<NodeId>,
        start_time: DateTime<Utc>,
        detail: ItemDetail,
    ) -> Self {
        Node {
            kind,
            local_id: Uuid::new_v4(),
            remote_id: None,
            parent,
            posted: false,
            finished: false,
            flattened: false,
            remove_data: false,
            remove_filter: None,
            remove_origin: None,
            skipped_children: Vec::new(),
            skipped_logs: Vec::new(),
            status: None,
            start_time,
            end_time: None,
            detail,
        }
    }

    pub fn has_buffered_content(&self) -> bool {
        !self.skipped_children.is_empty() || !self.skipped_logs.is_empty()
    }

    /// Backend create request for this node. The launch is not an item and
    /// has none.
    pub fn start_request(&self, parent_id: Option<&ItemId>) -> Option<StartItemRequest> {
        match &self.detail {
            ItemDetail::Launch(_) => None,
            ItemDetail::Suite(suite) => Some(StartItemRequest::for_suite(suite, parent_id)),
            ItemDetail::Test(test) => Some(StartItemRequest::for_test(test, parent_id)),
            ItemDetail::Keyword(keyword) => Some(StartItemRequest::for_keyword(keyword, parent_id)),
        }
    }
}
