//! The retroactive item-tree publisher.
//!
//! Per node, decide whether to post its creation event immediately, merge it
//! into its parent (flatten), or withhold it and buffer the whole subtree
//! (suppression). Buffered content is replayed in original order when a
//! trigger makes it relevant: a failure status, a WARN/ERROR log, or
//! end-of-run bookkeeping. Suppressed-and-passed content is dropped and
//! summarized instead, so noisy retry and loop constructs collapse to a
//! count while failing content is never lost.
//!
//! Single-threaded by contract: the producer delivers start/end/log hooks in
//! strict nesting order, and every backend call blocks from this side.

use chrono::Utc;

use runrelay_client::{Backend, FinishRequest, ItemId, LogRequest, StartLaunchRequest};
use runrelay_types::{
    ItemKind, Keyword, KeywordEnd, KeywordStart, LaunchStart, LogLevel, LogRecord, RunEvent,
    Status, Suite, SuiteEnd, SuiteStart, Test, TestEnd, TestStart,
};

use crate::error::{Error, Result};
use crate::filter::{FilterTarget, FlattenFilters, RemoveFilters, RemoveReason};
use crate::node::{ItemDetail, Node, NodeId};

const REMOVED_CONTENT_LOG: &str = "Content removed using the --remove-keywords option.";

fn removed_failing_log(count: usize) -> String {
    format!(
        "{} failing items removed using the --remove-keywords option.",
        count
    )
}

fn removed_passing_log(count: usize) -> String {
    format!(
        "{} passing items removed using the --remove-keywords option.",
        count
    )
}

pub struct Publisher<B: Backend> {
    backend: B,
    remove_filters: RemoveFilters,
    flatten_filters: FlattenFilters,
    /// Externally created launch to attach to; not ours to start or finish.
    attached_launch: Option<ItemId>,
    /// Arena owning every node of the run; `NodeId` indexes into it.
    nodes: Vec<Node>,
    /// Currently open items, innermost last.
    stack: Vec<NodeId>,
}

impl<B: Backend> Publisher<B> {
    pub fn new(backend: B, remove_filters: RemoveFilters, flatten_filters: FlattenFilters) -> Self {
        Publisher {
            backend,
            remove_filters,
            flatten_filters,
            attached_launch: None,
            nodes: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Build a publisher straight from configuration directives.
    pub fn from_directives(backend: B, remove: &[String], flatten: &[String]) -> Self {
        Self::new(
            backend,
            RemoveFilters::parse(remove),
            FlattenFilters::parse(flatten),
        )
    }

    /// Report into an existing launch instead of starting a new one.
    pub fn attach_launch(mut self, launch_id: ItemId) -> Self {
        self.attached_launch = Some(launch_id);
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Number of currently open items.
    pub fn open_items(&self) -> usize {
        self.stack.len()
    }

    /// Dispatch one recorded producer event.
    pub fn apply(&mut self, event: RunEvent) -> Result<()> {
        match event {
            RunEvent::StartLaunch { attributes } => self.start_launch(attributes),
            RunEvent::StartSuite { name, attributes } => self.start_suite(&name, attributes),
            RunEvent::EndSuite { attributes } => self.end_suite(attributes),
            RunEvent::StartTest { name, attributes } => self.start_test(&name, attributes),
            RunEvent::EndTest { attributes } => self.end_test(attributes),
            RunEvent::StartKeyword { name, attributes } => self.start_keyword(&name, attributes),
            RunEvent::EndKeyword { attributes } => self.end_keyword(attributes),
            RunEvent::LogMessage { message } => self.log_message(message),
        }
    }

    pub fn start_launch(&mut self, attributes: LaunchStart) -> Result<()> {
        if !self.stack.is_empty() {
            return Err(Error::OutOfOrder(
                "launch started while items are open".to_string(),
            ));
        }

        let (remote_id, externally_owned) = match &self.attached_launch {
            Some(existing) => (existing.clone(), true),
            None => (
                self.backend
                    .start_launch(&StartLaunchRequest::new(&attributes))?,
                false,
            ),
        };

        let start_time = attributes.start_time;
        let mut node = Node::new(
            ItemKind::Launch,
            None,
            start_time,
            ItemDetail::Launch(attributes),
        );
        node.remote_id = Some(remote_id);
        node.posted = true;
        // An attached launch is finished by whoever created it.
        node.finished = externally_owned;

        let id = self.insert(node);
        self.stack.push(id);
        Ok(())
    }

    pub fn start_suite(&mut self, name: &str, attributes: SuiteStart) -> Result<()> {
        let parent = self.expect_open(&[ItemKind::Launch, ItemKind::Suite], "suite start")?;
        let suite = Suite::new(name, attributes);
        let start_time = suite.attributes.start_time;
        self.start_container(ItemKind::Suite, parent, start_time, ItemDetail::Suite(suite))
    }

    pub fn start_test(&mut self, name: &str, attributes: TestStart) -> Result<()> {
        let parent = self.expect_open(&[ItemKind::Suite], "test start")?;
        let test = Test::new(name, attributes);
        let start_time = test.attributes.start_time;
        self.start_container(ItemKind::Test, parent, start_time, ItemDetail::Test(test))
    }

    /// Suites and tests always post at start. Under a global removal policy
    /// the posted node becomes the suppression origin for its descendants,
    /// and its own end decides whether the buffer is replayed or dropped.
    fn start_container(
        &mut self,
        kind: ItemKind,
        parent: NodeId,
        start_time: chrono::DateTime<Utc>,
        detail: ItemDetail,
    ) -> Result<()> {
        let mut node = Node::new(kind, Some(parent), start_time, detail);
        let id = NodeId(self.nodes.len());
        if let Some(reason) = self.remove_filters.global_reason() {
            node.remove_data = true;
            node.remove_filter = Some(reason);
            node.remove_origin = Some(id);
        }
        self.nodes.push(node);
        self.post_node(id)?;
        self.stack.push(id);
        Ok(())
    }

    pub fn start_keyword(&mut self, name: &str, attributes: KeywordStart) -> Result<()> {
        let parent = self.expect_open(
            &[ItemKind::Suite, ItemKind::Test, ItemKind::Keyword],
            "keyword start",
        )?;
        let parent_kind = self.node(parent).kind;
        let keyword = Keyword::new(name, parent_kind, attributes);

        let id = NodeId(self.nodes.len());
        let inherited = self.node(parent).remove_data;
        let mut remove = inherited;
        let mut remove_filter = None;
        let mut remove_origin = None;
        if inherited {
            remove_filter = self.node(parent).remove_filter;
            remove_origin = self.node(parent).remove_origin;
        } else {
            let target = FilterTarget {
                name: &keyword.name,
                tags: &keyword.attributes.tags,
                keyword_type: keyword.keyword_type(),
            };
            if let Some(rule) = self.remove_filters.first_match(&target) {
                remove = true;
                remove_filter = Some(rule.reason());
                remove_origin = Some(id);
            }
        }

        let flatten = !remove
            && (self.node(parent).flattened || {
                let target = FilterTarget {
                    name: &keyword.name,
                    tags: &keyword.attributes.tags,
                    keyword_type: keyword.keyword_type(),
                };
                self.flatten_filters.matches(&target)
            });

        let start_time = keyword.attributes.start_time;
        let mut node = Node::new(
            ItemKind::Keyword,
            Some(parent),
            start_time,
            ItemDetail::Keyword(keyword),
        );
        node.remove_data = remove;
        node.remove_filter = remove_filter;
        node.remove_origin = remove_origin;
        if flatten {
            node.flattened = true;
            node.remote_id = self.node(parent).remote_id.clone();
            node.posted = true;
        }
        self.nodes.push(node);

        if remove {
            // Suppressed: withhold the creation event, buffer under the
            // parent until a trigger or the parent's end decides.
            self.node_mut(parent).skipped_children.push(id);
        } else if !flatten {
            self.post_node(id)?;
        }
        self.stack.push(id);
        Ok(())
    }

    pub fn end_keyword(&mut self, attributes: KeywordEnd) -> Result<()> {
        let id = self.pop_open(ItemKind::Keyword, "keyword end")?;
        {
            let node = self.node_mut(id);
            node.status = Some(attributes.status);
            node.end_time = Some(attributes.end_time);
        }

        let node = self.node(id);
        let origin_is_self = node.remove_origin == Some(id);
        match node.remove_filter {
            Some(RemoveReason::Wuks) if origin_is_self => self.end_retry_keyword(id),
            Some(RemoveReason::For | RemoveReason::While) if origin_is_self => {
                self.end_loop_keyword(id)
            }
            _ => self.end_plain_keyword(id),
        }
    }

    pub fn end_test(&mut self, attributes: TestEnd) -> Result<()> {
        let id = self.pop_open(ItemKind::Test, "test end")?;
        {
            let node = self.node_mut(id);
            node.status = Some(attributes.status);
            node.end_time = Some(attributes.end_time);
        }
        self.resolve_buffers(id)?;
        // Producer failure/skip messages ride along as a debug log.
        if let Some(message) = attributes.message.filter(|m| !m.is_empty()) {
            self.log_at_node(id, LogLevel::Debug, message)?;
        }
        self.finish_node(id)
    }

    pub fn end_suite(&mut self, attributes: SuiteEnd) -> Result<()> {
        let id = self.pop_open(ItemKind::Suite, "suite end")?;
        {
            let node = self.node_mut(id);
            node.status = Some(attributes.status);
            node.end_time = Some(attributes.end_time);
        }
        self.resolve_buffers(id)?;
        self.finish_node(id)?;

        // Closing the root suite ends the run; the launch goes with it.
        if let Some(&top) = self.stack.last()
            && self.node(top).kind == ItemKind::Launch
        {
            self.stack.pop();
            if !self.node(top).finished {
                self.backend
                    .finish_launch(&FinishRequest::new(attributes.end_time, attributes.status))?;
                self.node_mut(top).finished = true;
            }
        }
        Ok(())
    }

    pub fn log_message(&mut self, record: LogRecord) -> Result<()> {
        if record.launch_log {
            return self.post_launch_log(record);
        }
        let Some(id) = self.current() else {
            return self.post_launch_log(record);
        };

        if self.node(id).posted {
            let request = LogRequest::new(
                self.node(id).remote_id.clone(),
                &record,
                self.node(id).start_time,
            );
            self.backend.log(&request)?;
        } else if matches!(record.level, LogLevel::Warn | LogLevel::Error) {
            // An alert inside a suppressed subtree makes the whole buffer
            // relevant: replay from the suppression origin, then post.
            let origin = self.node(id).remove_origin.unwrap_or(id);
            self.replay_subtree(origin)?;
            let request = LogRequest::new(
                self.node(id).remote_id.clone(),
                &record,
                self.node(id).start_time,
            );
            self.backend.log(&request)?;
        } else {
            self.node_mut(id).skipped_logs.push(record);
        }
        Ok(())
    }

    // ---- internals ----

    fn insert(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    fn current(&self) -> Option<NodeId> {
        self.stack.last().copied()
    }

    fn expect_open(&self, kinds: &[ItemKind], operation: &str) -> Result<NodeId> {
        let Some(id) = self.current() else {
            return Err(Error::OutOfOrder(format!("{} with no open item", operation)));
        };
        let node = self.node(id);
        if !kinds.contains(&node.kind) {
            return Err(Error::OutOfOrder(format!(
                "{} under open {} (local id {})",
                operation, node.kind, node.local_id
            )));
        }
        Ok(id)
    }

    fn pop_open(&mut self, kind: ItemKind, operation: &str) -> Result<NodeId> {
        let id = self.expect_open(&[kind], operation)?;
        self.stack.pop();
        Ok(id)
    }

    /// Parent id for a create request; items directly under the launch have
    /// none.
    fn create_parent_id(&self, parent: NodeId) -> Option<ItemId> {
        let parent_node = self.node(parent);
        if parent_node.kind == ItemKind::Launch {
            None
        } else {
            parent_node.remote_id.clone()
        }
    }

    /// Create the node's backend item using its original start attributes.
    /// Idempotent: an already-posted node is left alone.
    fn post_node(&mut self, id: NodeId) -> Result<()> {
        if self.node(id).posted {
            return Ok(());
        }
        let parent_remote = self
            .node(id)
            .parent
            .and_then(|parent| self.create_parent_id(parent));
        let request = self
            .node(id)
            .start_request(parent_remote.as_ref())
            .ok_or_else(|| Error::OutOfOrder("launch cannot be posted as an item".to_string()))?;
        let remote_id = self.backend.create_item(&request)?;
        let node = self.node_mut(id);
        node.remote_id = Some(remote_id);
        node.posted = true;
        Ok(())
    }

    /// Retroactively post a buffered subtree: parent before children,
    /// siblings in arrival order. Children whose end event already arrived
    /// while buffered are finished on the spot.
    fn replay_subtree(&mut self, id: NodeId) -> Result<()> {
        self.post_node(id)?;
        self.flush_logs(id)?;
        let children = std::mem::take(&mut self.node_mut(id).skipped_children);
        for child in children {
            self.replay_subtree(child)?;
            if self.node(child).status.is_some() {
                self.finish_node(child)?;
            }
        }
        Ok(())
    }

    fn flush_logs(&mut self, id: NodeId) -> Result<()> {
        let logs = std::mem::take(&mut self.node_mut(id).skipped_logs);
        let remote_id = self.node(id).remote_id.clone();
        let fallback = self.node(id).start_time;
        for record in logs {
            self.backend
                .log(&LogRequest::new(remote_id.clone(), &record, fallback))?;
        }
        Ok(())
    }

    fn finish_node(&mut self, id: NodeId) -> Result<()> {
        let node = self.node(id);
        if node.finished || !node.posted || node.flattened {
            return Ok(());
        }
        let Some(status) = node.status else {
            return Err(Error::OutOfOrder(
                "finish requested before the end event".to_string(),
            ));
        };
        let end_time = node.end_time.unwrap_or(node.start_time);
        let Some(remote_id) = node.remote_id.clone() else {
            return Err(Error::OutOfOrder(
                "finish requested for an item that was never created".to_string(),
            ));
        };
        self.backend
            .finish_item(&remote_id, &FinishRequest::new(end_time, status))?;
        self.node_mut(id).finished = true;
        Ok(())
    }

    /// End-of-node bookkeeping for a posted node holding buffered content:
    /// replay the whole subtree when the node failed, otherwise drop it,
    /// with a removed-content marker when this node is the suppression
    /// origin. The unconditional `ALL` policy never replays; alerts inside
    /// the buffer have already forced their way out through `log_message`.
    fn resolve_buffers(&mut self, id: NodeId) -> Result<()> {
        if !self.node(id).has_buffered_content() {
            return Ok(());
        }
        let node = self.node(id);
        let failed = node.status == Some(Status::Fail);
        if failed && node.remove_filter != Some(RemoveReason::All) {
            self.replay_subtree(id)
        } else {
            let emit_marker = node.remove_data && node.remove_origin == Some(id);
            self.drop_buffers(id);
            if emit_marker {
                self.log_at_node(id, LogLevel::Info, REMOVED_CONTENT_LOG.to_string())?;
            }
            Ok(())
        }
    }

    fn end_plain_keyword(&mut self, id: NodeId) -> Result<()> {
        if self.node(id).flattened {
            // Absorbed into the parent. Hand any buffered children over so
            // a later failure replay can still reach them.
            let children = std::mem::take(&mut self.node_mut(id).skipped_children);
            if !children.is_empty()
                && let Some(parent) = self.node(id).parent
            {
                self.node_mut(parent).skipped_children.extend(children);
            }
            return Ok(());
        }
        if !self.node(id).posted {
            // Still buffered; the ancestor owning the buffer decides later.
            return Ok(());
        }
        self.resolve_buffers(id)?;
        self.finish_node(id)
    }

    /// Retry-until-success summarization. Most attempts are noise: keep the
    /// last always, the first as well when the retry ultimately passed, and
    /// report the rest as a count.
    fn end_retry_keyword(&mut self, id: NodeId) -> Result<()> {
        let failed = self.node(id).status == Some(Status::Fail);
        let count = self.node(id).skipped_children.len();

        self.post_node(id)?;
        self.flush_logs(id)?;

        if count > 2 {
            let removed = if failed { count - 1 } else { count - 2 };
            self.log_at_node(id, LogLevel::Info, removed_failing_log(removed))?;
        }

        let attempts = std::mem::take(&mut self.node_mut(id).skipped_children);
        if count > 1 && !failed {
            self.replay_child(attempts[0])?;
        }
        if let Some(&last) = attempts.last() {
            self.replay_child(last)?;
        }
        self.finish_node(id)
    }

    /// Loop summarization: only the last iteration is reported, earlier
    /// ones become a count.
    fn end_loop_keyword(&mut self, id: NodeId) -> Result<()> {
        let count = self.node(id).skipped_children.len();

        self.post_node(id)?;
        self.flush_logs(id)?;

        if count > 1 {
            self.log_at_node(id, LogLevel::Info, removed_passing_log(count - 1))?;
        }

        let iterations = std::mem::take(&mut self.node_mut(id).skipped_children);
        if let Some(&last) = iterations.last() {
            self.replay_child(last)?;
        }
        self.finish_node(id)
    }

    fn replay_child(&mut self, id: NodeId) -> Result<()> {
        self.replay_subtree(id)?;
        if self.node(id).status.is_some() {
            self.finish_node(id)?;
        }
        Ok(())
    }

    fn drop_buffers(&mut self, id: NodeId) {
        let node = self.node_mut(id);
        node.skipped_children.clear();
        node.skipped_logs.clear();
    }

    fn log_at_node(&mut self, id: NodeId, level: LogLevel, message: String) -> Result<()> {
        let node = self.node(id);
        let time = node.end_time.unwrap_or(node.start_time);
        let record = LogRecord::new(level, message);
        let request = LogRequest::new(node.remote_id.clone(), &record, time);
        self.backend.log(&request)?;
        Ok(())
    }

    fn post_launch_log(&mut self, record: LogRecord) -> Result<()> {
        let time = record.timestamp.unwrap_or_else(Utc::now);
        self.backend.log(&LogRequest::new(None, &record, time))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runrelay_testing::{RecordingBackend, fixtures};

    fn bare_publisher() -> Publisher<RecordingBackend> {
        Publisher::from_directives(RecordingBackend::new(), &[], &[])
    }

    #[test]
    fn test_end_without_open_item_fails_loudly() {
        let mut publisher = bare_publisher();
        let result = publisher.end_test(fixtures::test_end(Status::Pass, 1));
        assert!(matches!(result, Err(Error::OutOfOrder(_))));
    }

    #[test]
    fn test_end_kind_mismatch_fails_loudly() {
        let mut publisher = bare_publisher();
        publisher.start_launch(fixtures::launch_start("Run")).unwrap();
        publisher
            .start_suite("Suite", fixtures::suite_start("s1", "Suite", 0))
            .unwrap();

        let result = publisher.end_test(fixtures::test_end(Status::Pass, 1));
        assert!(matches!(result, Err(Error::OutOfOrder(_))));
        // The suite is still open; state is unchanged by the bad call.
        assert_eq!(publisher.open_items(), 2);
    }

    #[test]
    fn test_launch_start_requires_empty_stack() {
        let mut publisher = bare_publisher();
        publisher.start_launch(fixtures::launch_start("Run")).unwrap();
        let result = publisher.start_launch(fixtures::launch_start("Again"));
        assert!(matches!(result, Err(Error::OutOfOrder(_))));
    }

    #[test]
    fn test_attached_launch_is_not_started_or_finished() {
        let backend = RecordingBackend::new();
        let mut publisher = Publisher::from_directives(backend, &[], &[])
            .attach_launch(ItemId::from("external-launch"));

        publisher.start_launch(fixtures::launch_start("Run")).unwrap();
        publisher
            .start_suite("Suite", fixtures::suite_start("s1", "Suite", 0))
            .unwrap();
        publisher
            .end_suite(fixtures::suite_end(Status::Pass, 5))
            .unwrap();

        assert_eq!(publisher.open_items(), 0);
        let backend = publisher.into_backend();
        assert!(backend.launch_starts().is_empty());
        assert!(backend.launch_finishes().is_empty());
    }

    #[test]
    fn test_backend_error_propagates_unretried() {
        let mut backend = RecordingBackend::new();
        backend.fail_next_call();
        let mut publisher = Publisher::from_directives(backend, &[], &[]);
        let result = publisher.start_launch(fixtures::launch_start("Run"));
        assert!(matches!(result, Err(Error::Client(_))));
    }
}
