//! End-to-end publisher scenarios driven against the recording backend.
//!
//! These assert on the exact backend call sequence: creation order, replay
//! order, summarization counts, and the no-double-post guarantees.

use std::collections::HashMap;

use runrelay_client::ItemId;
use runrelay_engine::Publisher;
use runrelay_testing::{BackendCall, RecordingBackend, fixtures};
use runrelay_types::{KeywordType, LogLevel, Status};

const REMOVED_CONTENT: &str = "Content removed using the --remove-keywords option.";

fn publisher(remove: &[&str], flatten: &[&str]) -> Publisher<RecordingBackend> {
    let remove: Vec<String> = remove.iter().map(|t| t.to_string()).collect();
    let flatten: Vec<String> = flatten.iter().map(|t| t.to_string()).collect();
    Publisher::from_directives(RecordingBackend::new(), &remove, &flatten)
}

fn open_test(publisher: &mut Publisher<RecordingBackend>) {
    publisher
        .start_launch(fixtures::launch_start("Regression"))
        .unwrap();
    publisher
        .start_suite("Suite", fixtures::suite_start("s1", "Suite", 0))
        .unwrap();
    publisher
        .start_test("Test", fixtures::test_start("s1-t1", "Suite.Test", 1))
        .unwrap();
}

fn close_test(publisher: &mut Publisher<RecordingBackend>, status: Status) {
    publisher.end_test(fixtures::test_end(status, 90)).unwrap();
    publisher
        .end_suite(fixtures::suite_end(status, 91))
        .unwrap();
    assert_eq!(publisher.open_items(), 0);
}

/// Run one keyword from start to end under the current top of the stack.
fn step(publisher: &mut Publisher<RecordingBackend>, name: &str, status: Status, seconds: i64) {
    let kwname = name.rsplit('.').next().unwrap();
    publisher
        .start_keyword(
            name,
            fixtures::keyword_start(kwname, "Lib", KeywordType::Keyword, seconds),
        )
        .unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(status, seconds + 1))
        .unwrap();
}

fn index_of_create(calls: &[BackendCall], wanted: &str) -> usize {
    calls
        .iter()
        .position(|call| matches!(call, BackendCall::CreateItem { name, .. } if name == wanted))
        .unwrap_or_else(|| panic!("no create call for {}", wanted))
}

fn index_of_finish(calls: &[BackendCall], target: &ItemId) -> usize {
    calls
        .iter()
        .position(|call| matches!(call, BackendCall::FinishItem { item_id, .. } if item_id == target))
        .unwrap_or_else(|| panic!("no finish call for {}", target))
}

/// Order preservation: a child's create call never precedes its parent's.
fn assert_parents_precede_children(calls: &[BackendCall]) {
    let mut created_at: HashMap<ItemId, usize> = HashMap::new();
    for (index, call) in calls.iter().enumerate() {
        if let BackendCall::CreateItem {
            item_id,
            parent_item_id,
            ..
        } = call
        {
            if let Some(parent) = parent_item_id {
                let parent_index = created_at
                    .get(parent)
                    .unwrap_or_else(|| panic!("{} created before its parent {}", item_id, parent));
                assert!(parent_index < &index);
            }
            created_at.insert(item_id.clone(), index);
        }
    }
}

/// No id receives more than one create or finish call.
fn assert_no_double_post(calls: &[BackendCall]) {
    let mut creates: HashMap<ItemId, usize> = HashMap::new();
    let mut finishes: HashMap<ItemId, usize> = HashMap::new();
    for call in calls {
        match call {
            BackendCall::CreateItem { item_id, .. } => {
                *creates.entry(item_id.clone()).or_default() += 1;
            }
            BackendCall::FinishItem { item_id, .. } => {
                *finishes.entry(item_id.clone()).or_default() += 1;
            }
            _ => {}
        }
    }
    for (item_id, count) in creates.iter().chain(finishes.iter()) {
        assert_eq!(*count, 1, "{} posted or finished {} times", item_id, count);
    }
}

#[test]
fn plain_run_posts_everything_in_order() {
    let mut publisher = publisher(&[], &[]);
    open_test(&mut publisher);

    publisher
        .start_keyword(
            "BuiltIn.Log",
            fixtures::keyword_start("Log", "BuiltIn", KeywordType::Keyword, 2),
        )
        .unwrap();
    publisher
        .log_message(fixtures::log(LogLevel::Info, "hello"))
        .unwrap();
    // A launch-level log posts immediately and carries no item id.
    let mut launch_note = fixtures::log(LogLevel::Info, "launch note");
    launch_note.launch_log = true;
    publisher.log_message(launch_note).unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 3))
        .unwrap();

    close_test(&mut publisher, Status::Pass);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec!["Suite", "Test", "BuiltIn.Log ()"]
    );
    assert_parents_precede_children(&backend.calls);
    assert_no_double_post(&backend.calls);

    let keyword_id = backend.created_id("BuiltIn.Log ()").unwrap();
    assert_eq!(backend.logs_for(keyword_id), vec!["hello"]);
    let launch_logs: Vec<_> = backend
        .calls
        .iter()
        .filter(|call| matches!(call, BackendCall::Log { item_id: None, .. }))
        .collect();
    assert_eq!(launch_logs.len(), 1);

    // Finishes come innermost-first, launch last.
    let test_id = backend.created_id("Test").unwrap();
    assert!(index_of_finish(&backend.calls, keyword_id) < index_of_finish(&backend.calls, test_id));
    assert_eq!(backend.launch_finishes().len(), 1);
}

#[test]
fn remove_passed_suppresses_keywords_and_logs_marker() {
    let mut publisher = publisher(&["PASSED"], &[]);
    open_test(&mut publisher);
    for index in 0..5 {
        step(
            &mut publisher,
            &format!("Lib.Step {}", index),
            Status::Pass,
            2 + index as i64 * 2,
        );
    }
    close_test(&mut publisher, Status::Pass);

    let backend = publisher.into_backend();
    // No keyword was ever created; the test carries a single marker log.
    assert_eq!(backend.created_names(), vec!["Suite", "Test"]);
    let test_id = backend.created_id("Test").unwrap();
    assert_eq!(backend.logs_for(test_id), vec![REMOVED_CONTENT]);
    assert_no_double_post(&backend.calls);

    let finish = backend
        .calls
        .iter()
        .find(|call| matches!(call, BackendCall::FinishItem { item_id, .. } if item_id == test_id))
        .unwrap();
    assert!(matches!(
        finish,
        BackendCall::FinishItem { status, .. } if status == "PASSED"
    ));
}

#[test]
fn remove_passed_replays_whole_subtree_on_failure() {
    let mut publisher = publisher(&["PASSED"], &[]);
    open_test(&mut publisher);

    // One keyword with a nested child that logs, then a sibling keyword.
    publisher
        .start_keyword(
            "Lib.Step A",
            fixtures::keyword_start("Step A", "Lib", KeywordType::Keyword, 2),
        )
        .unwrap();
    publisher
        .start_keyword(
            "Lib.Child",
            fixtures::keyword_start("Child", "Lib", KeywordType::Keyword, 3),
        )
        .unwrap();
    publisher
        .log_message(fixtures::log(LogLevel::Info, "inside child"))
        .unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 4))
        .unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 5))
        .unwrap();
    step(&mut publisher, "Lib.Step B", Status::Pass, 6);

    close_test(&mut publisher, Status::Fail);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec!["Suite", "Test", "Lib.Step A ()", "Lib.Child ()", "Lib.Step B ()"]
    );
    assert_parents_precede_children(&backend.calls);
    assert_no_double_post(&backend.calls);

    // The buffered log replays against the child's real id, and finishes
    // run bottom-up before the test's own finish.
    let child_id = backend.created_id("Lib.Child ()").unwrap();
    assert_eq!(backend.logs_for(child_id), vec!["inside child"]);
    let parent_id = backend.created_id("Lib.Step A ()").unwrap();
    let test_id = backend.created_id("Test").unwrap();
    let calls = &backend.calls;
    assert!(index_of_finish(calls, child_id) < index_of_finish(calls, parent_id));
    assert!(index_of_finish(calls, parent_id) < index_of_finish(calls, test_id));
}

#[test]
fn wuks_failure_keeps_only_last_attempt() {
    let mut publisher = publisher(&["WUKS"], &[]);
    open_test(&mut publisher);

    publisher
        .start_keyword(
            "BuiltIn.Wait Until Keyword Succeeds",
            fixtures::keyword_start(
                "Wait Until Keyword Succeeds",
                "BuiltIn",
                KeywordType::Keyword,
                2,
            ),
        )
        .unwrap();
    for attempt in 1..=4 {
        step(
            &mut publisher,
            &format!("Lib.Attempt {}", attempt),
            Status::Fail,
            2 + attempt as i64 * 2,
        );
    }
    publisher
        .end_keyword(fixtures::keyword_end(Status::Fail, 12))
        .unwrap();

    close_test(&mut publisher, Status::Fail);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec![
            "Suite",
            "Test",
            "BuiltIn.Wait Until Keyword Succeeds ()",
            "Lib.Attempt 4 ()"
        ]
    );
    assert_eq!(
        backend.logged_messages(),
        vec!["3 failing items removed using the --remove-keywords option."]
    );
    assert_parents_precede_children(&backend.calls);
    assert_no_double_post(&backend.calls);

    // Count log lands on the retry keyword, before the replayed attempt.
    let wuks_id = backend.created_id("BuiltIn.Wait Until Keyword Succeeds ()").unwrap();
    assert_eq!(backend.logs_for(wuks_id).len(), 1);
    let calls = &backend.calls;
    let log_index = calls
        .iter()
        .position(|call| matches!(call, BackendCall::Log { .. }))
        .unwrap();
    assert!(log_index < index_of_create(calls, "Lib.Attempt 4 ()"));
}

#[test]
fn wuks_success_keeps_first_and_last_attempts() {
    let mut publisher = publisher(&["WUKS"], &[]);
    open_test(&mut publisher);

    publisher
        .start_keyword(
            "BuiltIn.Wait Until Keyword Succeeds",
            fixtures::keyword_start(
                "Wait Until Keyword Succeeds",
                "BuiltIn",
                KeywordType::Keyword,
                2,
            ),
        )
        .unwrap();
    for attempt in 1..=4 {
        let status = if attempt == 4 { Status::Pass } else { Status::Fail };
        step(
            &mut publisher,
            &format!("Lib.Attempt {}", attempt),
            status,
            2 + attempt as i64 * 2,
        );
    }
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 12))
        .unwrap();

    close_test(&mut publisher, Status::Pass);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec![
            "Suite",
            "Test",
            "BuiltIn.Wait Until Keyword Succeeds ()",
            "Lib.Attempt 1 ()",
            "Lib.Attempt 4 ()"
        ]
    );
    assert_eq!(
        backend.logged_messages(),
        vec!["2 failing items removed using the --remove-keywords option."]
    );
    assert_no_double_post(&backend.calls);
}

#[test]
fn for_loop_keeps_only_last_iteration() {
    let mut publisher = publisher(&["FOR"], &[]);
    open_test(&mut publisher);

    publisher
        .start_keyword(
            "${i} IN RANGE 3",
            fixtures::keyword_start("${i} IN RANGE 3", "", KeywordType::For, 2),
        )
        .unwrap();
    for iteration in 1..=3 {
        publisher
            .start_keyword(
                &format!("${{i}} = {}", iteration),
                fixtures::keyword_start(
                    &format!("${{i}} = {}", iteration),
                    "",
                    KeywordType::Iteration,
                    2 + iteration as i64,
                ),
            )
            .unwrap();
        publisher
            .end_keyword(fixtures::keyword_end(Status::Pass, 3 + iteration as i64))
            .unwrap();
    }
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 10))
        .unwrap();

    close_test(&mut publisher, Status::Pass);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec!["Suite", "Test", "${i} IN RANGE 3 ()", "${i} = 3 ()"]
    );
    assert_eq!(
        backend.logged_messages(),
        vec!["2 passing items removed using the --remove-keywords option."]
    );
    assert_no_double_post(&backend.calls);
}

#[test]
fn flattened_keyword_merges_into_parent() {
    let mut publisher = publisher(&[], &["NAME:*Wrapper"]);
    open_test(&mut publisher);

    publisher
        .start_keyword(
            "Login Wrapper",
            fixtures::keyword_start("Login Wrapper", "", KeywordType::Keyword, 2),
        )
        .unwrap();
    publisher
        .log_message(fixtures::log(LogLevel::Info, "inside wrapper"))
        .unwrap();
    publisher
        .start_keyword(
            "BuiltIn.Click",
            fixtures::keyword_start("Click", "BuiltIn", KeywordType::Keyword, 3),
        )
        .unwrap();
    publisher
        .log_message(fixtures::log(LogLevel::Info, "inside nested"))
        .unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 4))
        .unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 5))
        .unwrap();
    step(&mut publisher, "Lib.After", Status::Pass, 6);

    close_test(&mut publisher, Status::Pass);

    let backend = publisher.into_backend();
    // The wrapper and everything under it produce no items of their own.
    assert_eq!(
        backend.created_names(),
        vec!["Suite", "Test", "Lib.After ()"]
    );
    let test_id = backend.created_id("Test").unwrap();
    assert_eq!(
        backend.logs_for(test_id),
        vec!["inside wrapper", "inside nested"]
    );
    // Exactly one finish for the test id: the flattened nodes never finish.
    assert_eq!(backend.finish_count(test_id), 1);
    assert_no_double_post(&backend.calls);
}

#[test]
fn name_rule_suppresses_matching_keyword_only() {
    let mut publisher = publisher(&["NAME:Log*"], &[]);
    open_test(&mut publisher);
    step(&mut publisher, "Log Something", Status::Pass, 2);
    step(&mut publisher, "Click Button", Status::Pass, 4);
    close_test(&mut publisher, Status::Pass);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec!["Suite", "Test", "Click Button ()"]
    );
    // Passing test: the suppressed keyword is dropped without a marker.
    assert!(backend.logged_messages().is_empty());
}

#[test]
fn name_rule_replays_suppressed_keyword_when_test_fails() {
    let mut publisher = publisher(&["NAME:Log*"], &[]);
    open_test(&mut publisher);
    step(&mut publisher, "Log Something", Status::Pass, 2);
    step(&mut publisher, "Click Button", Status::Fail, 4);
    close_test(&mut publisher, Status::Fail);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec!["Suite", "Test", "Click Button ()", "Log Something ()"]
    );

    // The replay lands before the test's finish call, with the keyword's
    // original start time.
    let calls = &backend.calls;
    let test_id = backend.created_id("Test").unwrap();
    let replay_index = index_of_create(calls, "Log Something ()");
    assert!(replay_index < index_of_finish(calls, test_id));
    let replayed_id = backend.created_id("Log Something ()").unwrap();
    assert_eq!(backend.finish_count(replayed_id), 1);
    match &calls[replay_index] {
        BackendCall::CreateItem { start_time, .. } => {
            assert_eq!(
                start_time,
                &fixtures::at(2).timestamp_millis().to_string()
            );
        }
        other => panic!("unexpected call: {:?}", other),
    }
    assert_no_double_post(calls);
}

#[test]
fn warn_log_forces_replay_from_suppression_origin() {
    let mut publisher = publisher(&["PASSED"], &[]);
    open_test(&mut publisher);

    publisher
        .start_keyword(
            "Lib.Outer",
            fixtures::keyword_start("Outer", "Lib", KeywordType::Keyword, 2),
        )
        .unwrap();
    publisher
        .log_message(fixtures::log(LogLevel::Info, "quiet"))
        .unwrap();
    publisher
        .start_keyword(
            "Lib.Inner",
            fixtures::keyword_start("Inner", "Lib", KeywordType::Keyword, 3),
        )
        .unwrap();
    publisher
        .log_message(fixtures::log(LogLevel::Warn, "watch out"))
        .unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 4))
        .unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 5))
        .unwrap();

    close_test(&mut publisher, Status::Pass);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec!["Suite", "Test", "Lib.Outer ()", "Lib.Inner ()"]
    );
    assert_parents_precede_children(&backend.calls);
    assert_no_double_post(&backend.calls);

    // The buffered INFO replays on the outer keyword before the WARN posts
    // on the inner one, and no removed-content marker follows.
    let outer_id = backend.created_id("Lib.Outer ()").unwrap();
    let inner_id = backend.created_id("Lib.Inner ()").unwrap();
    assert_eq!(backend.logs_for(outer_id), vec!["quiet"]);
    assert_eq!(backend.logs_for(inner_id), vec!["watch out"]);
    assert!(!backend.logged_messages().contains(&REMOVED_CONTENT));

    // Both keywords are finished by their own end events after the replay.
    assert_eq!(backend.finish_count(outer_id), 1);
    assert_eq!(backend.finish_count(inner_id), 1);
}

#[test]
fn remove_all_drops_content_even_on_failure() {
    let mut publisher = publisher(&["ALL"], &[]);
    open_test(&mut publisher);
    step(&mut publisher, "Lib.Step A", Status::Pass, 2);
    step(&mut publisher, "Lib.Step B", Status::Fail, 4);
    close_test(&mut publisher, Status::Fail);

    let backend = publisher.into_backend();
    assert_eq!(backend.created_names(), vec!["Suite", "Test"]);
    let test_id = backend.created_id("Test").unwrap();
    assert_eq!(backend.logs_for(test_id), vec![REMOVED_CONTENT]);
}

#[test]
fn tag_rule_matches_keyword_tags() {
    let mut publisher = publisher(&["TAG:noisy*"], &[]);
    open_test(&mut publisher);

    let mut attributes = fixtures::keyword_start("Chatty", "Lib", KeywordType::Keyword, 2);
    attributes.tags = vec!["noisy-io".to_string()];
    publisher.start_keyword("Lib.Chatty", attributes).unwrap();
    publisher
        .end_keyword(fixtures::keyword_end(Status::Pass, 3))
        .unwrap();
    step(&mut publisher, "Lib.Quiet", Status::Pass, 4);

    close_test(&mut publisher, Status::Pass);

    let backend = publisher.into_backend();
    assert_eq!(
        backend.created_names(),
        vec!["Suite", "Test", "Lib.Quiet ()"]
    );
}
