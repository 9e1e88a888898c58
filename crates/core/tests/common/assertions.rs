//! Custom assertion helpers for integration tests.

use super::fixtures::Recorded;

/// Assert that `names` is one complete run lifecycle:
/// `start` first, `finish` last and exactly once, and exactly one of
/// `success` / `error` in between.
#[allow(dead_code)]
pub fn assert_lifecycle(names: &[String]) {
    assert!(!names.is_empty(), "Event sequence is empty");
    assert_eq!(names[0], "start", "First event should be start: {names:?}");
    assert_eq!(
        names.last().map(String::as_str),
        Some("finish"),
        "Last event should be finish: {names:?}"
    );
    assert_eq!(
        names.iter().filter(|n| *n == "finish").count(),
        1,
        "finish must be emitted exactly once: {names:?}"
    );
    let outcomes = names
        .iter()
        .filter(|n| *n == "success" || *n == "error")
        .count();
    assert_eq!(outcomes, 1, "Expected exactly one success or error: {names:?}");
}

/// Names of the events recorded for one run, in delivery order.
#[allow(dead_code)]
pub fn names_for_run(entries: &[Recorded], run_id: &str) -> Vec<String> {
    entries
        .iter()
        .filter(|r| r.run_id.as_deref() == Some(run_id))
        .map(|r| r.name.clone())
        .collect()
}
