//! End-to-end retrieval over a real SQLite store with scripted judgments.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use super::completer::ContextCompleter;
use super::pipeline::RetrievalPipeline;
use super::reranker::{DropReason, RelevanceReranker, RerankerConfig};
use super::sqlite::SqliteDocumentStore;
use super::store::{DocumentStore, DuplicatePolicy};
use super::testing::{page, LetterEmbedder, OrderedStore, Reply, ScriptedJudge};
use crate::core::errors::ApiError;

const PAGES: [&str; 5] = [
    "apple orchard notes",
    "banana plantation notes",
    "cherry blossom notes",
    "damson plum notes",
    "elder flower notes",
];

async fn sqlite_store(dir: &tempfile::TempDir) -> Arc<SqliteDocumentStore> {
    let store = SqliteDocumentStore::with_path(
        dir.path().join("rag.db"),
        Arc::new(LetterEmbedder),
        DuplicatePolicy::Overwrite,
    )
    .await
    .expect("store");
    let passages = PAGES
        .iter()
        .enumerate()
        .map(|(idx, text)| page("fruit.pdf", idx as u32 + 1, text))
        .collect();
    store.add(passages).await.expect("add");
    Arc::new(store)
}

fn pipeline(store: Arc<dyn DocumentStore>, judge: Arc<ScriptedJudge>) -> RetrievalPipeline {
    let config = RerankerConfig {
        call_timeout: Duration::from_millis(200),
        ..RerankerConfig::default()
    };
    RetrievalPipeline::new(
        store,
        RelevanceReranker::new(judge, config),
        ContextCompleter::default(),
    )
}

fn judge_by_page(scores: &[&str]) -> ScriptedJudge {
    let markers: Vec<String> = PAGES
        .iter()
        .map(|text| format!("Document excerpt: {}", text))
        .collect();
    let markers: Vec<&str> = markers.iter().map(String::as_str).collect();
    ScriptedJudge::scores(&markers, scores)
}

#[tokio::test]
async fn top_two_follow_judged_scores() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let judge = Arc::new(judge_by_page(&["8", "3", "7", "9", "2"]));

    let results = pipeline(store, judge.clone())
        .retrieve("fruit notes", 10, 2)
        .await
        .unwrap();

    let pages: Vec<u32> = results.iter().map(|p| p.passage.metadata.page_num).collect();
    assert_eq!(pages, vec![4, 1]);
    assert_eq!(results[0].score, 9.0);
    assert_eq!(results[1].score, 8.0);
    assert_eq!(judge.calls.load(Ordering::SeqCst), 5);

    // page 4 gets both neighbours, page 1 only its successor
    assert_eq!(results[0].context_pages, vec![3, 5]);
    assert!(results[0]
        .passage
        .text
        .starts_with("damson plum notes\n\n[Supplementary context (page 3)]: cherry blossom notes..."));
    assert_eq!(results[1].context_pages, vec![2]);
}

#[tokio::test]
async fn unparsable_judgments_yield_empty_result() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let judge = Arc::new(ScriptedJudge::new(Reply::Text(
        "This excerpt seems fairly relevant.".to_string(),
    )));

    let report = pipeline(store, judge)
        .retrieve_with_report("fruit notes", 10, 3)
        .await
        .unwrap();

    assert!(report.passages.is_empty());
    assert_eq!(report.coarse_count, 5);
    assert_eq!(report.dropped.len(), 5);
    assert!(report
        .dropped
        .iter()
        .all(|d| matches!(d.reason, DropReason::Unparsable(_))));
}

#[tokio::test]
async fn last_page_is_completed_from_previous_page_only() {
    let dir = tempfile::tempdir().unwrap();
    let store = SqliteDocumentStore::with_path(
        dir.path().join("rag.db"),
        Arc::new(LetterEmbedder),
        DuplicatePolicy::Overwrite,
    )
    .await
    .unwrap();
    let long_second = format!("second {}", "s".repeat(400));
    store
        .add(vec![
            page("short.pdf", 1, "first"),
            page("short.pdf", 2, &long_second),
            page("short.pdf", 3, "third"),
        ])
        .await
        .unwrap();
    let judge = Arc::new(
        ScriptedJudge::new(Reply::Text("1".to_string())).score("Document excerpt: third", "7"),
    );

    let results = pipeline(Arc::new(store), judge)
        .retrieve("third", 10, 3)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let expected_excerpt: String = long_second.chars().take(200).collect();
    assert_eq!(
        results[0].passage.text,
        format!(
            "third\n\n[Supplementary context (page 2)]: {}...",
            expected_excerpt
        )
    );
}

#[tokio::test]
async fn empty_store_returns_nothing_without_judging() {
    let judge = Arc::new(ScriptedJudge::new(Reply::Text("9".to_string())));
    let store = Arc::new(OrderedStore::default());

    let results = pipeline(store.clone(), judge.clone())
        .retrieve("anything", 10, 3)
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(judge.calls.load(Ordering::SeqCst), 0);
    assert_eq!(store.snapshot_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn snapshot_is_fetched_once_per_call() {
    let store = Arc::new(OrderedStore::with_passages(
        (1..=6).map(|n| page("a.pdf", n, &format!("page {}", n))).collect(),
    ));
    let judge = Arc::new(ScriptedJudge::new(Reply::Text("8".to_string())));

    let results = pipeline(store.clone(), judge)
        .retrieve("pages", 6, 3)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(store.snapshot_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retrieval_never_mutates_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = sqlite_store(&dir).await;
    let before = store.get_all().await.unwrap();
    let judge = Arc::new(ScriptedJudge::new(Reply::Text("10".to_string())));

    pipeline(store.clone(), judge)
        .retrieve("fruit", 10, 5)
        .await
        .unwrap();

    assert_eq!(store.get_all().await.unwrap(), before);
}

#[tokio::test]
async fn store_outage_is_an_error_not_an_empty_result() {
    let judge = Arc::new(ScriptedJudge::new(Reply::Text("9".to_string())));
    let err = pipeline(Arc::new(OrderedStore::failing()), judge)
        .retrieve("anything", 10, 3)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::StoreUnavailable(_)));
}

#[tokio::test]
async fn invalid_arguments_are_rejected() {
    let judge = Arc::new(ScriptedJudge::new(Reply::Text("9".to_string())));
    let pipeline = pipeline(Arc::new(OrderedStore::default()), judge);

    assert!(matches!(
        pipeline.retrieve("query", 10, 0).await.unwrap_err(),
        ApiError::BadRequest(_)
    ));
    assert!(matches!(
        pipeline.retrieve("query", 0, 3).await.unwrap_err(),
        ApiError::BadRequest(_)
    ));
}

#[tokio::test]
async fn hung_judgments_time_out_without_sinking_the_batch() {
    let store = Arc::new(OrderedStore::with_passages(vec![
        page("a.pdf", 1, "slow"),
        page("a.pdf", 2, "quick"),
    ]));
    let judge = Arc::new(
        ScriptedJudge::new(Reply::Text("7".to_string())).reply("Document excerpt: slow", Reply::Hang),
    );

    let report = pipeline(store, judge)
        .retrieve_with_report("q", 10, 3)
        .await
        .unwrap();

    assert_eq!(report.passages.len(), 1);
    assert_eq!(report.passages[0].passage.metadata.page_num, 2);
    assert_eq!(report.dropped[0].reason, DropReason::Timeout);
}

#[tokio::test]
async fn query_reaches_the_judge_verbatim() {
    let store = Arc::new(OrderedStore::with_passages(vec![page("a.pdf", 1, "alpha")]));
    let judge = Arc::new(ScriptedJudge::new(Reply::Text("8".to_string())));

    let results = pipeline(store, judge.clone())
        .retrieve("  alpha? ", 10, 3)
        .await
        .unwrap();

    assert_eq!(results.len(), 1);
    let prompts = judge.prompts.lock().unwrap().clone();
    assert!(prompts[0].contains("  alpha? "));
}

#[tokio::test]
async fn blank_query_is_not_an_error() {
    let store = Arc::new(OrderedStore::with_passages(vec![page("a.pdf", 1, "alpha")]));
    let judge = Arc::new(ScriptedJudge::new(Reply::Text("2".to_string())));

    let results = pipeline(store, judge).retrieve("   ", 10, 3).await.unwrap();
    assert!(results.is_empty());
}
