//! Concurrency guarantees: one build no matter how many callers race, and
//! lock-free concurrent queries over the immutable snapshot.

mod common;

use std::sync::Arc;

use common::write_corpus;
use covermatch::{find_similar_cover, CorpusConfig, MatchMethod, MatchOptions, SharedCorpus};

#[test]
fn racing_loaders_build_exactly_once() {
    let dir = tempfile::tempdir().expect("tempdir");
    write_corpus(dir.path(), &["alpha", "beta", "gamma", "delta"]);
    let corpus = Arc::new(SharedCorpus::new(dir.path(), CorpusConfig::default()));

    std::thread::scope(|scope| {
        for _ in 0..8 {
            let corpus = Arc::clone(&corpus);
            scope.spawn(move || {
                let index = corpus.ensure_loaded().expect("load");
                assert_eq!(index.len(), 4);
            });
        }
    });

    assert_eq!(corpus.load_count(), 1, "the expensive build must run once");
}

#[test]
fn concurrent_queries_share_one_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let ids = ["alpha", "beta", "gamma", "delta"];
    write_corpus(dir.path(), &ids);
    let corpus = Arc::new(SharedCorpus::new(dir.path(), CorpusConfig::default()));

    std::thread::scope(|scope| {
        for &id in &ids {
            let corpus = Arc::clone(&corpus);
            let path = dir.path().join(format!("{id}.png"));
            scope.spawn(move || {
                let query = image::open(path).expect("open cover");
                let out =
                    find_similar_cover(&corpus, &query, &MatchOptions::default()).expect("run");
                assert_eq!(out.len(), 1);
                assert_eq!(out[0].cover_id, id);
                assert_eq!(out[0].method, MatchMethod::Hash);
            });
        }
    });

    assert_eq!(corpus.load_count(), 1);
}
