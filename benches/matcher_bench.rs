//! Criterion benchmarks for the hot paths: hash computation, LSH candidate
//! lookup, and the full hash-phase match.
//!
//! Run locally with `cargo bench --bench matcher_bench` — not in CI.

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use image::{DynamicImage, GrayImage, Luma};

use covermatch::{
    hash_image, CorpusConfig, CoverCorpusIndex, CoverHash, CoverMatcher, CoverRecord, HashConfig,
    MatchOptions, MatcherConfig,
};

fn xorshift(state: &mut u64) -> u64 {
    *state ^= *state << 13;
    *state ^= *state >> 7;
    *state ^= *state << 17;
    *state
}

fn blob_image(seed: u64, w: u32, h: u32) -> DynamicImage {
    let mut state = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1;
    let mut img = GrayImage::from_pixel(w, h, Luma([105u8]));
    for _ in 0..80 {
        let cx = (xorshift(&mut state) % u64::from(w)) as i64;
        let cy = (xorshift(&mut state) % u64::from(h)) as i64;
        let r = (3 + xorshift(&mut state) % 10) as i64;
        let shade = (xorshift(&mut state) % 256) as u8;
        for y in (cy - r).max(0)..(cy + r).min(i64::from(h)) {
            for x in (cx - r).max(0)..(cx + r).min(i64::from(w)) {
                let dx = x - cx;
                let dy = y - cy;
                if dx * dx + dy * dy <= r * r {
                    img.put_pixel(x as u32, y as u32, Luma([shade]));
                }
            }
        }
    }
    DynamicImage::ImageLuma8(img)
}

fn random_hash(state: &mut u64) -> CoverHash {
    let mut words = [0u64; 4];
    for w in words.iter_mut() {
        *w = xorshift(state);
    }
    CoverHash(words)
}

/// A corpus of hash-only records, the shape the hash phase sees in practice.
fn synthetic_corpus(count: usize) -> CoverCorpusIndex {
    let mut state = 0xC0FFEEu64;
    let records = (0..count)
        .map(|i| CoverRecord {
            cover_id: format!("cover{i:05}"),
            path: None,
            hash: Some(random_hash(&mut state)),
            features: None,
        })
        .collect();
    CoverCorpusIndex::from_records(records, CorpusConfig::default())
}

fn bench_hash_image(c: &mut Criterion) {
    let img = blob_image(7, 200, 200);
    let cfg = HashConfig::default();
    c.bench_function("hash_image_200px", |b| b.iter(|| hash_image(&img, &cfg)));
}

fn bench_lsh_candidates(c: &mut Criterion) {
    let corpus = synthetic_corpus(5000);
    let mut state = 0xBEEFu64;
    let query = random_hash(&mut state);
    c.bench_function("lsh_candidates_5k", |b| {
        b.iter(|| corpus.candidates_for(&query))
    });
}

fn bench_hash_phase_end_to_end(c: &mut Criterion) {
    // Exact-duplicate query over a synthetic corpus: the common case.
    let img = blob_image(99, 200, 200);
    let cfg = CorpusConfig::default();
    let record = CoverRecord {
        cover_id: "target".into(),
        path: None,
        hash: Some(hash_image(&img, &cfg.hash)),
        features: None,
    };
    let mut state = 0xABCDu64;
    let mut records = vec![record];
    for i in 0..2000 {
        records.push(CoverRecord {
            cover_id: format!("filler{i:04}"),
            path: None,
            hash: Some(random_hash(&mut state)),
            features: None,
        });
    }
    let corpus = Arc::new(CoverCorpusIndex::from_records(records, cfg));
    let engine = CoverMatcher::new(corpus, MatcherConfig::default()).expect("valid config");
    let opts = MatchOptions::default();

    c.bench_function("hash_phase_match_2k", |b| {
        b.iter(|| engine.find_similar_cover(&img, &opts).expect("run"))
    });
}

criterion_group!(
    benches,
    bench_hash_image,
    bench_lsh_candidates,
    bench_hash_phase_end_to_end
);
criterion_main!(benches);
