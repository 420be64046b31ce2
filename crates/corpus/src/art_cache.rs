//! Bounded LRU cache of decoded cover art.
//!
//! Consumers that re-render matched covers (result cards, previews) hit the
//! same few images repeatedly; decoding them every time is wasteful, while an
//! unbounded memo grows with the catalog for the lifetime of the process.
//! This is a small hand-rolled LRU with a configurable capacity, independent
//! of any caching library.

use std::collections::{HashMap, VecDeque};

use image::DynamicImage;

pub(crate) struct ArtCache {
    capacity: usize,
    map: HashMap<String, DynamicImage>,
    // Front = least recently used.
    order: VecDeque<String>,
}

impl ArtCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&mut self, cover_id: &str) -> Option<DynamicImage> {
        let img = self.map.get(cover_id)?.clone();
        self.touch(cover_id);
        Some(img)
    }

    pub fn insert(&mut self, cover_id: String, img: DynamicImage) {
        if self.capacity == 0 {
            return;
        }
        if self.map.insert(cover_id.clone(), img).is_some() {
            self.touch(&cover_id);
            return;
        }
        self.order.push_back(cover_id);
        while self.map.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.map.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    fn touch(&mut self, cover_id: &str) {
        if let Some(pos) = self.order.iter().position(|id| id == cover_id) {
            let id = self.order.remove(pos).expect("position is in range");
            self.order.push_back(id);
        }
    }
}
