// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! A multi-strategy search index over a resource set: exact id lookup, a
//! prefix trie, an inverted word index over id/name/description tokens, and
//! a fuzzy weighted-ratio scorer, combined by "smart" mode.

mod fuzzy;
mod trie;

use std::collections::{HashMap, HashSet, VecDeque};

use model::{MatchKind, Resource, ResourceId, SearchHit};

use crate::trie::Trie;

pub const DEFAULT_FUZZY_THRESHOLD: u8 = 60;
const PREFIX_SCORE: u8 = 90;
const EXACT_SCORE: u8 = 100;
const FUZZY_MEMO_CAP: usize = 32;

/// Which strategy (or combination) [`Index::search`] should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Exact,
    Prefix,
    Fuzzy,
    /// Union of all three, deduplicated by id keeping the max score.
    Smart,
}

/// An in-memory search index. Rebuilding replaces every internal structure
/// atomically from the caller's point of view: readers only ever observe the
/// index through `&mut self`, so a rebuild in progress is never visible.
#[derive(Debug, Default)]
pub struct Index {
    exact: HashMap<ResourceId, Resource>,
    trie: Trie,
    word_index: HashMap<String, HashSet<ResourceId>>,
    id_tokens: HashMap<ResourceId, HashSet<String>>,
    memo: FuzzyMemo,
}

#[derive(Debug, Default)]
struct FuzzyMemo {
    entries: HashMap<(String, u8), Vec<SearchHit>>,
    order: VecDeque<(String, u8)>,
}

impl FuzzyMemo {
    fn get(&self, key: &(String, u8)) -> Option<&Vec<SearchHit>> {
        self.entries.get(key)
    }

    fn insert(&mut self, key: (String, u8), value: Vec<SearchHit>) {
        if !self.entries.contains_key(&key) {
            self.order.push_back(key.clone());
            if self.order.len() > FUZZY_MEMO_CAP {
                if let Some(oldest) = self.order.pop_front() {
                    self.entries.remove(&oldest);
                }
            }
        }
        self.entries.insert(key, value);
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric()).filter(|s| !s.is_empty()).map(|s| s.to_lowercase())
}

impl Index {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entire index contents in one pass.
    pub fn rebuild(&mut self, resources: impl IntoIterator<Item = Resource>) {
        self.exact.clear();
        self.trie = Trie::default();
        self.word_index.clear();
        self.id_tokens.clear();
        for resource in resources {
            self.insert_unchecked(resource);
        }
        self.memo.clear();
    }

    pub fn add(&mut self, resource: Resource) {
        self.remove(&resource.id.clone());
        self.insert_unchecked(resource);
        self.memo.clear();
    }

    pub fn remove(&mut self, id: &ResourceId) {
        if self.exact.remove(id).is_some() {
            self.trie.remove(id);
            if let Some(tokens) = self.id_tokens.remove(id) {
                for token in tokens {
                    if let Some(set) = self.word_index.get_mut(&token) {
                        set.remove(id);
                        if set.is_empty() {
                            self.word_index.remove(&token);
                        }
                    }
                }
            }
        }
        self.memo.clear();
    }

    fn insert_unchecked(&mut self, resource: Resource) {
        let id = resource.id.clone();
        let mut tokens = HashSet::new();
        for token in tokenize(id.as_str()).chain(tokenize(&resource.name)).chain(tokenize(&resource.description)) {
            self.word_index.entry(token.clone()).or_default().insert(id.clone());
            tokens.insert(token);
        }
        self.id_tokens.insert(id.clone(), tokens);
        self.trie.insert(&id);
        self.exact.insert(id, resource);
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }

    pub fn search(&mut self, query: &str, mode: Mode, limit: usize, threshold: u8) -> Vec<SearchHit> {
        match mode {
            Mode::Exact => self.exact_hit(query).into_iter().collect(),
            Mode::Prefix => self.prefix_hits(query, limit),
            Mode::Fuzzy => {
                let mut hits = self.fuzzy_hits(query, threshold);
                if limit > 0 {
                    hits.truncate(limit);
                }
                hits
            }
            Mode::Smart => self.smart_hits(query, limit, threshold),
        }
    }

    fn exact_hit(&self, query: &str) -> Option<SearchHit> {
        let id = ResourceId::parse(query.to_lowercase()).ok()?;
        let resource = self.exact.get(&id)?.clone();
        Some(SearchHit { resource, score: EXACT_SCORE, match_kind: MatchKind::Exact, highlights: vec![] })
    }

    fn prefix_hits(&self, query: &str, limit: usize) -> Vec<SearchHit> {
        let query = query.to_lowercase();
        let mut hits: Vec<SearchHit> = self
            .trie
            .ids_with_prefix(&query)
            .iter()
            .filter_map(|id| self.exact.get(id).cloned())
            .map(|resource| SearchHit { resource, score: PREFIX_SCORE, match_kind: MatchKind::Prefix, highlights: vec![] })
            .collect();
        hits.sort_by(|a, b| a.resource.id.cmp(&b.resource.id));
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    }

    /// Scores every id against `query`, then every known word-index token
    /// against `query`, keeping the max per resource. Memoized by
    /// `(query, threshold)`; any mutation invalidates the whole cache.
    fn fuzzy_hits(&mut self, query: &str, threshold: u8) -> Vec<SearchHit> {
        let key = (query.to_lowercase(), threshold);
        if let Some(cached) = self.memo.get(&key) {
            return cached.clone();
        }

        let mut best: HashMap<ResourceId, u8> = HashMap::new();
        for id in self.exact.keys() {
            best.insert(id.clone(), fuzzy::ratio(&key.0, id.as_str()));
        }
        for (token, ids) in &self.word_index {
            let score = fuzzy::ratio(&key.0, token);
            if score == 0 {
                continue;
            }
            for id in ids {
                let entry = best.entry(id.clone()).or_insert(0);
                if score > *entry {
                    *entry = score;
                }
            }
        }

        let mut hits: Vec<SearchHit> = best
            .into_iter()
            .filter(|(_, score)| *score >= threshold)
            .filter_map(|(id, score)| {
                self.exact.get(&id).cloned().map(|resource| SearchHit { resource, score, match_kind: MatchKind::Fuzzy, highlights: vec![] })
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.resource.id.cmp(&b.resource.id)));

        self.memo.insert(key, hits.clone());
        hits
    }

    /// Union of exact/prefix/fuzzy, deduplicated by id keeping the max
    /// score. An empty query returns every resource in id order.
    fn smart_hits(&mut self, query: &str, limit: usize, threshold: u8) -> Vec<SearchHit> {
        if query.trim().is_empty() {
            let mut all: Vec<SearchHit> = self
                .exact
                .values()
                .cloned()
                .map(|resource| SearchHit { resource, score: 0, match_kind: MatchKind::Fuzzy, highlights: vec![] })
                .collect();
            all.sort_by(|a, b| a.resource.id.cmp(&b.resource.id));
            if limit > 0 {
                all.truncate(limit);
            }
            return all;
        }

        let mut best: HashMap<ResourceId, SearchHit> = HashMap::new();
        let mut merge = |hit: SearchHit, best: &mut HashMap<ResourceId, SearchHit>| match best.get(&hit.resource.id) {
            Some(existing) if existing.score >= hit.score => {}
            _ => {
                best.insert(hit.resource.id.clone(), hit);
            }
        };

        if let Some(hit) = self.exact_hit(query) {
            merge(hit, &mut best);
        }
        for hit in self.prefix_hits(query, 0) {
            merge(hit, &mut best);
        }
        for hit in self.fuzzy_hits(query, threshold) {
            merge(hit, &mut best);
        }

        let mut hits: Vec<SearchHit> = best.into_values().collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.resource.id.cmp(&b.resource.id)));
        if limit > 0 {
            hits.truncate(limit);
        }
        hits
    }
}
