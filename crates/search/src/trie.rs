// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

use std::collections::HashMap;

use model::ResourceId;

/// A prefix trie keyed on lowercased id. Every node along an id's path
/// carries that id in `ids`, so a lookup is an O(|query|) descent followed
/// by an already-materialized list — no subtree walk needed.
#[derive(Debug, Default)]
pub struct Trie {
    root: Node,
}

#[derive(Debug, Default)]
struct Node {
    children: HashMap<char, Node>,
    ids: Vec<ResourceId>,
}

impl Trie {
    pub fn insert(&mut self, id: &ResourceId) {
        let mut node = &mut self.root;
        node.ids.push(id.clone());
        for c in id.as_str().chars() {
            node = node.children.entry(c).or_default();
            node.ids.push(id.clone());
        }
    }

    pub fn remove(&mut self, id: &ResourceId) {
        self.root.ids.retain(|existing| existing != id);
        let mut node = &mut self.root;
        for c in id.as_str().chars() {
            let Some(next) = node.children.get_mut(&c) else { return };
            next.ids.retain(|existing| existing != id);
            node = next;
        }
    }

    /// All ids sharing `query` as a prefix, in insertion order.
    pub fn ids_with_prefix(&self, query: &str) -> &[ResourceId] {
        let mut node = &self.root;
        for c in query.chars() {
            match node.children.get(&c) {
                Some(next) => node = next,
                None => return &[],
            }
        }
        &node.ids
    }
}
