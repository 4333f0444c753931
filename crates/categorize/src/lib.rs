// SPDX-FileCopyrightText: Copyright © 2020-2023 Serpent OS Developers
//
// SPDX-License-Identifier: MPL-2.0

//! Derives a hierarchical category tree from the structure of resource ids.
//! Pure with respect to I/O: every function here is a projection of its
//! input and two builds over the same resources produce structurally equal
//! trees (spec §4.2 invariant).

use std::collections::BTreeMap;

use model::{Category, Resource, ResourceId};

const GENERAL: &str = "general";

/// Split `id` on `-` into `{primary, secondary, full, tags}` (spec §4.2).
pub fn extract(id: &ResourceId) -> Category {
    let segments: Vec<&str> = id.segments().collect();

    if segments.len() <= 1 {
        return Category {
            primary: GENERAL.to_string(),
            secondary: None,
            full: GENERAL.to_string(),
            tags: vec![GENERAL.to_string()],
        };
    }

    let primary = segments[0].to_string();
    let secondary = segments.get(1).map(|s| s.to_string());
    let full = match &secondary {
        Some(secondary) => format!("{primary}-{secondary}"),
        None => primary.clone(),
    };
    let tags = segments.iter().take(3).map(|s| s.to_string()).collect();

    Category { primary, secondary, full, tags }
}

/// One node of a [`CategoryTree`]: the resources whose category is exactly
/// this node, its child category names, and a recursive resource count.
#[derive(Debug, Clone, Default)]
pub struct CategoryNode {
    pub name: String,
    pub resources: Vec<Resource>,
    pub children: Vec<String>,
    pub count: usize,
}

/// A derived, synthetic-rooted tree over a resource set's categories.
#[derive(Debug, Clone, Default)]
pub struct CategoryTree {
    /// Primary category names at the root, lexicographically sorted.
    pub roots: Vec<String>,
    nodes: BTreeMap<String, CategoryNode>,
}

impl CategoryTree {
    pub fn node(&self, name: &str) -> Option<&CategoryNode> {
        self.nodes.get(name)
    }

    /// Resources in `category_name` and every descendant category,
    /// lexicographically ordered by id (spec §4.2 tie-break).
    pub fn query(&self, category_name: &str) -> Vec<Resource> {
        let mut out = Vec::new();
        self.collect(category_name, &mut out);
        out.sort_by(|a, b| a.id.cmp(&b.id));
        out.dedup_by(|a, b| a.id == b.id);
        out
    }

    fn collect(&self, name: &str, out: &mut Vec<Resource>) {
        let Some(node) = self.nodes.get(name) else { return };
        out.extend(node.resources.iter().cloned());
        for child in &node.children {
            self.collect(child, out);
        }
    }
}

/// Build a [`CategoryTree`] over `resources`. Two builds over the same input
/// (in any order) produce structurally equal trees.
pub fn build_tree<'a>(resources: impl IntoIterator<Item = &'a Resource>) -> CategoryTree {
    let mut nodes: BTreeMap<String, CategoryNode> = BTreeMap::new();
    let mut roots = std::collections::BTreeSet::new();

    for resource in resources {
        let category = extract(&resource.id);

        roots.insert(category.primary.clone());

        let primary_node = nodes.entry(category.primary.clone()).or_insert_with(|| CategoryNode {
            name: category.primary.clone(),
            ..Default::default()
        });

        if category.secondary.is_none() {
            primary_node.resources.push(resource.clone());
        } else if !primary_node.children.contains(&category.full) {
            primary_node.children.push(category.full.clone());
        }

        if category.secondary.is_some() {
            let full_node = nodes.entry(category.full.clone()).or_insert_with(|| CategoryNode {
                name: category.full.clone(),
                ..Default::default()
            });
            full_node.resources.push(resource.clone());
        }
    }

    for node in nodes.values_mut() {
        node.resources.sort_by(|a, b| a.id.cmp(&b.id));
        node.children.sort();
    }

    let tree = CategoryTree { roots: roots.into_iter().collect(), nodes };
    recount(tree)
}

fn recount(mut tree: CategoryTree) -> CategoryTree {
    let names: Vec<String> = tree.nodes.keys().cloned().collect();
    for name in names {
        let count = count_of(&tree, &name);
        if let Some(node) = tree.nodes.get_mut(&name) {
            node.count = count;
        }
    }
    tree
}

fn count_of(tree: &CategoryTree, name: &str) -> usize {
    let Some(node) = tree.nodes.get(name) else { return 0 };
    node.resources.len() + node.children.iter().map(|c| count_of(tree, c)).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use model::{Kind, Source};

    fn resource(id: &str) -> Resource {
        Resource {
            id: ResourceId::parse(id).unwrap(),
            kind: Kind::Agent,
            name: id.to_string(),
            description: String::new(),
            summary: String::new(),
            version: "v1.0.0".to_string(),
            author: None,
            file_type: ".md".to_string(),
            source: Source {
                repo: "org/repo".to_string(),
                path: String::new(),
                url: url::Url::parse("https://raw.githubusercontent.com/org/repo/main/a.md").unwrap(),
            },
            install_path: format!("agents/{id}.md"),
            metadata: Default::default(),
            required: vec![],
            recommended: vec![],
        }
    }

    #[test]
    fn single_segment_is_general() {
        let category = extract(&ResourceId::parse("architect").unwrap());
        assert_eq!(category.primary, "general");
        assert_eq!(category.full, "general");
        assert_eq!(category.tags, vec!["general".to_string()]);
    }

    #[test]
    fn two_segments_derive_full() {
        let category = extract(&ResourceId::parse("code-archaeologist").unwrap());
        assert_eq!(category.primary, "code");
        assert_eq!(category.secondary.as_deref(), Some("archaeologist"));
        assert_eq!(category.full, "code-archaeologist");
    }

    #[test]
    fn tags_capped_at_three() {
        let category = extract(&ResourceId::parse("arch-linux-tuner-extra").unwrap());
        assert_eq!(category.tags, vec!["arch", "linux", "tuner"]);
    }

    #[test]
    fn extract_is_idempotent() {
        let id = ResourceId::parse("arch-linux-tuner").unwrap();
        assert_eq!(extract(&id), extract(&id));
    }

    #[test]
    fn build_tree_counts_descendants() {
        let resources = vec![resource("arch-linux-tuner"), resource("arch-mac-tuner"), resource("architect")];
        let tree = build_tree(&resources);

        assert_eq!(tree.node("arch").unwrap().count, 2);
        assert_eq!(tree.node("general").unwrap().count, 1);
        assert_eq!(tree.query("arch"), vec![resource("arch-linux-tuner"), resource("arch-mac-tuner")]);
    }

    #[test]
    fn build_tree_is_deterministic_across_orderings() {
        let a = vec![resource("arch-linux-tuner"), resource("architect")];
        let b = vec![resource("architect"), resource("arch-linux-tuner")];

        let tree_a = build_tree(&a);
        let tree_b = build_tree(&b);

        assert_eq!(tree_a.roots, tree_b.roots);
        assert_eq!(tree_a.query("arch"), tree_b.query("arch"));
    }
}
