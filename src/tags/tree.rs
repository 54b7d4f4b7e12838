use std::collections::BTreeSet;
use std::fmt::Write as _;

use super::model::{TagId, TagNode};

pub const INDENT_PER_LEVEL_PX: u32 = 20;
pub const AFFORDANCE_WIDTH_PX: u32 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeKey(usize);

impl NodeKey {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Expansion {
    #[default]
    Collapsed,
    Expanded,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Affordance {
    Expander(Expansion),
    Spacer,
}

impl Affordance {
    pub fn glyph(self) -> &'static str {
        match self {
            Affordance::Expander(Expansion::Collapsed) => "▶",
            Affordance::Expander(Expansion::Expanded) => "▼",
            Affordance::Spacer => "",
        }
    }
}

#[derive(Clone, Debug)]
struct TreeEntry {
    id: TagId,
    name: String,
    icon: Option<String>,
    path: String,
    depth: usize,
    parent: Option<NodeKey>,
    children: Vec<NodeKey>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TreeRow<'a> {
    pub key: NodeKey,
    pub id: &'a TagId,
    pub depth: usize,
    pub indent_px: u32,
    pub affordance: Affordance,
    pub active: bool,
    pub icon: Option<&'a str>,
    pub name: &'a str,
    pub path: &'a str,
}

pub trait TreeRenderer {
    type Output;

    fn empty(&mut self) -> Self::Output;

    fn rows(&mut self, rows: Vec<TreeRow<'_>>) -> Self::Output;
}

#[derive(Clone, Debug, Default)]
pub struct TagTree {
    entries: Vec<TreeEntry>,
    roots: Vec<NodeKey>,
    expanded: BTreeSet<NodeKey>,
}

impl TagTree {
    pub fn from_forest(forest: &[TagNode]) -> Self {
        let mut tree = Self::default();
        let mut stack: Vec<(&TagNode, Option<NodeKey>, usize)> =
            forest.iter().rev().map(|node| (node, None, 0)).collect();

        // Preorder: children are pushed reversed so they pop in order.
        while let Some((node, parent, depth)) = stack.pop() {
            let key = NodeKey(tree.entries.len());
            let path = match parent {
                Some(parent) => format!("{}/{}", tree.entries[parent.0].path, node.name),
                None => node.name.clone(),
            };
            tree.entries.push(TreeEntry {
                id: node.id.clone(),
                name: node.name.clone(),
                icon: node.icon.clone(),
                path,
                depth,
                parent,
                children: Vec::with_capacity(node.children.len()),
            });
            match parent {
                Some(parent) => tree.entries[parent.0].children.push(key),
                None => tree.roots.push(key),
            }
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .map(|child| (child, Some(key), depth + 1)),
            );
        }
        tree
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = NodeKey> {
        (0..self.entries.len()).map(NodeKey)
    }

    pub fn roots(&self) -> &[NodeKey] {
        &self.roots
    }

    pub fn path(&self, key: NodeKey) -> Option<&str> {
        self.entries.get(key.0).map(|entry| entry.path.as_str())
    }

    pub fn find_path(&self, path: &str) -> Option<NodeKey> {
        self.entries
            .iter()
            .position(|entry| entry.path == path)
            .map(NodeKey)
    }

    pub fn has_children(&self, key: NodeKey) -> bool {
        self.entries
            .get(key.0)
            .is_some_and(|entry| !entry.children.is_empty())
    }

    pub fn expansion(&self, key: NodeKey) -> Expansion {
        if self.expanded.contains(&key) {
            Expansion::Expanded
        } else {
            Expansion::Collapsed
        }
    }

    /// Flips one node. Leaves have nothing to reveal and return `None`.
    pub fn toggle(&mut self, key: NodeKey) -> Option<Expansion> {
        if !self.has_children(key) {
            return None;
        }
        if self.expanded.remove(&key) {
            Some(Expansion::Collapsed)
        } else {
            self.expanded.insert(key);
            Some(Expansion::Expanded)
        }
    }

    pub fn expand_all(&mut self) {
        let parents: Vec<NodeKey> = self.keys().filter(|key| self.has_children(*key)).collect();
        self.expanded.extend(parents);
    }

    pub fn collapse_all(&mut self) {
        self.expanded.clear();
    }

    fn is_visible(&self, key: NodeKey) -> bool {
        let mut cursor = self.entries[key.0].parent;
        while let Some(parent) = cursor {
            if !self.expanded.contains(&parent) {
                return false;
            }
            cursor = self.entries[parent.0].parent;
        }
        true
    }

    pub fn visible_rows(&self) -> Vec<TreeRow<'_>> {
        self.keys()
            .filter(|key| self.is_visible(*key))
            .map(|key| self.row(key))
            .collect()
    }

    fn row(&self, key: NodeKey) -> TreeRow<'_> {
        let entry = &self.entries[key.0];
        let expansion = self.expansion(key);
        let affordance = if entry.children.is_empty() {
            Affordance::Spacer
        } else {
            Affordance::Expander(expansion)
        };
        TreeRow {
            key,
            id: &entry.id,
            depth: entry.depth,
            indent_px: entry.depth as u32 * INDENT_PER_LEVEL_PX,
            affordance,
            active: expansion == Expansion::Expanded,
            icon: entry.icon.as_deref(),
            name: &entry.name,
            path: &entry.path,
        }
    }

    pub fn render<R: TreeRenderer>(&self, renderer: &mut R) -> R::Output {
        if self.is_empty() {
            renderer.empty()
        } else {
            renderer.rows(self.visible_rows())
        }
    }
}

#[derive(Debug, Default)]
pub struct OutlineRenderer;

impl TreeRenderer for OutlineRenderer {
    type Output = String;

    fn empty(&mut self) -> String {
        "(no tags)".to_string()
    }

    fn rows(&mut self, rows: Vec<TreeRow<'_>>) -> String {
        let mut out = String::new();
        for row in rows {
            let glyph = match row.affordance {
                Affordance::Spacer => " ",
                expander => expander.glyph(),
            };
            let _ = write!(out, "{:indent$}{glyph} ", "", indent = row.depth * 2);
            if let Some(icon) = row.icon {
                let _ = write!(out, "{icon} ");
            }
            out.push_str(row.name);
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags::hierarchy::build_hierarchy;
    use crate::tags::model::TagRecord;
    use pretty_assertions::assert_eq;

    fn sample_tree() -> TagTree {
        let records = vec![
            TagRecord::new(1, "work"),
            TagRecord::new(2, "urgent").with_parent(1).with_sort_order(2.0),
            TagRecord::new(3, "deadline").with_parent(1).with_sort_order(1.0),
            TagRecord::new(4, "today").with_parent(3),
            TagRecord::new(5, "life").with_icon("🌱"),
            TagRecord::new(6, "today").with_parent(5),
        ];
        TagTree::from_forest(&build_hierarchy(&records).unwrap())
    }

    #[test]
    fn computes_full_paths_top_down() {
        let tree = sample_tree();
        let paths: Vec<&str> = tree.keys().filter_map(|key| tree.path(key)).collect();
        assert_eq!(
            paths,
            vec![
                "work",
                "work/deadline",
                "work/deadline/today",
                "work/urgent",
                "life",
                "life/today",
            ]
        );
    }

    #[test]
    fn three_level_chain_path() {
        let records = vec![
            TagRecord::new("c", "C").with_parent("b"),
            TagRecord::new("b", "B").with_parent("a"),
            TagRecord::new("a", "A"),
        ];
        let tree = TagTree::from_forest(&build_hierarchy(&records).unwrap());
        assert!(tree.find_path("A/B/C").is_some());
    }

    #[test]
    fn starts_collapsed_with_only_roots_visible() {
        let tree = sample_tree();
        let rows = tree.visible_rows();
        let names: Vec<&str> = rows.iter().map(|row| row.name).collect();
        assert_eq!(names, vec!["work", "life"]);
        assert!(tree.keys().all(|key| tree.expansion(key) == Expansion::Collapsed));
    }

    #[test]
    fn double_toggle_restores_state() {
        let mut tree = sample_tree();
        let work = tree.roots()[0];
        assert_eq!(tree.toggle(work), Some(Expansion::Expanded));
        assert!(tree.visible_rows()[0].active);
        assert_eq!(tree.toggle(work), Some(Expansion::Collapsed));
        assert_eq!(tree.expansion(work), Expansion::Collapsed);
        assert!(!tree.visible_rows()[0].active);
    }

    #[test]
    fn toggle_is_independent_per_node() {
        let mut tree = sample_tree();
        let work = tree.roots()[0];
        let life = tree.roots()[1];
        tree.toggle(work);
        tree.toggle(life);
        tree.toggle(work);
        assert_eq!(tree.expansion(work), Expansion::Collapsed);
        assert_eq!(tree.expansion(life), Expansion::Expanded);
    }

    #[test]
    fn toggling_a_leaf_does_nothing() {
        let mut tree = sample_tree();
        let leaf = tree.find_path("work/urgent").unwrap();
        assert_eq!(tree.toggle(leaf), None);
        assert_eq!(tree.expansion(leaf), Expansion::Collapsed);
    }

    #[test]
    fn expand_all_then_collapse_all_leaves_everything_collapsed() {
        let mut tree = sample_tree();
        let deadline = tree.find_path("work/deadline").unwrap();
        tree.toggle(deadline);

        tree.expand_all();
        assert_eq!(tree.visible_rows().len(), tree.len());
        tree.expand_all();
        assert_eq!(tree.visible_rows().len(), tree.len());

        tree.collapse_all();
        assert!(tree.keys().all(|key| tree.expansion(key) == Expansion::Collapsed));
        assert_eq!(tree.visible_rows().len(), 2);
    }

    #[test]
    fn collapsed_ancestor_hides_expanded_descendant() {
        let mut tree = sample_tree();
        let work = tree.roots()[0];
        let deadline = tree.find_path("work/deadline").unwrap();
        tree.toggle(deadline);
        let names: Vec<&str> = tree.visible_rows().iter().map(|row| row.name).collect();
        assert_eq!(names, vec!["work", "life"]);

        tree.toggle(work);
        let names: Vec<&str> = tree.visible_rows().iter().map(|row| row.name).collect();
        assert_eq!(names, vec!["work", "deadline", "today", "urgent", "life"]);
    }

    #[test]
    fn rows_indent_by_depth_and_align_leaves() {
        let mut tree = sample_tree();
        tree.expand_all();
        let rows = tree.visible_rows();
        let today = rows.iter().find(|row| row.path == "work/deadline/today").unwrap();
        assert_eq!(today.indent_px, 2 * INDENT_PER_LEVEL_PX);
        assert_eq!(today.affordance, Affordance::Spacer);
        assert_eq!(rows[0].affordance, Affordance::Expander(Expansion::Expanded));
    }

    #[test]
    fn outline_renders_expanders_and_spacers() {
        let mut tree = sample_tree();
        let work = tree.roots()[0];
        tree.toggle(work);
        let outline = tree.render(&mut OutlineRenderer);
        assert_eq!(
            outline,
            "▼ work\n  ▶ deadline\n    urgent\n▶ 🌱 life\n"
        );
    }

    #[test]
    fn empty_tree_renders_placeholder() {
        let tree = TagTree::from_forest(&[]);
        assert_eq!(tree.render(&mut OutlineRenderer), "(no tags)");
    }

    #[test]
    fn flattens_very_deep_chains() {
        const DEPTH: usize = 3_000;
        let records: Vec<TagRecord> = (1..=DEPTH as i64)
            .map(|id| {
                let record = TagRecord::new(id, "n");
                if id > 1 {
                    record.with_parent(id - 1)
                } else {
                    record
                }
            })
            .collect();
        let mut tree = TagTree::from_forest(&build_hierarchy(&records).unwrap());

        assert_eq!(tree.len(), DEPTH);
        assert_eq!(tree.roots().len(), 1);
        let deepest = NodeKey(DEPTH - 1);
        assert_eq!(tree.path(deepest).map(|path| path.split('/').count()), Some(DEPTH));

        tree.expand_all();
        let rows = tree.visible_rows();
        assert_eq!(rows.len(), DEPTH);
        assert_eq!(rows[DEPTH - 1].depth, DEPTH - 1);
        assert_eq!(rows[DEPTH - 1].affordance, Affordance::Spacer);
    }
}
