use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagId {
    Int(i64),
    Text(String),
}

impl TagId {
    /// `0` and `""` never name a parent.
    pub fn is_unset(&self) -> bool {
        match self {
            TagId::Int(n) => *n == 0,
            TagId::Text(s) => s.is_empty(),
        }
    }
}

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagId::Int(n) => write!(f, "{n}"),
            TagId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for TagId {
    fn from(value: i64) -> Self {
        TagId::Int(value)
    }
}

impl From<&str> for TagId {
    fn from(value: &str) -> Self {
        TagId::Text(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagRecord {
    pub id: TagId,
    #[serde(default)]
    pub parent: Option<TagId>,
    pub name: String,
    #[serde(default)]
    pub sort_order: Option<f64>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl TagRecord {
    pub fn new(id: impl Into<TagId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            parent: None,
            name: name.into(),
            sort_order: None,
            icon: None,
        }
    }

    pub fn with_parent(mut self, parent: impl Into<TagId>) -> Self {
        self.parent = Some(parent.into());
        self
    }

    pub fn with_sort_order(mut self, sort_order: f64) -> Self {
        self.sort_order = Some(sort_order);
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }

    pub fn parent_ref(&self) -> Option<&TagId> {
        self.parent.as_ref().filter(|parent| !parent.is_unset())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TagNode {
    pub id: TagId,
    pub name: String,
    pub icon: Option<String>,
    pub sort_order: Option<f64>,
    pub children: Vec<TagNode>,
}

impl TagNode {
    pub(crate) fn sort_key(&self) -> f64 {
        self.sort_order.unwrap_or(0.0)
    }
}

// Parent chains can be thousands of levels deep; unlink them iteratively.
impl Drop for TagNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut node) = pending.pop() {
            pending.append(&mut node.children);
        }
    }
}

pub type Forest = Vec<TagNode>;

pub fn count_nodes(forest: &[TagNode]) -> usize {
    let mut pending: Vec<&TagNode> = forest.iter().collect();
    let mut count = 0;
    while let Some(node) = pending.pop() {
        count += 1;
        pending.extend(node.children.iter());
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_blinko_tag_shape() {
        let json = r#"{"id":7,"name":"work","parent":0,"sortOrder":3,"icon":"💼","createdAt":"x"}"#;
        let record: TagRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id, TagId::Int(7));
        assert_eq!(record.parent, Some(TagId::Int(0)));
        assert_eq!(record.parent_ref(), None);
        assert_eq!(record.sort_order, Some(3.0));
        assert_eq!(record.icon.as_deref(), Some("💼"));
    }

    #[test]
    fn null_and_missing_optionals_are_absent() {
        let record: TagRecord =
            serde_json::from_str(r#"{"id":"a","name":"x","parent":null,"sortOrder":null}"#)
                .unwrap();
        assert_eq!(record.id, TagId::Text("a".to_string()));
        assert_eq!(record.parent_ref(), None);
        assert_eq!(record.sort_order, None);
        assert_eq!(record.icon, None);
    }
}
