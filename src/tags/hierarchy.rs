use std::collections::HashMap;

use tracing::{debug, warn};

use super::model::{Forest, TagId, TagNode, TagRecord};

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum HierarchyError {
    #[error("tag {id} is part of a parent cycle")]
    Cycle { id: TagId },
}

/// Records whose parent is absent or unknown become roots. When two records
/// share an id, the later one is the one children attach to.
pub fn build_hierarchy(records: &[TagRecord]) -> Result<Forest, HierarchyError> {
    let mut by_id: HashMap<&TagId, usize> = HashMap::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        if by_id.insert(&record.id, idx).is_some() {
            warn!(id = %record.id, "duplicate tag id, later record wins parent lookup");
        }
    }

    let parents: Vec<Option<usize>> = records
        .iter()
        .map(|record| {
            record
                .parent_ref()
                .and_then(|parent| by_id.get(parent).copied())
        })
        .collect();

    find_cycle(records, &parents)?;

    let mut children = vec![Vec::new(); records.len()];
    let mut roots = Vec::new();
    for (idx, parent) in parents.iter().enumerate() {
        match parent {
            Some(parent) => children[*parent].push(idx),
            None => roots.push(idx),
        }
    }

    let forest = assemble(&roots, records, &children);
    debug!(records = records.len(), roots = forest.len(), "built tag hierarchy");
    Ok(forest)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unseen,
    OnPath,
    Settled,
}

// Each record has at most one parent, so a walk up the chain that meets its
// own path is the only way a cycle can show up.
fn find_cycle(records: &[TagRecord], parents: &[Option<usize>]) -> Result<(), HierarchyError> {
    let mut marks = vec![Mark::Unseen; parents.len()];
    let mut path = Vec::new();

    for start in 0..parents.len() {
        let mut cursor = Some(start);
        while let Some(idx) = cursor {
            match marks[idx] {
                Mark::Settled => break,
                Mark::OnPath => {
                    return Err(HierarchyError::Cycle {
                        id: records[idx].id.clone(),
                    })
                }
                Mark::Unseen => {
                    marks[idx] = Mark::OnPath;
                    path.push(idx);
                    cursor = parents[idx];
                }
            }
        }
        for idx in path.drain(..) {
            marks[idx] = Mark::Settled;
        }
    }
    Ok(())
}

// Post-order over an explicit stack: a node is built once all of its
// children are, so chain depth never reaches the call stack.
fn assemble(roots: &[usize], records: &[TagRecord], children: &[Vec<usize>]) -> Forest {
    let mut built: Vec<Option<TagNode>> = vec![None; records.len()];
    let mut stack: Vec<(usize, bool)> = roots.iter().rev().map(|&idx| (idx, false)).collect();

    while let Some((idx, ready)) = stack.pop() {
        if !ready {
            stack.push((idx, true));
            stack.extend(children[idx].iter().rev().map(|&child| (child, false)));
            continue;
        }
        let record = &records[idx];
        let kids = children[idx]
            .iter()
            .filter_map(|&child| built[child].take())
            .collect();
        built[idx] = Some(TagNode {
            id: record.id.clone(),
            name: record.name.clone(),
            icon: record.icon.clone(),
            sort_order: record.sort_order,
            children: sorted(kids),
        });
    }

    sorted(roots.iter().filter_map(|&idx| built[idx].take()).collect())
}

fn sorted(mut nodes: Vec<TagNode>) -> Vec<TagNode> {
    // `sort_by` is stable, ties keep input order.
    nodes.sort_by(|a, b| a.sort_key().total_cmp(&b.sort_key()));
    nodes
}
