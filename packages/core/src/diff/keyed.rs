//! Matching an old child list against a new one.
//!
//! Both lists are flattened first. A shared prefix is patched in place. In the rest of the list, every new child
//! looks for a partner among the old ones: keyed children by key, unkeyed children in order. Matched pairs keep their
//! host nodes. The longest increasing subsequence of the matched old indices is already in the right relative order
//! and stays put; every other matched child is moved and every unmatched one is created.

use super::{flatten, flatten_owned};
use crate::{
    arena::{NodeId, ScopeId},
    builder::ensure_unique_keys,
    nodes::{Key, VNode},
    surface::RenderSurface,
    virtual_dom::VirtualDom,
    Result,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

fn slot_key(slot: &Option<VNode>) -> Option<&Key> {
    slot.as_ref().and_then(VNode::key)
}

impl<R: RenderSurface> VirtualDom<R> {
    /// Reconcile two child lists that share the host parent `parent`.
    ///
    /// `anchor` is the host node right after the list, or `None` when the list runs to the end of `parent`.
    pub(crate) fn diff_children(
        &mut self,
        parent: NodeId,
        old: &[Option<VNode>],
        new: &[Option<VNode>],
        anchor: Option<NodeId>,
        owner: Option<ScopeId>,
    ) -> Result<()> {
        let old = flatten(old);
        let new = flatten_owned(new, owner);

        // Fail before the surface sees anything from this list
        ensure_unique_keys(&new)?;

        let prefix = self.diff_prefix(parent, &old, &new, anchor, owner)?;
        if prefix == old.len() && prefix == new.len() {
            return Ok(());
        }

        self.diff_keyed_middle(parent, &old[prefix..], &new[prefix..], anchor, owner)
    }

    /// Patch the leading slots whose keys agree. Unkeyed slots agree with unkeyed slots.
    fn diff_prefix(
        &mut self,
        parent: NodeId,
        old: &[Option<VNode>],
        new: &[Option<VNode>],
        anchor: Option<NodeId>,
        owner: Option<ScopeId>,
    ) -> Result<usize> {
        let mut idx = 0;
        while idx < old.len() && idx < new.len() && slot_key(&old[idx]) == slot_key(&new[idx]) {
            match (&old[idx], &new[idx]) {
                (Some(old_node), Some(new_node)) if old_node.same_shape(new_node) => {
                    self.diff_node(parent, old_node, new_node, owner)?;
                }
                (Some(old_node), Some(new_node)) => {
                    let after = self.reference_after(&old[idx + 1..], anchor);
                    self.replace_slot(parent, old_node, new_node, after, owner)?;
                }
                (None, Some(new_node)) => {
                    let reference = self.reference_after(&old[idx + 1..], anchor);
                    for id in self.create_node(new_node, parent, owner)? {
                        self.surface.insert_before(parent, id, reference);
                    }
                }
                (Some(old_node), None) => self.remove_slot(old_node)?,
                (None, None) => {}
            }
            idx += 1;
        }
        Ok(idx)
    }

    /// The first host node among `rest`, or `anchor` if none of them has one.
    fn reference_after(&self, rest: &[Option<VNode>], anchor: Option<NodeId>) -> Option<NodeId> {
        rest.iter()
            .flatten()
            .find_map(|next| self.first_host_node(next))
            .or(anchor)
    }

    fn diff_keyed_middle(
        &mut self,
        parent: NodeId,
        old: &[Option<VNode>],
        new: &[Option<VNode>],
        anchor: Option<NodeId>,
        owner: Option<ScopeId>,
    ) -> Result<()> {
        let mut keyed: FxHashMap<&Key, usize> = FxHashMap::default();
        let mut unkeyed = VecDeque::new();
        for (idx, node) in old.iter().enumerate() {
            if let Some(node) = node {
                match node.key() {
                    Some(key) => {
                        keyed.insert(key, idx);
                    }
                    None => unkeyed.push_back(idx),
                }
            }
        }

        // For every new slot, the old index whose host nodes it took over
        let mut sources: Vec<Option<usize>> = vec![None; new.len()];
        let mut consumed = vec![false; old.len()];

        for (new_idx, slot) in new.iter().enumerate() {
            let Some(new_node) = slot else { continue };
            let matched = match new_node.key() {
                Some(key) => keyed.remove(key),
                None => unkeyed.pop_front(),
            };
            let Some(old_idx) = matched else { continue };
            let Some(old_node) = &old[old_idx] else { continue };
            consumed[old_idx] = true;

            if old_node.same_shape(new_node) {
                self.diff_node(parent, old_node, new_node, owner)?;
                sources[new_idx] = Some(old_idx);
            } else {
                // A replaced partner does not keep its position. Drop it now, create fresh below.
                tracing::trace!(old_idx, new_idx, "matched child changed shape");
                self.remove_slot(old_node)?;
            }
        }

        for (old_idx, slot) in old.iter().enumerate() {
            if let (false, Some(old_node)) = (consumed[old_idx], slot) {
                self.remove_slot(old_node)?;
            }
        }

        let stays = plan_stays(&sources);

        // Back to front, so every child can be placed before the one after it
        let mut reference = anchor;
        for (new_idx, slot) in new.iter().enumerate().rev() {
            let Some(new_node) = slot else { continue };

            match sources[new_idx] {
                None => {
                    for id in self.create_node(new_node, parent, owner)? {
                        self.surface.insert_before(parent, id, reference);
                    }
                }
                Some(_) if !stays[new_idx] => {
                    tracing::trace!(new_idx, "moving child");
                    for id in self.host_nodes(new_node) {
                        self.surface.insert_before(parent, id, reference);
                    }
                }
                Some(_) => {}
            }

            if let Some(first) = self.first_host_node(new_node) {
                reference = Some(first);
            }
        }

        Ok(())
    }
}

/// Which new slots can keep their host nodes where they are: the ones whose old indices form the longest increasing
/// subsequence of the matched indices.
fn plan_stays(sources: &[Option<usize>]) -> Vec<bool> {
    let matched: Vec<usize> = sources.iter().flatten().copied().collect();

    let mut in_lis = FxHashSet::default();
    in_lis.reserve(matched.len());
    let mut predecessors = vec![0; matched.len()];
    let mut starts = vec![0; matched.len()];
    longest_increasing_subsequence::lis_with(
        &matched,
        &mut in_lis,
        |a, b| a < b,
        &mut predecessors,
        &mut starts,
    );

    let mut position = 0;
    sources
        .iter()
        .map(|source| match source {
            Some(_) => {
                let stays = in_lis.contains(&position);
                position += 1;
                stays
            }
            None => false,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::plan_stays;

    fn moves(sources: &[Option<usize>]) -> usize {
        let stays = plan_stays(sources);
        sources
            .iter()
            .zip(stays)
            .filter(|(source, stays)| source.is_some() && !stays)
            .count()
    }

    #[test]
    fn sorted_matches_never_move() {
        assert_eq!(moves(&[Some(0), Some(1), Some(2)]), 0);
        assert_eq!(moves(&[Some(0), None, Some(2)]), 0);
        assert_eq!(moves(&[]), 0);
    }

    #[test]
    fn only_entries_outside_the_lis_move() {
        // [1, 2, 3, 4, 5, 6] -> [2, 4, 1, 5, 3, 6]
        assert_eq!(
            moves(&[Some(1), Some(3), Some(0), Some(4), Some(2), Some(5)]),
            2
        );
        // full reversal keeps one in place
        assert_eq!(moves(&[Some(3), Some(2), Some(1), Some(0)]), 3);
    }

    #[test]
    fn unmatched_slots_never_stay() {
        let stays = plan_stays(&[None, Some(1), Some(0)]);
        assert!(!stays[0]);
        assert_eq!(stays.iter().filter(|s| **s).count(), 1);
    }
}
