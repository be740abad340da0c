//! An append-only, fixed-depth binary Merkle tree over a generic hasher and
//! generic transactional storage.
//!
//! Four stores back one tree (names are prefixed with the tree's own name so
//! several trees can share a [`Database`]):
//!
//! - `counters`: the running leaf count and the next node index to hand out.
//! - `leaves`: `leaf index -> LeafRecord` (the element, its hash, and its
//!   current parent's node index).
//! - `leaves_index`: `hash -> leaf index`, for O(1) membership checks.
//! - `nodes`: `node index -> NodeRecord`, the index-linked internal nodes,
//!   threaded by `parent_index` (a `Left` node points up at its parent) and
//!   `left_index` (a `Right` node points sideways at its paired sibling,
//!   whose own `parent_index` is the pair's shared parent).
//!
//! `add_leaf` eagerly maintains that linked structure: appending leaf `i`
//! walks up from `i - 1`'s current parent only as far as the levels that
//! close on this insert (exactly the trailing-zero-bit count of `i + 1`,
//! the classic binary-counter carry), allocating fresh placeholder nodes for
//! whichever levels are still opening, then a single pass back down from the
//! new leaf recombines the right spine with real hashes. Historical queries
//! (`past_root`, `witness`) walk that same linked structure starting from a
//! specific leaf's `parent_index`, capped at the depth `past_size` had
//! reached — never the whole tree — so a later insert or truncation can
//! never change what an earlier query observes. `DESIGN.md` has the
//! reasoning, including the one subtlety this walk has to guard against: a
//! `Left` node's `hash_of_sibling` keeps getting overwritten by later
//! inserts for as long as its own pairing stays open, so a historical walk
//! may not always trust it directly.

mod hash_key;
mod leaf;
mod node;

#[cfg(test)]
mod tests;

pub use leaf::LeafRecord;
pub use node::NodeRecord;

use self::hash_key::HashKeyEncoding;
use self::leaf::LeafEncoding;
use self::node::NodeEncoding;
use crate::encoding::{StringEncoding, U32BEEncoding};
use crate::error::TreeError;
use crate::hasher::{HashableElement, MerkleHasher};
use crate::storage::{Database, Store, Transaction};
use crate::witness::{Side, Witness, WitnessNode};
use std::collections::HashMap;
use std::sync::Arc;

type Hash<H> = <<H as MerkleHasher>::Element as HashableElement>::Hash;

const LEAVES_COUNTER_KEY: &str = "leaves";
const NODES_COUNTER_KEY: &str = "nodes";

/// The depth of the unpadded root built from `n` leaves: `0` for an empty
/// tree, `1` for a single leaf (no combining has happened yet), and
/// `floor(log2(n - 1)) + 2` beyond that. Used by `past_root` and `witness`
/// to know how many levels of top-level self-padding (duplicating the root
/// up to the tree's fixed depth) a historical query still needs.
pub fn depth_at_leaf_count(n: u32) -> u32 {
    match n {
        0 => 0,
        1 => 1,
        n => 33 - (n - 1).leading_zeros(),
    }
}

/// The nodes visited ascending from a leaf's parent up to (but not
/// including) a historical root, together with the running combined hash
/// the ascent held just before visiting each one. The running values are
/// what let a sibling query merge safely onto this chain partway up: they
/// are exactly the values this same ascent would have produced at that
/// depth, with no dependency on anything a later insert might have
/// overwritten.
struct Ascend<H: MerkleHasher> {
    nodes: Vec<(u32, NodeRecord<H>)>,
    running_values: Vec<Hash<H>>,
}

pub struct MerkleTree<H: MerkleHasher> {
    hasher: Arc<H>,
    db: Database,
    depth: u32,
    default_hash: Hash<H>,
    counters: Store<String, u32, StringEncoding, U32BEEncoding>,
    leaves: Store<u32, LeafRecord<H>, U32BEEncoding, LeafEncoding<H>>,
    leaves_index: Store<Hash<H>, u32, HashKeyEncoding<H>, U32BEEncoding>,
    nodes: Store<u32, NodeRecord<H>, U32BEEncoding, NodeEncoding<H>>,
}

impl<H: MerkleHasher> MerkleTree<H> {
    /// Open (registering its stores if this is a fresh database) a tree
    /// named `name` with a maximum depth of `depth` levels. `default_hash`
    /// fills the `hash_of_sibling` slot of a node whose real pairing hasn't
    /// happened yet; it's never read before the same insertion's own
    /// rehash pass overwrites it.
    pub fn new(
        db: Database,
        name: &str,
        hasher: Arc<H>,
        depth: u32,
        default_hash: Hash<H>,
    ) -> Result<Self, TreeError> {
        let counters = db.add_store(&format!("{}_counters", name), StringEncoding, U32BEEncoding, false)?;
        let leaves = db.add_store(
            &format!("{}_leaves", name),
            U32BEEncoding,
            LeafEncoding::new(hasher.clone()),
            false,
        )?;
        let leaves_index = db.add_store(
            &format!("{}_leaves_index", name),
            HashKeyEncoding::new(hasher.clone()),
            U32BEEncoding,
            false,
        )?;
        let nodes = db.add_store(
            &format!("{}_nodes", name),
            U32BEEncoding,
            NodeEncoding::new(hasher.clone()),
            false,
        )?;
        Ok(MerkleTree {
            hasher,
            db,
            depth,
            default_hash,
            counters,
            leaves,
            leaves_index,
            nodes,
        })
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// The current number of leaves in the tree.
    pub fn size(&self) -> Result<u32, TreeError> {
        Ok(self.counters.get(&LEAVES_COUNTER_KEY.to_string(), None)?.unwrap_or(0))
    }

    fn leaves_count(&self, tx: &mut Transaction) -> Result<u32, TreeError> {
        Ok(self
            .counters
            .get(&LEAVES_COUNTER_KEY.to_string(), Some(&mut *tx))?
            .unwrap_or(0))
    }

    fn set_leaves_count(&self, tx: &mut Transaction, count: u32) -> Result<(), TreeError> {
        self.counters.put(&LEAVES_COUNTER_KEY.to_string(), &count, Some(&mut *tx))?;
        Ok(())
    }

    fn set_nodes_count(&self, tx: &mut Transaction, count: u32) -> Result<(), TreeError> {
        self.counters.put(&NODES_COUNTER_KEY.to_string(), &count, Some(&mut *tx))?;
        Ok(())
    }

    fn next_node_index(&self, tx: &mut Transaction) -> Result<u32, TreeError> {
        let current = self.counters.get(&NODES_COUNTER_KEY.to_string(), Some(&mut *tx))?.unwrap_or(0);
        let next = current + 1;
        self.set_nodes_count(tx, next)?;
        Ok(next)
    }

    /// Append `element` as the next leaf, opening and committing its own
    /// transaction.
    pub fn add_leaf(&self, element: H::Element) -> Result<u32, TreeError> {
        let mut tx = self.db.transaction()?;
        let result = self.add_leaf_in(&mut tx, element);
        match result {
            Ok(index) => {
                tx.commit()?;
                Ok(index)
            }
            Err(e) => {
                tx.abort();
                Err(e)
            }
        }
    }

    /// Append `element` within a caller-managed transaction.
    pub fn add_leaf_in(&self, tx: &mut Transaction, element: H::Element) -> Result<u32, TreeError> {
        let leaf_index = self.leaves_count(tx)?;
        if (leaf_index as u64) + 1 > (1u64 << self.depth) {
            return Err(TreeError::TreeFull(self.depth));
        }
        let hash = self.hasher.hash(&element);

        let parent_index = if leaf_index == 0 {
            0
        } else if leaf_index == 1 {
            let node_index = self.next_node_index(tx)?;
            self.nodes.put(
                &node_index,
                &NodeRecord::Left {
                    hash_of_sibling: self.default_hash.clone(),
                    parent_index: 0,
                },
                Some(&mut *tx),
            )?;
            let mut leaf0 = self.leaves.get(&0, Some(&mut *tx))?.ok_or(TreeError::NoLeafFound(0))?;
            leaf0.parent_index = node_index;
            self.leaves.put(&0, &leaf0, Some(&mut *tx))?;
            node_index
        } else if leaf_index % 2 == 1 {
            let prev = self
                .leaves
                .get(&(leaf_index - 1), Some(&mut *tx))?
                .ok_or(TreeError::NoLeafFound(leaf_index - 1))?;
            prev.parent_index
        } else {
            self.open_right_spine(tx, leaf_index)?
        };

        let leaf = LeafRecord {
            element,
            merkle_hash: hash.clone(),
            parent_index,
        };
        self.leaves.put(&leaf_index, &leaf, Some(&mut *tx))?;
        self.leaves_index.put(&hash, &leaf_index, Some(&mut *tx))?;
        self.set_leaves_count(tx, leaf_index + 1)?;

        if leaf_index >= 1 {
            self.rehash_right_path(tx, leaf_index, hash)?;
        }
        Ok(leaf_index)
    }

    /// Opens a fresh pairing on the right spine for an even-indexed leaf
    /// `>= 2`. Starting from the previous leaf's current parent, steps past
    /// each level that's already closed (allocating a placeholder ancestor
    /// for the new leaf at every level it passes through), stopping once it
    /// reaches a still-open `Left` node to pair against — allocating a new
    /// root above it first if that node was the root. Returns the new
    /// leaf's own parent index: the first node allocated during the walk.
    fn open_right_spine(&self, tx: &mut Transaction, leaf_index: u32) -> Result<u32, TreeError> {
        let prev = self
            .leaves
            .get(&(leaf_index - 1), Some(&mut *tx))?
            .ok_or(TreeError::NoLeafFound(leaf_index - 1))?;
        let mut current_index = prev.parent_index;
        let mut first_allocated: Option<u32> = None;
        let mut pending_parent: Option<u32> = None;

        loop {
            let node = self
                .nodes
                .get(&current_index, Some(&mut *tx))?
                .ok_or(TreeError::NoNodeFound(current_index))?;
            match node {
                NodeRecord::Right { left_index, .. } => {
                    let next_index = self.left_siblings_parent(tx, left_index)?;

                    let new_index = self.next_node_index(tx)?;
                    self.nodes.put(
                        &new_index,
                        &NodeRecord::Left {
                            hash_of_sibling: self.default_hash.clone(),
                            parent_index: 0,
                        },
                        Some(&mut *tx),
                    )?;
                    if first_allocated.is_none() {
                        first_allocated = Some(new_index);
                    }
                    if let Some(pending) = pending_parent {
                        self.patch_node_parent(tx, pending, new_index)?;
                    }
                    pending_parent = Some(new_index);
                    current_index = next_index;
                }
                NodeRecord::Left {
                    hash_of_sibling,
                    parent_index,
                } => {
                    let right_index = self.next_node_index(tx)?;
                    self.nodes.put(
                        &right_index,
                        &NodeRecord::Right {
                            hash_of_sibling: hash_of_sibling.clone(),
                            left_index: current_index,
                        },
                        Some(&mut *tx),
                    )?;
                    if first_allocated.is_none() {
                        first_allocated = Some(right_index);
                    }
                    if let Some(pending) = pending_parent {
                        self.patch_node_parent(tx, pending, right_index)?;
                    }
                    if parent_index == 0 {
                        let new_root = self.next_node_index(tx)?;
                        self.nodes.put(
                            &new_root,
                            &NodeRecord::Left {
                                hash_of_sibling: self.default_hash.clone(),
                                parent_index: 0,
                            },
                            Some(&mut *tx),
                        )?;
                        self.nodes.put(
                            &current_index,
                            &NodeRecord::Left {
                                hash_of_sibling,
                                parent_index: new_root,
                            },
                            Some(&mut *tx),
                        )?;
                    }
                    break;
                }
            }
        }
        Ok(first_allocated.expect("open_right_spine always allocates at least one node"))
    }

    /// The common parent of a `Right` node's pair: the `parent_index` of the
    /// `Left`-tagged node it points at via `left_index`.
    fn left_siblings_parent(&self, tx: &mut Transaction, left_index: u32) -> Result<u32, TreeError> {
        match self
            .nodes
            .get(&left_index, Some(&mut *tx))?
            .ok_or(TreeError::NoNodeFound(left_index))?
        {
            NodeRecord::Left { parent_index, .. } => Ok(parent_index),
            NodeRecord::Right { .. } => Err(TreeError::UnexpectedDatabaseState(
                "a node reached via left_index must be Left-tagged".to_string(),
            )),
        }
    }

    fn patch_node_parent(&self, tx: &mut Transaction, node_index: u32, parent_index: u32) -> Result<(), TreeError> {
        match self
            .nodes
            .get(&node_index, Some(&mut *tx))?
            .ok_or(TreeError::NoNodeFound(node_index))?
        {
            NodeRecord::Left { hash_of_sibling, .. } => {
                self.nodes.put(
                    &node_index,
                    &NodeRecord::Left {
                        hash_of_sibling,
                        parent_index,
                    },
                    Some(&mut *tx),
                )?;
                Ok(())
            }
            NodeRecord::Right { .. } => Err(TreeError::UnexpectedDatabaseState(
                "a Right-tagged node should never need its parent patched".to_string(),
            )),
        }
    }

    /// Re-combine along the right spine after `leaf_index` (with hash
    /// `leaf_hash`) has just been written, from the leaf itself up to the
    /// current root. A `Left` node along the way records the running hash
    /// as its own `hash_of_sibling` (its real partner hasn't shown up yet,
    /// so this doubles as the self-combine value until it does) before the
    /// running hash self-combines for the next level up; a `Right` node's
    /// own `hash_of_sibling` is frozen, so it combines with the running
    /// hash directly, and the running hash then continues via its left
    /// sibling's `parent_index`.
    fn rehash_right_path(&self, tx: &mut Transaction, leaf_index: u32, leaf_hash: Hash<H>) -> Result<(), TreeError> {
        let mut parent_hash = if leaf_index % 2 == 1 {
            let sibling = self
                .leaves
                .get(&(leaf_index - 1), Some(&mut *tx))?
                .ok_or(TreeError::NoLeafFound(leaf_index - 1))?;
            self.hasher.combine_hash(0, &sibling.merkle_hash, &leaf_hash)
        } else {
            self.hasher.combine_hash(0, &leaf_hash, &leaf_hash)
        };

        let leaf = self.leaves.get(&leaf_index, Some(&mut *tx))?.ok_or(TreeError::NoLeafFound(leaf_index))?;
        let mut current_index = leaf.parent_index;
        let mut depth = 1usize;

        while current_index != 0 {
            let node = self
                .nodes
                .get(&current_index, Some(&mut *tx))?
                .ok_or(TreeError::NoNodeFound(current_index))?;
            match node {
                NodeRecord::Left { parent_index, .. } => {
                    self.nodes.put(
                        &current_index,
                        &NodeRecord::Left {
                            hash_of_sibling: parent_hash.clone(),
                            parent_index,
                        },
                        Some(&mut *tx),
                    )?;
                    parent_hash = self.hasher.combine_hash(depth, &parent_hash, &parent_hash);
                    current_index = parent_index;
                }
                NodeRecord::Right { hash_of_sibling, left_index } => {
                    let left_parent_index = match self
                        .nodes
                        .get(&left_index, Some(&mut *tx))?
                        .ok_or(TreeError::NoNodeFound(left_index))?
                    {
                        NodeRecord::Left { parent_index, .. } => {
                            self.nodes.put(
                                &left_index,
                                &NodeRecord::Left {
                                    hash_of_sibling: parent_hash.clone(),
                                    parent_index,
                                },
                                Some(&mut *tx),
                            )?;
                            parent_index
                        }
                        NodeRecord::Right { .. } => {
                            return Err(TreeError::UnexpectedDatabaseState(
                                "a node reached via left_index must be Left-tagged".to_string(),
                            ))
                        }
                    };
                    parent_hash = self.hasher.combine_hash(depth, &hash_of_sibling, &parent_hash);
                    current_index = left_parent_index;
                }
            }
            depth += 1;
        }
        Ok(())
    }

    /// Whether a leaf with this hash is present in the tree.
    pub fn contains(&self, hash: &Hash<H>) -> Result<bool, TreeError> {
        Ok(self.leaves_index.has(hash, None)?)
    }

    /// The index of the leaf with the given hash, if present.
    pub fn leaf_index_of(&self, hash: &Hash<H>) -> Result<Option<u32>, TreeError> {
        Ok(self.leaves_index.get(hash, None)?)
    }

    /// Whether a leaf with this hash was already present as of an earlier
    /// (or the current) size `past_size`.
    pub fn contained(&self, hash: &Hash<H>, past_size: u32) -> Result<bool, TreeError> {
        Ok(self
            .leaves_index
            .get(hash, None)?
            .map_or(false, |index| index < past_size))
    }

    pub fn get_leaf(&self, index: u32) -> Result<H::Element, TreeError> {
        self.leaves
            .get(&index, None)?
            .map(|leaf| leaf.element)
            .ok_or(TreeError::NoLeafFound(index))
    }

    /// Every element currently in the tree, in leaf-index order.
    pub fn get_leaves(&self) -> Result<Vec<H::Element>, TreeError> {
        let size = self.size()?;
        let mut result = Vec::with_capacity(size as usize);
        for i in 0..size {
            let leaf = self.leaves.get(&i, None)?.ok_or(TreeError::NoLeafFound(i))?;
            result.push(leaf.element);
        }
        Ok(result)
    }

    /// The root hash as of the current size.
    pub fn root_hash(&self) -> Result<Hash<H>, TreeError> {
        self.past_root(self.size()?)
    }

    /// Ascend from `last_leaf_index`'s parent, capped at `min_depth - 1`
    /// steps (i.e. stopping once the natural, unpadded root as of that many
    /// leaves is reached). Safe to call with `last_leaf_index` equal to any
    /// leaf that was the *last* leaf as of some earlier size: at every
    /// depth up to `min_depth`, that leaf's own subtree is the most
    /// recently opened one, so a `Left` node on this ascent always
    /// self-combines rather than needing a real sibling, and a `Right`
    /// node's `hash_of_sibling` is always frozen by the time it's written.
    fn ascend_from_last_leaf(&self, last_leaf_index: u32, min_depth: u32) -> Result<Ascend<H>, TreeError> {
        let leaf = self
            .leaves
            .get(&last_leaf_index, None)?
            .ok_or(TreeError::NoLeafFound(last_leaf_index))?;
        let mut current_hash = if last_leaf_index % 2 == 1 {
            let sibling = self
                .leaves
                .get(&(last_leaf_index - 1), None)?
                .ok_or(TreeError::NoLeafFound(last_leaf_index - 1))?;
            self.hasher.combine_hash(0, &sibling.merkle_hash, &leaf.merkle_hash)
        } else {
            self.hasher.combine_hash(0, &leaf.merkle_hash, &leaf.merkle_hash)
        };

        let mut current_index = leaf.parent_index;
        let mut nodes = Vec::new();
        let mut running_values = Vec::new();
        let mut steps = 0u32;

        while steps < min_depth.saturating_sub(1) && current_index != 0 {
            let node = self
                .nodes
                .get(&current_index, None)?
                .ok_or(TreeError::NoNodeFound(current_index))?;
            let depth = steps as usize + 1;
            running_values.push(current_hash.clone());
            let next_index = match &node {
                NodeRecord::Left { parent_index, .. } => {
                    current_hash = self.hasher.combine_hash(depth, &current_hash, &current_hash);
                    *parent_index
                }
                NodeRecord::Right { hash_of_sibling, left_index } => {
                    current_hash = self.hasher.combine_hash(depth, hash_of_sibling, &current_hash);
                    self.left_siblings_parent_readonly(*left_index)?
                }
            };
            nodes.push((current_index, node));
            current_index = next_index;
            steps += 1;
        }
        running_values.push(current_hash);
        Ok(Ascend { nodes, running_values })
    }

    fn left_siblings_parent_readonly(&self, left_index: u32) -> Result<u32, TreeError> {
        match self.nodes.get(&left_index, None)?.ok_or(TreeError::NoNodeFound(left_index))? {
            NodeRecord::Left { parent_index, .. } => Ok(parent_index),
            NodeRecord::Right { .. } => Err(TreeError::UnexpectedDatabaseState(
                "a node reached via left_index must be Left-tagged".to_string(),
            )),
        }
    }

    /// The root hash as of an earlier (or the current) size, padding beyond
    /// the natural structure of `past_size` by duplicating the running hash
    /// up to the tree's full depth.
    pub fn past_root(&self, past_size: u32) -> Result<Hash<H>, TreeError> {
        let current = self.size()?;
        if past_size == 0 || past_size > current {
            return Err(TreeError::UnableToGetPastSize {
                past_size,
                node_count: current,
            });
        }
        let root_depth = depth_at_leaf_count(past_size);
        let min_depth = root_depth.min(self.depth);
        let ascend = self.ascend_from_last_leaf(past_size - 1, min_depth)?;
        let mut current_hash = ascend
            .running_values
            .into_iter()
            .last()
            .expect("ascend_from_last_leaf always produces at least the depth-0 value");

        let mut d = root_depth;
        while d < self.depth {
            current_hash = self.hasher.combine_hash(d as usize, &current_hash, &current_hash);
            d += 1;
        }
        Ok(current_hash)
    }

    /// An authentication path proving `leaf_index` was included under the
    /// root as of `past_size`.
    ///
    /// Walks `leaf_index`'s own ascent using the tree's current, literal
    /// node links (that topology never changes once written — only a
    /// `Left` node's `hash_of_sibling` does). As soon as that ascent
    /// reaches a node also reachable from `leaves[past_size - 1]`'s own
    /// ascent as of `past_size` (the "spine"), it switches to replaying the
    /// rest of the spine instead, so it never trusts a `hash_of_sibling`
    /// that a *later* insert might have overwritten. A node is considered
    /// part of the spine either because it's literally on it, or because
    /// it's the `left_index` target of a spine `Right` node — in which
    /// case the spine's own running value at that point (computed once, in
    /// `ascend_from_last_leaf`) stands in for the still-open sibling.
    pub fn witness(&self, leaf_index: u32, past_size: u32) -> Result<Witness<H>, TreeError> {
        let current = self.size()?;
        if past_size == 0 || past_size > current {
            return Err(TreeError::UnableToGetPastSize {
                past_size,
                node_count: current,
            });
        }
        if leaf_index >= past_size {
            return Err(TreeError::NoLeafFound(leaf_index));
        }

        let last_leaf_index = past_size - 1;
        let root_depth = depth_at_leaf_count(past_size);
        let min_depth = root_depth.min(self.depth);
        let spine = self.ascend_from_last_leaf(last_leaf_index, min_depth)?;

        // node_index -> (position in spine.nodes, reached via left_index)
        let mut spine_position: HashMap<u32, (usize, bool)> = HashMap::new();
        for (p, (idx, node)) in spine.nodes.iter().enumerate() {
            spine_position.insert(*idx, (p, false));
            if let NodeRecord::Right { left_index, .. } = node {
                spine_position.entry(*left_index).or_insert((p, true));
            }
        }

        let leaf = self.leaves.get(&leaf_index, None)?.ok_or(TreeError::NoLeafFound(leaf_index))?;

        let mut auth_path = Vec::with_capacity(self.depth as usize);
        let mut current_hash;
        if leaf_index % 2 == 1 {
            let sibling = self
                .leaves
                .get(&(leaf_index - 1), None)?
                .ok_or(TreeError::NoLeafFound(leaf_index - 1))?;
            auth_path.push(WitnessNode {
                side: Side::Left,
                sibling_hash: sibling.merkle_hash.clone(),
            });
            current_hash = self.hasher.combine_hash(0, &sibling.merkle_hash, &leaf.merkle_hash);
        } else if leaf_index + 1 < past_size {
            let sibling = self
                .leaves
                .get(&(leaf_index + 1), None)?
                .ok_or(TreeError::NoLeafFound(leaf_index + 1))?;
            auth_path.push(WitnessNode {
                side: Side::Right,
                sibling_hash: sibling.merkle_hash.clone(),
            });
            current_hash = self.hasher.combine_hash(0, &leaf.merkle_hash, &sibling.merkle_hash);
        } else {
            auth_path.push(WitnessNode {
                side: Side::Right,
                sibling_hash: leaf.merkle_hash.clone(),
            });
            current_hash = self.hasher.combine_hash(0, &leaf.merkle_hash, &leaf.merkle_hash);
        }

        let mut depth = 1usize;
        let mut current_index = leaf.parent_index;
        let mut merged_at: Option<usize> = None;

        while current_index != 0 && depth < self.depth as usize {
            if let Some(&(pos, via_left)) = spine_position.get(&current_index) {
                if via_left {
                    let sibling_hash = spine.running_values[pos].clone();
                    auth_path.push(WitnessNode {
                        side: Side::Right,
                        sibling_hash: sibling_hash.clone(),
                    });
                    current_hash = self.hasher.combine_hash(depth, &current_hash, &sibling_hash);
                } else {
                    match &spine.nodes[pos].1 {
                        NodeRecord::Left { .. } => {
                            auth_path.push(WitnessNode {
                                side: Side::Right,
                                sibling_hash: current_hash.clone(),
                            });
                            current_hash = self.hasher.combine_hash(depth, &current_hash, &current_hash);
                        }
                        NodeRecord::Right { hash_of_sibling, .. } => {
                            auth_path.push(WitnessNode {
                                side: Side::Left,
                                sibling_hash: hash_of_sibling.clone(),
                            });
                            current_hash = self.hasher.combine_hash(depth, hash_of_sibling, &current_hash);
                        }
                    }
                }
                depth += 1;
                merged_at = Some(pos + 1);
                break;
            }

            let node = self
                .nodes
                .get(&current_index, None)?
                .ok_or(TreeError::NoNodeFound(current_index))?;
            match node {
                NodeRecord::Left { hash_of_sibling, parent_index } => {
                    auth_path.push(WitnessNode {
                        side: Side::Right,
                        sibling_hash: hash_of_sibling.clone(),
                    });
                    current_hash = self.hasher.combine_hash(depth, &current_hash, &hash_of_sibling);
                    current_index = parent_index;
                }
                NodeRecord::Right { hash_of_sibling, left_index } => {
                    let left_parent_index = self.left_siblings_parent_readonly(left_index)?;
                    auth_path.push(WitnessNode {
                        side: Side::Left,
                        sibling_hash: hash_of_sibling.clone(),
                    });
                    current_hash = self.hasher.combine_hash(depth, &hash_of_sibling, &current_hash);
                    current_index = left_parent_index;
                }
            }
            depth += 1;
        }

        if let Some(pos) = merged_at {
            for (_, node) in &spine.nodes[pos..] {
                if depth >= self.depth as usize {
                    break;
                }
                match node {
                    NodeRecord::Left { .. } => {
                        auth_path.push(WitnessNode {
                            side: Side::Right,
                            sibling_hash: current_hash.clone(),
                        });
                        current_hash = self.hasher.combine_hash(depth, &current_hash, &current_hash);
                    }
                    NodeRecord::Right { hash_of_sibling, .. } => {
                        auth_path.push(WitnessNode {
                            side: Side::Left,
                            sibling_hash: hash_of_sibling.clone(),
                        });
                        current_hash = self.hasher.combine_hash(depth, hash_of_sibling, &current_hash);
                    }
                }
                depth += 1;
            }
        }

        while depth < self.depth as usize {
            auth_path.push(WitnessNode {
                side: Side::Right,
                sibling_hash: current_hash.clone(),
            });
            current_hash = self.hasher.combine_hash(depth, &current_hash, &current_hash);
            depth += 1;
        }

        Ok(Witness {
            tree_size: past_size,
            root_hash: current_hash,
            auth_path,
            hasher: self.hasher.clone(),
        })
    }

    /// Roll the tree back to `new_size` leaves, opening and committing its
    /// own transaction.
    pub fn truncate(&self, new_size: u32) -> Result<(), TreeError> {
        let mut tx = self.db.transaction()?;
        let result = self.truncate_in(&mut tx, new_size);
        match result {
            Ok(()) => {
                tx.commit()?;
                Ok(())
            }
            Err(e) => {
                tx.abort();
                Err(e)
            }
        }
    }

    /// Roll the tree back to `new_size` leaves within a caller-managed
    /// transaction. Leaf and node records beyond `new_size` are left in
    /// place (logically dead, not reclaimed) rather than deleted — only
    /// the `leaves_index` entries for the discarded leaves are removed, and
    /// the node counter is reset so the next insert starts reusing indices
    /// from the new root down. The right spine is then rehashed from the
    /// new last leaf, which overwrites any `hash_of_sibling` a later,
    /// now-discarded insert had left behind.
    pub fn truncate_in(&self, tx: &mut Transaction, new_size: u32) -> Result<(), TreeError> {
        let current = self.leaves_count(tx)?;
        if new_size > current {
            return Err(TreeError::UnableToGetPastSize {
                past_size: new_size,
                node_count: current,
            });
        }
        if new_size == current {
            return Ok(());
        }

        for i in new_size..current {
            if let Some(leaf) = self.leaves.get(&i, Some(&mut *tx))? {
                self.leaves_index.del(&leaf.merkle_hash, Some(&mut *tx))?;
            }
        }
        self.set_leaves_count(tx, new_size)?;

        if new_size == 0 {
            self.set_nodes_count(tx, 0)?;
            return Ok(());
        }
        if new_size == 1 {
            self.set_nodes_count(tx, 0)?;
            let mut leaf0 = self.leaves.get(&0, Some(&mut *tx))?.ok_or(TreeError::NoLeafFound(0))?;
            leaf0.parent_index = 0;
            self.leaves.put(&0, &leaf0, Some(&mut *tx))?;
            return Ok(());
        }

        let depth = depth_at_leaf_count(new_size).saturating_sub(2);
        let leaf = self
            .leaves
            .get(&(new_size - 1), Some(&mut *tx))?
            .ok_or(TreeError::NoLeafFound(new_size - 1))?;
        let mut current_index = leaf.parent_index;
        let mut max_index = current_index;

        for _ in 0..depth {
            let node = self
                .nodes
                .get(&current_index, Some(&mut *tx))?
                .ok_or(TreeError::NoNodeFound(current_index))?;
            current_index = match node {
                NodeRecord::Left { parent_index, .. } => parent_index,
                NodeRecord::Right { left_index, .. } => {
                    max_index = max_index.max(left_index);
                    self.left_siblings_parent(tx, left_index)?
                }
            };
            max_index = max_index.max(current_index);
        }

        let new_root = match self
            .nodes
            .get(&current_index, Some(&mut *tx))?
            .ok_or(TreeError::NoNodeFound(current_index))?
        {
            NodeRecord::Left { hash_of_sibling, .. } => NodeRecord::Left {
                hash_of_sibling,
                parent_index: 0,
            },
            NodeRecord::Right { .. } => {
                return Err(TreeError::UnexpectedDatabaseState(
                    "truncation must land on a Left-tagged root".to_string(),
                ))
            }
        };
        self.nodes.put(&current_index, &new_root, Some(&mut *tx))?;
        self.set_nodes_count(tx, max_index)?;

        self.rehash_right_path(tx, new_size - 1, leaf.merkle_hash)
    }
}
