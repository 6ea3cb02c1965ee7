//! # Sparse Merkle Tree
//!
//! A bounded-depth binary Merkle tree over a 256-bit index space. Nodes are
//! stored by hash, unpopulated subtrees collapse to the zero hash, and a leaf
//! sits at the shallowest level where its index path no longer collides with
//! any other leaf.
//!
//! ## Hashing
//!
//! - Empty: `0`.
//! - Leaf: `H(index, value, 1)`.
//! - Middle: `H(left, right)`.
//!
//! Bit `d` of the index (least significant first) picks the child at depth
//! `d`: `0` goes left, `1` goes right.
//!
//! ## Depth Rule
//!
//! Leaves live at depths `0..max_depth`. Separating two leaves that share
//! their first `max_depth - 1` path bits fails with
//! [`SmtError::MaxDepthReached`], deterministically.
//!
//! ## Atomicity
//!
//! A write builds every new node into a staging buffer while reading only
//! committed nodes. Nothing is written to node storage, and the root does not
//! move, unless the whole path was built successfully.
//!
//! ## History
//!
//! Node storage is never pruned, so every root the tree has ever held stays
//! provable through [`SparseMerkleTree::get_proof_by_root`].

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use gist_core::FieldElement;

use crate::error::SmtError;
use crate::hash::{HashEngine, Sha256FieldHasher};

/// Hard ceiling for the configurable depth: one level per index bit.
pub const MAX_DEPTH_CEILING: usize = 256;

/// Depth used when none is configured.
pub const DEFAULT_MAX_DEPTH: usize = 64;

// ─── Nodes ───────────────────────────────────────────────────────────

/// A node in tree storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Empty,
    Leaf {
        index: FieldElement,
        value: FieldElement,
    },
    Middle {
        left: FieldElement,
        right: FieldElement,
    },
}

impl Node {
    /// Hash of this node under `hasher`.
    pub fn hash<H: HashEngine + ?Sized>(&self, hasher: &H) -> FieldElement {
        match self {
            Self::Empty => FieldElement::ZERO,
            Self::Leaf { index, value } => leaf_hash(hasher, *index, *value),
            Self::Middle { left, right } => hasher.hash(&[*left, *right]),
        }
    }
}

fn leaf_hash<H: HashEngine + ?Sized>(
    hasher: &H,
    index: FieldElement,
    value: FieldElement,
) -> FieldElement {
    hasher.hash(&[index, value, FieldElement::ONE])
}

// ─── Proofs ──────────────────────────────────────────────────────────

/// Existence or non-existence proof for one index against one root.
///
/// `siblings` always has `max_depth` entries; levels below the terminating
/// node are zero. When the path ends at a leaf with a different index the
/// proof carries that leaf as the auxiliary node, and `value` repeats the
/// auxiliary value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmtProof {
    pub root: FieldElement,
    pub existence: bool,
    pub siblings: Vec<FieldElement>,
    pub index: FieldElement,
    pub value: FieldElement,
    pub aux_existence: bool,
    pub aux_index: FieldElement,
    pub aux_value: FieldElement,
}

impl SmtProof {
    /// Depth of the terminating node: one past the deepest non-zero sibling.
    pub fn depth(&self) -> usize {
        self.siblings
            .iter()
            .rposition(|s| !s.is_zero())
            .map_or(0, |i| i + 1)
    }

    /// Recompute the root from the terminating node and the siblings.
    ///
    /// Returns `None` when the auxiliary leaf could not have terminated this
    /// index's path (same index, or a diverging path prefix).
    pub fn compute_root<H: HashEngine + ?Sized>(&self, hasher: &H) -> Option<FieldElement> {
        let depth = self.depth();
        let mut cur = if self.existence {
            leaf_hash(hasher, self.index, self.value)
        } else if self.aux_existence {
            if self.aux_index == self.index
                || (0..depth).any(|d| self.aux_index.bit(d) != self.index.bit(d))
            {
                return None;
            }
            leaf_hash(hasher, self.aux_index, self.aux_value)
        } else {
            FieldElement::ZERO
        };
        for d in (0..depth).rev() {
            let sibling = self.siblings[d];
            cur = if self.index.bit(d) {
                hasher.hash(&[sibling, cur])
            } else {
                hasher.hash(&[cur, sibling])
            };
        }
        Some(cur)
    }

    /// Whether the proof recomputes to its own root.
    pub fn verify<H: HashEngine + ?Sized>(&self, hasher: &H) -> bool {
        self.compute_root(hasher) == Some(self.root)
    }
}

// ─── Tree ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriteMode {
    Insert,
    Update,
    Upsert,
}

#[derive(Default)]
struct Staged {
    nodes: Vec<(FieldElement, Node)>,
    created: bool,
}

/// The sparse Merkle tree engine.
#[derive(Clone)]
pub struct SparseMerkleTree<H: HashEngine = Sha256FieldHasher> {
    hasher: H,
    nodes: HashMap<FieldElement, Node>,
    roots: HashSet<FieldElement>,
    root: FieldElement,
    max_depth: usize,
    leaf_count: usize,
}

impl SparseMerkleTree<Sha256FieldHasher> {
    /// Empty tree with the SHA-256 hasher and the default depth.
    pub fn new() -> Self {
        Self::with_hasher(Sha256FieldHasher)
    }
}

impl Default for SparseMerkleTree<Sha256FieldHasher> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: HashEngine> std::fmt::Debug for SparseMerkleTree<H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SparseMerkleTree")
            .field("root", &self.root)
            .field("max_depth", &self.max_depth)
            .field("leaf_count", &self.leaf_count)
            .field("node_count", &self.nodes.len())
            .finish()
    }
}

impl<H: HashEngine> SparseMerkleTree<H> {
    /// Empty tree with the default depth.
    pub fn with_hasher(hasher: H) -> Self {
        let mut roots = HashSet::new();
        roots.insert(FieldElement::ZERO);
        Self {
            hasher,
            nodes: HashMap::new(),
            roots,
            root: FieldElement::ZERO,
            max_depth: DEFAULT_MAX_DEPTH,
            leaf_count: 0,
        }
    }

    /// Empty tree with an explicit depth in `1..=MAX_DEPTH_CEILING`.
    pub fn with_max_depth(hasher: H, max_depth: usize) -> Result<Self, SmtError> {
        if max_depth == 0 || max_depth > MAX_DEPTH_CEILING {
            return Err(SmtError::InvalidMaxDepth {
                requested: max_depth,
                current: 0,
                ceiling: MAX_DEPTH_CEILING,
            });
        }
        let mut tree = Self::with_hasher(hasher);
        tree.max_depth = max_depth;
        Ok(tree)
    }

    pub fn root(&self) -> FieldElement {
        self.root
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Whether `root` is the current root or any root the tree once held.
    /// The empty root is always known.
    pub fn is_known_root(&self, root: &FieldElement) -> bool {
        self.roots.contains(root)
    }

    /// Raise the depth bound. Existing leaves keep their positions.
    pub fn set_max_depth(&mut self, max_depth: usize) -> Result<(), SmtError> {
        if max_depth <= self.max_depth || max_depth > MAX_DEPTH_CEILING {
            return Err(SmtError::InvalidMaxDepth {
                requested: max_depth,
                current: self.max_depth,
                ceiling: MAX_DEPTH_CEILING,
            });
        }
        self.max_depth = max_depth;
        Ok(())
    }

    /// Insert a new leaf. Fails with `DuplicateLeaf` if `index` is occupied.
    pub fn add(&mut self, index: FieldElement, value: FieldElement) -> Result<FieldElement, SmtError> {
        self.write(index, value, WriteMode::Insert)
    }

    /// Replace the value of an existing leaf. Fails with `LeafNotFound`.
    pub fn update(
        &mut self,
        index: FieldElement,
        value: FieldElement,
    ) -> Result<FieldElement, SmtError> {
        self.write(index, value, WriteMode::Update)
    }

    /// Insert or replace.
    pub fn add_or_update(
        &mut self,
        index: FieldElement,
        value: FieldElement,
    ) -> Result<FieldElement, SmtError> {
        self.write(index, value, WriteMode::Upsert)
    }

    /// Value stored at `index` under the current root.
    pub fn get(&self, index: &FieldElement) -> Result<FieldElement, SmtError> {
        let proof = self.get_proof(index)?;
        if proof.existence {
            Ok(proof.value)
        } else {
            Err(SmtError::LeafNotFound(*index))
        }
    }

    pub fn contains(&self, index: &FieldElement) -> Result<bool, SmtError> {
        Ok(self.get_proof(index)?.existence)
    }

    /// Proof for `index` against the current root.
    pub fn get_proof(&self, index: &FieldElement) -> Result<SmtProof, SmtError> {
        self.get_proof_by_root(index, &self.root)
    }

    /// Proof for `index` against a current or historical root.
    ///
    /// `siblings` always has the tree's current `max_depth` entries, padded
    /// with zeros. After [`set_max_depth`](Self::set_max_depth) a proof
    /// against an older root is therefore longer than one taken before the
    /// change, though both recompute the same root.
    pub fn get_proof_by_root(
        &self,
        index: &FieldElement,
        root: &FieldElement,
    ) -> Result<SmtProof, SmtError> {
        if !self.roots.contains(root) {
            return Err(SmtError::RootNotFound(*root));
        }
        let mut siblings = vec![FieldElement::ZERO; self.max_depth];
        let mut hash = *root;
        for depth in 0..self.max_depth {
            match self.node(&hash)? {
                Node::Empty => {
                    return Ok(SmtProof {
                        root: *root,
                        existence: false,
                        siblings,
                        index: *index,
                        value: FieldElement::ZERO,
                        aux_existence: false,
                        aux_index: FieldElement::ZERO,
                        aux_value: FieldElement::ZERO,
                    });
                }
                Node::Leaf {
                    index: leaf_index,
                    value,
                } => {
                    let existence = leaf_index == *index;
                    return Ok(SmtProof {
                        root: *root,
                        existence,
                        siblings,
                        index: *index,
                        value,
                        aux_existence: !existence,
                        aux_index: if existence { FieldElement::ZERO } else { leaf_index },
                        aux_value: if existence { FieldElement::ZERO } else { value },
                    });
                }
                Node::Middle { left, right } => {
                    if index.bit(depth) {
                        siblings[depth] = left;
                        hash = right;
                    } else {
                        siblings[depth] = right;
                        hash = left;
                    }
                }
            }
        }
        Err(SmtError::MaxDepthReached {
            max_depth: self.max_depth,
        })
    }

    // ── internals ──

    fn node(&self, hash: &FieldElement) -> Result<Node, SmtError> {
        if hash.is_zero() {
            return Ok(Node::Empty);
        }
        self.nodes
            .get(hash)
            .copied()
            .ok_or(SmtError::MissingNode(*hash))
    }

    fn write(
        &mut self,
        index: FieldElement,
        value: FieldElement,
        mode: WriteMode,
    ) -> Result<FieldElement, SmtError> {
        let mut staged = Staged::default();
        let new_root = self.write_at(&mut staged, index, value, self.root, 0, mode)?;

        let created = staged.created;
        for (hash, node) in staged.nodes {
            self.nodes.insert(hash, node);
        }
        if created {
            self.leaf_count += 1;
        }
        self.root = new_root;
        self.roots.insert(new_root);
        tracing::trace!(index = %index, root = %new_root, created, "smt leaf written");
        Ok(new_root)
    }

    fn write_at(
        &self,
        staged: &mut Staged,
        index: FieldElement,
        value: FieldElement,
        node_hash: FieldElement,
        depth: usize,
        mode: WriteMode,
    ) -> Result<FieldElement, SmtError> {
        if depth >= self.max_depth {
            return Err(SmtError::MaxDepthReached {
                max_depth: self.max_depth,
            });
        }
        match self.node(&node_hash)? {
            Node::Empty => {
                if mode == WriteMode::Update {
                    return Err(SmtError::LeafNotFound(index));
                }
                staged.created = true;
                Ok(self.stage(staged, Node::Leaf { index, value }))
            }
            Node::Leaf {
                index: existing, ..
            } if existing == index => {
                if mode == WriteMode::Insert {
                    return Err(SmtError::DuplicateLeaf(index));
                }
                Ok(self.stage(staged, Node::Leaf { index, value }))
            }
            Node::Leaf {
                index: existing, ..
            } => {
                if mode == WriteMode::Update {
                    return Err(SmtError::LeafNotFound(index));
                }
                staged.created = true;
                self.split(staged, index, value, existing, node_hash, depth)
            }
            Node::Middle { left, right } => {
                let middle = if index.bit(depth) {
                    let right = self.write_at(staged, index, value, right, depth + 1, mode)?;
                    Node::Middle { left, right }
                } else {
                    let left = self.write_at(staged, index, value, left, depth + 1, mode)?;
                    Node::Middle { left, right }
                };
                Ok(self.stage(staged, middle))
            }
        }
    }

    /// Push an existing leaf down until its path diverges from the new one.
    fn split(
        &self,
        staged: &mut Staged,
        index: FieldElement,
        value: FieldElement,
        old_index: FieldElement,
        old_hash: FieldElement,
        depth: usize,
    ) -> Result<FieldElement, SmtError> {
        if depth + 1 >= self.max_depth {
            return Err(SmtError::MaxDepthReached {
                max_depth: self.max_depth,
            });
        }
        let new_bit = index.bit(depth);
        let middle = if new_bit == old_index.bit(depth) {
            let child = self.split(staged, index, value, old_index, old_hash, depth + 1)?;
            if new_bit {
                Node::Middle {
                    left: FieldElement::ZERO,
                    right: child,
                }
            } else {
                Node::Middle {
                    left: child,
                    right: FieldElement::ZERO,
                }
            }
        } else {
            let new_hash = self.stage(staged, Node::Leaf { index, value });
            if new_bit {
                Node::Middle {
                    left: old_hash,
                    right: new_hash,
                }
            } else {
                Node::Middle {
                    left: new_hash,
                    right: old_hash,
                }
            }
        };
        Ok(self.stage(staged, middle))
    }

    fn stage(&self, staged: &mut Staged, node: Node) -> FieldElement {
        let hash = node.hash(&self.hasher);
        staged.nodes.push((hash, node));
        hash
    }
}
