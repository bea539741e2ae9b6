//! A Merkle tree compatible with OpenZeppelin's `StandardMerkleTree` for
//! `(address, bytes32, bytes)` leaves, which is what `ComposableCoW` verifies
//! proofs against.

use {
    crate::contracts::ConditionalOrderParams,
    alloy::{
        primitives::{B256, keccak256},
        sol_types::SolValue,
    },
    thiserror::Error,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TreeError {
    #[error("Expected non-zero number of leaves")]
    Empty,
    #[error("Index {0} out of bounds")]
    IndexOutOfBounds(usize),
}

/// Hash of a leaf: the value is ABI encoded and hashed twice to prevent second
/// preimage attacks with internal nodes.
pub fn leaf_hash(leaf: &ConditionalOrderParams) -> B256 {
    let encoded = (leaf.handler, leaf.salt, leaf.staticInput.clone()).abi_encode_params();
    keccak256(keccak256(encoded))
}

fn hash_pair(a: &B256, b: &B256) -> B256 {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    let mut buffer = [0u8; 64];
    buffer[..32].copy_from_slice(first.as_slice());
    buffer[32..].copy_from_slice(second.as_slice());
    keccak256(buffer)
}

fn sibling_index(index: usize) -> usize {
    if index % 2 == 1 { index + 1 } else { index - 1 }
}

#[derive(Debug, Clone)]
pub struct StandardMerkleTree {
    /// Complete binary tree stored as an array, root at index 0.
    tree: Vec<B256>,
    /// Leaves in insertion order along with their position in `tree`.
    values: Vec<(ConditionalOrderParams, usize)>,
}

impl StandardMerkleTree {
    pub fn of(leaves: Vec<ConditionalOrderParams>) -> Result<Self, TreeError> {
        if leaves.is_empty() {
            return Err(TreeError::Empty);
        }

        let mut hashed = leaves
            .iter()
            .enumerate()
            .map(|(index, leaf)| (index, leaf_hash(leaf)))
            .collect::<Vec<_>>();
        hashed.sort_by(|a, b| a.1.cmp(&b.1));

        let len = 2 * hashed.len() - 1;
        let mut tree = vec![B256::ZERO; len];
        let mut positions = vec![0; hashed.len()];
        for (sorted, (original, hash)) in hashed.iter().enumerate() {
            let position = len - 1 - sorted;
            tree[position] = *hash;
            positions[*original] = position;
        }
        for i in (0..len - hashed.len()).rev() {
            tree[i] = hash_pair(&tree[2 * i + 1], &tree[2 * i + 2]);
        }

        let values = leaves.into_iter().zip(positions).collect();
        Ok(Self { tree, values })
    }

    pub fn root(&self) -> B256 {
        self.tree[0]
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Leaves in the order they were given to [`StandardMerkleTree::of`].
    pub fn entries(&self) -> impl Iterator<Item = (usize, &ConditionalOrderParams)> {
        self.values.iter().map(|(leaf, _)| leaf).enumerate()
    }

    /// Sibling hashes from the leaf at `index` up to the root.
    pub fn get_proof(&self, index: usize) -> Result<Vec<B256>, TreeError> {
        let mut position = self
            .values
            .get(index)
            .ok_or(TreeError::IndexOutOfBounds(index))?
            .1;
        let mut proof = Vec::new();
        while position > 0 {
            proof.push(self.tree[sibling_index(position)]);
            position = (position - 1) / 2;
        }
        Ok(proof)
    }
}

/// Recomputes the root implied by `proof` for `leaf`.
pub fn process_proof(leaf: &ConditionalOrderParams, proof: &[B256]) -> B256 {
    proof
        .iter()
        .fold(leaf_hash(leaf), |node, sibling| hash_pair(&node, sibling))
}

pub fn verify(root: B256, leaf: &ConditionalOrderParams, proof: &[B256]) -> bool {
    process_proof(leaf, proof) == root
}
