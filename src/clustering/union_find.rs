//! Disjoint-set (union-find) over flat cell indices.
//!
//! Plain index arrays with path compression and union by rank; no object
//! graph. Storage is reused across frames via [`DisjointSet::reset`].

/// Union-find structure over `0..len` elements.
#[derive(Clone, Debug, Default)]
pub struct DisjointSet {
    parent: Vec<u32>,
    rank: Vec<u8>,
}

impl DisjointSet {
    /// Create an empty structure; call [`reset`](Self::reset) before use.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-initialize to `len` singleton sets, reusing storage.
    pub fn reset(&mut self, len: usize) {
        self.parent.clear();
        self.parent.extend(0..len as u32);
        self.rank.clear();
        self.rank.resize(len, 0);
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.parent.len()
    }

    /// Check if the structure is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.parent.is_empty()
    }

    /// Find the set representative, compressing the path walked.
    pub fn find(&mut self, element: u32) -> u32 {
        // Iterative two-pass: locate the root, then point the chain at it.
        let mut root = element;
        while self.parent[root as usize] != root {
            root = self.parent[root as usize];
        }
        let mut current = element;
        while self.parent[current as usize] != root {
            let next = self.parent[current as usize];
            self.parent[current as usize] = root;
            current = next;
        }
        root
    }

    /// Merge the sets containing `a` and `b`.
    ///
    /// Returns `true` if two distinct sets were merged. Idempotent and
    /// symmetric, so pointer cycles among union requests are harmless.
    pub fn union(&mut self, a: u32, b: u32) -> bool {
        let root_a = self.find(a);
        let root_b = self.find(b);
        if root_a == root_b {
            return false;
        }
        let rank_a = self.rank[root_a as usize];
        let rank_b = self.rank[root_b as usize];
        if rank_a < rank_b {
            self.parent[root_a as usize] = root_b;
        } else if rank_a > rank_b {
            self.parent[root_b as usize] = root_a;
        } else {
            self.parent[root_b as usize] = root_a;
            self.rank[root_a as usize] += 1;
        }
        true
    }

    /// Check whether two elements share a set.
    pub fn connected(&mut self, a: u32, b: u32) -> bool {
        self.find(a) == self.find(b)
    }
}
