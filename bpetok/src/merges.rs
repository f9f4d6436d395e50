//! Merge priorities for adjacent symbol pairs.
//!
//! A merge rule says "these two adjacent symbols may be fused into one", and its position in the
//! description's merge list is its rank: rank 0 is applied before everything else.  A pair that
//! isn't in the list never merges.
//!
//! Ranks are keyed by the bytes of the *fused* symbol, plus where the split between the two
//! halves falls.  The merge loop works on byte ranges within a single word, so the fused symbol
//! is always a contiguous slice of that word and a lookup never needs to allocate.  The split
//! offset matters because different rules can produce the same bytes (`"ab c"` and `"a bc"`
//! both produce `abc`) and they don't share a rank.
use crate::TokenBytes;
use rustc_hash::FxHashMap as HashMap;

/// Merge priority.  Lower merges first.
pub type Rank = u32;

#[derive(Clone, Debug, Default)]
pub struct MergeRankTable {
    /// Fused bytes → every `(left half length, rank)` that produces them
    ranks: HashMap<TokenBytes, Vec<(usize, Rank)>>,

    /// Number of distinct rules
    len: usize,
}

impl MergeRankTable {
    /// Build the table from merge rules in priority order, given as the raw bytes of their left
    /// and right halves.
    ///
    /// If the same pair appears more than once, the last occurrence sets its rank.  Repeats still
    /// count as one rule.
    pub fn new<Iter, Bytes>(pairs: Iter) -> Self
    where
        Iter: IntoIterator<Item = (Bytes, Bytes)>,
        Bytes: AsRef<[u8]>,
    {
        let mut table = Self::default();

        for (rank, (left, right)) in pairs.into_iter().enumerate() {
            let (left, right) = (left.as_ref(), right.as_ref());
            let mut fused = TokenBytes::with_capacity(left.len() + right.len());
            fused.extend_from_slice(left);
            fused.extend_from_slice(right);

            let splits = table.ranks.entry(fused).or_default();
            match splits.iter_mut().find(|(split, _)| *split == left.len()) {
                Some((_, existing)) => *existing = rank as Rank,
                None => {
                    splits.push((left.len(), rank as Rank));
                    table.len += 1;
                }
            }
        }

        table
    }

    /// Rank of the rule that fuses `fused[..split]` with `fused[split..]`, if there is one.
    #[inline]
    pub fn rank(&self, fused: &[u8], split: usize) -> Option<Rank> {
        self.ranks
            .get(fused)?
            .iter()
            .find(|(s, _)| *s == split)
            .map(|(_, rank)| *rank)
    }

    /// Rank of the rule that fuses `left` with `right`, if there is one.
    ///
    /// Convenience for callers that hold the halves separately; the merge loop uses
    /// [`Self::rank`] which doesn't allocate.
    pub fn pair_rank(&self, left: &[u8], right: &[u8]) -> Option<Rank> {
        let fused = [left, right].concat();

        self.rank(&fused, left.len())
    }

    /// Number of distinct merge rules
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}
