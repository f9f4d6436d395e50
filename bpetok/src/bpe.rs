//! Implementation of components of BPE (byte pair encoding) as it relates to encoding a single
//! pre-tokenized word as tokens.
use crate::error::*;
use crate::merges::{MergeRankTable, Rank};
use crate::{ByteEncoder, Result, TokenId, Vocabulary};
use std::ops::Range;
use tracing::*;

/// Using the BPE algorithm, find the tokens in a word and return their integer form.
///
/// Every symbol left over once no more merges apply must be in the vocabulary.  There is no
/// unknown-token fallback: a leftover symbol without an id fails with
/// [`BpetokError::OutOfVocabulary`].
pub fn byte_pair_encode(
    word: &[u8],
    ranks: &MergeRankTable,
    vocab: &Vocabulary,
    symbols: &ByteEncoder,
) -> Result<Vec<TokenId>> {
    byte_pair_merge(word, ranks, |range| {
        let bytes = &word[range];

        vocab.id_for_bytes(bytes).ok_or_else(|| {
            let symbol = symbols.encode_bytes(bytes);
            let word = String::from_utf8_lossy(word).into_owned();
            debug!(%symbol, %word, "merge result is not in the vocabulary");

            OutOfVocabularySnafu { symbol, word }.build()
        })
    })
    .into_iter()
    .collect()
}

/// Using the BPE algorithm, find the tokens in a word and return their byte string form.
///
/// Useful for seeing why a word tokenized the way it did, without needing a vocabulary.
pub fn byte_pair_split<'a>(word: &'a [u8], ranks: &MergeRankTable) -> Vec<&'a [u8]> {
    byte_pair_merge(word, ranks, |range| &word[range])
}

/// Merge bytes within a word together into progressively fewer, longer byte sequences, following
/// the merge rules in `ranks`.
///
/// Each round merges the adjacent pair with the lowest rank.  If the same best pair occurs more
/// than once, the leftmost occurrence is merged first.  It stops when no adjacent pair has a
/// rank.
///
/// `f` is called on the byte range of each final part, in order.
fn byte_pair_merge<T>(
    word: &[u8],
    ranks: &MergeRankTable,
    f: impl FnMut(Range<usize>) -> T,
) -> Vec<T> {
    // This is a vector of (start, rank).
    // The rank is of the pair made by the part starting at `start` and the part after it.
    // The last item is a sentinel marking the end of the word; its rank is never valid.
    let mut parts: Vec<(usize, Rank)> = (0..word.len() + 1).map(|i| (i, Rank::MAX)).collect();

    // Rank of merging part `i` with part `i + 1`
    let get_rank = |parts: &[(usize, Rank)], i: usize| -> Rank {
        if i + 2 < parts.len() {
            let (start, split, end) = (parts[i].0, parts[i + 1].0, parts[i + 2].0);
            ranks
                .rank(&word[start..end], split - start)
                .unwrap_or(Rank::MAX)
        } else {
            Rank::MAX
        }
    };

    // Ranks are looked up once up front, then only the two pairs touching a merge are refreshed
    // after it
    for i in 0..parts.len().saturating_sub(2) {
        parts[i].1 = get_rank(&parts, i);
    }

    // If you have n parts and m merges, this does O(mn) work.  n is bounded by the length of one
    // pre-tokenized word, which is usually small, and a flat vector scan beats anything fancier
    // at that size.
    loop {
        if parts.len() <= 2 {
            break;
        }

        // Rank::MAX is a sentinel rank value allowing us to take the min more quickly.  Strict `<`
        // keeps the leftmost of equal ranks.
        let mut min_rank: (Rank, usize) = (Rank::MAX, 0);
        for (i, &(_, rank)) in parts[..parts.len() - 1].iter().enumerate() {
            if rank < min_rank.0 {
                min_rank = (rank, i);
            }
        }

        if min_rank.0 == Rank::MAX {
            break;
        }

        let i = min_rank.1;

        // Fuse part `i` with part `i + 1`, then refresh the ranks of the pairs on either side of
        // the fused part
        parts.remove(i + 1);
        parts[i].1 = get_rank(&parts, i);
        if i > 0 {
            parts[i - 1].1 = get_rank(&parts, i - 1);
        }
    }

    parts
        .windows(2)
        .map(|pair| pair[0].0..pair[1].0)
        .map(f)
        .collect()
}
