//! Shared pieces for the benchmarks and compatibility tests: where to find tokenizer files, some
//! sample text, and a deliberately naive merge loop to check the real one against.
use bpetok::{
    ByteEncoder, MergeRankTable, Tokenizer, TokenizerDescription, TokenizerOptions,
};
use std::path::PathBuf;

/// Environment variable naming a full size reference `tokenizer.json` (e.g. the GPT-NeoX
/// `20B_tokenizer.json`).  Tests that need it are ignored by default.
pub const REFERENCE_TOKENIZER_ENV: &str = "BPETOK_REFERENCE_TOKENIZER";

/// The small tokenizer description checked in with the `bpetok` crate
pub fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../bpetok/test_data/tiny_tokenizer.json")
}

pub fn load_fixture(options: TokenizerOptions) -> Tokenizer {
    Tokenizer::from_file_with_options(fixture_path(), options)
        .expect("BUG: checked in fixture failed to load")
}

/// Path of the reference tokenizer, if one was provided
pub fn reference_tokenizer_path() -> Option<PathBuf> {
    std::env::var_os(REFERENCE_TOKENIZER_ENV).map(PathBuf::from)
}

/// The merge rules of a description as a rank table, with halves decoded to raw bytes
pub fn merge_ranks(desc: &TokenizerDescription) -> bpetok::Result<MergeRankTable> {
    let symbols = ByteEncoder::standard()?;

    Ok(MergeRankTable::new(
        desc.merge_halves()?
            .into_iter()
            .map(|(left, right)| (symbols.decode_str(left), symbols.decode_str(right))),
    ))
}

/// Merge a word the slow and obvious way: find the best ranked adjacent pair by scanning every
/// pair, splice the two parts together, start over.
///
/// Used as an oracle for [`bpetok::byte_pair_split`].
pub fn naive_byte_pair_split(word: &[u8], ranks: &MergeRankTable) -> Vec<Vec<u8>> {
    let mut parts = word.iter().map(|b| vec![*b]).collect::<Vec<_>>();

    loop {
        let best = parts
            .windows(2)
            .enumerate()
            .filter_map(|(i, pair)| ranks.pair_rank(&pair[0], &pair[1]).map(|rank| (rank, i)))
            .min();

        match best {
            Some((_, i)) => {
                let right = parts.remove(i + 1);
                parts[i].extend_from_slice(&right);
            }
            None => return parts,
        }
    }
}

/// Some English prose, a few paragraphs long
pub const PROSE: &str = "In a shocking finding, scientist discovered a herd of dragons living \
in a remote, previously unexplored valley, in Tibet. Even more surprising to the researchers was \
the fact that the dragons spoke perfect English. The dragons, it turned out, had been listening \
to shortwave radio for the better part of a century, and they're quite fond of the weather \
reports.\n\nWhen asked about their favorite programs, the dragons said they'd never miss the \
shipping forecast. \"It's very calming,\" one of them told reporters. \"We like to hear about the \
wind in places we've never been.\"\n";

/// Sample texts of different shapes, labelled for benchmark ids
pub fn sample_texts() -> Vec<(&'static str, String)> {
    vec![
        ("short", "Hello world!".to_string()),
        ("prose", PROSE.to_string()),
        ("long prose", PROSE.repeat(50)),
        ("whitespace", "  \t  \n\n    indented\n        more   ".repeat(100)),
        ("non-latin", "це ще довший рядок, але в ньому також немає токена. 東京 2024 ".repeat(50)),
        (
            "added tokens",
            format!("{}<|endoftext|>", PROSE).repeat(20),
        ),
    ]
}
