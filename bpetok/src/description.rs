//! The on-disk tokenizer description: a `tokenizer.json` style document with a `model` object
//! holding the vocabulary and merge rules, plus a list of added tokens.
//!
//! Only what the tokenizer needs is read.  Every other field (normalizers, decoders, truncation
//! settings, ...) is ignored.
use crate::error::*;
use crate::{AddedToken, Result, TokenId};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use snafu::ResultExt;
use std::fmt;
use std::path::Path;
use strum::{EnumIter, EnumString, EnumVariantNames, VariantNames};

/// The tokenizer model types this crate can run.
///
/// A description declares its type in `model.type`; anything not listed here is refused at load
/// time instead of being run with the wrong algorithm.
#[derive(
    Clone, Copy, Debug, Eq, PartialEq, EnumString, EnumIter, EnumVariantNames, strum::Display,
)]
pub enum TokenizerType {
    /// Byte-level byte pair encoding
    #[strum(serialize = "BPE")]
    Bpe,
}

impl TokenizerType {
    /// Names of every supported type, as they're spelled in a description
    pub fn supported() -> &'static [&'static str] {
        Self::VARIANTS
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TokenizerDescription {
    pub model: ModelDescription,

    #[serde(default)]
    pub added_tokens: Vec<AddedToken>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct ModelDescription {
    #[serde(rename = "type")]
    pub typ: String,

    /// Token strings in the printable alphabet and their ids, in the order the file declares them
    #[serde(deserialize_with = "ordered_vocab")]
    pub vocab: Vec<(String, TokenId)>,

    /// Merge rules, highest priority first
    pub merges: Vec<MergeEntry>,
}

/// One merge rule as it appears in a description.
///
/// Older files spell a rule as one string with the halves separated by a space; newer ones use a
/// two element array.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(untagged)]
pub enum MergeEntry {
    Joined(String),
    Pair(String, String),

    /// Anything else.  Kept so the error can say which rule was bad.
    Other(serde_json::Value),
}

impl MergeEntry {
    /// The left and right halves of this rule.  `index` is the rule's position in the list, used
    /// for error reporting.
    pub fn halves(&self, index: usize) -> Result<(&str, &str)> {
        let halves = match self {
            MergeEntry::Joined(merge) => merge
                .split_once(' ')
                .filter(|(left, right)| !left.is_empty() && !right.is_empty())
                .filter(|(_, right)| !right.contains(' ')),
            MergeEntry::Pair(left, right) => Some((left.as_str(), right.as_str()))
                .filter(|(left, right)| !left.is_empty() && !right.is_empty()),
            MergeEntry::Other(_) => None,
        };

        halves.ok_or_else(|| {
            MalformedMergeSnafu {
                index,
                merge: self.to_string(),
            }
            .build()
        })
    }
}

impl fmt::Display for MergeEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MergeEntry::Joined(merge) => f.write_str(merge),
            MergeEntry::Pair(left, right) => write!(f, "{left} {right}"),
            MergeEntry::Other(value) => write!(f, "{value}"),
        }
    }
}

impl TokenizerDescription {
    /// Read and parse a description file.
    ///
    /// The whole file is read before parsing starts, so a truncated file fails as a parse error
    /// rather than producing part of a tokenizer.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).context(ReadDescriptionSnafu { path })?;

        Self::from_slice(&bytes)
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).context(ParseDescriptionSnafu)
    }

    /// The declared model type, if it's one this crate supports
    pub fn tokenizer_type(&self) -> Result<TokenizerType> {
        self.model.typ.parse().map_err(|_| {
            UnsupportedTokenizerTypeSnafu {
                typ: self.model.typ.clone(),
            }
            .build()
        })
    }

    /// Every merge rule split into its halves, highest priority first.
    ///
    /// Fails on the first rule that isn't a pair of two non-empty symbols.
    pub fn merge_halves(&self) -> Result<Vec<(&str, &str)>> {
        self.model
            .merges
            .iter()
            .enumerate()
            .map(|(index, merge)| merge.halves(index))
            .collect()
    }
}

/// Read the `vocab` object as a list of entries in file order.
///
/// Going through a map type would lose the declaration order, and with it the rule that the first
/// of two keys for the same bytes wins.
fn ordered_vocab<'de, D>(deserializer: D) -> std::result::Result<Vec<(String, TokenId)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedVocab;

    impl<'de> Visitor<'de> for OrderedVocab {
        type Value = Vec<(String, TokenId)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object mapping token strings to integer ids")
        }

        fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));

            while let Some(entry) = map.next_entry::<String, TokenId>()? {
                entries.push(entry);
            }

            Ok(entries)
        }
    }

    deserializer.deserialize_map(OrderedVocab)
}
