//! Token string ↔ id lookups.
//!
//! The base vocabulary is keyed by the raw bytes each entry stands for (its printable spelling
//! run back through [`ByteEncoder`]); added tokens are literal text and skip that step.
use crate::error::*;
use crate::{ByteEncoder, Result, TokenBytes, TokenId};
use rustc_hash::FxHashMap as HashMap;
use serde::Deserialize;
use snafu::ensure;

/// A literal string with an explicit id that is matched as a whole before any other splitting,
/// and never broken up by the merge algorithm.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct AddedToken {
    pub id: TokenId,
    pub content: String,

    /// Control tokens like `<|endoftext|>` are flagged special by the files that declare them.
    /// The flag is carried for callers; it doesn't change how the token is encoded or decoded.
    #[serde(default)]
    pub special: bool,
}

impl AddedToken {
    pub fn new(id: TokenId, content: impl Into<String>) -> Self {
        Self {
            id,
            content: content.into(),
            special: false,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Vocabulary {
    /// Raw bytes → id, for the base vocabulary
    encode: HashMap<TokenBytes, TokenId>,

    /// Id → raw bytes, for the base vocabulary and added tokens
    decode: HashMap<TokenId, TokenBytes>,

    added: Vec<AddedToken>,
}

impl Vocabulary {
    /// Build a vocabulary from base entries, in the order they were declared, plus added tokens.
    ///
    /// When two base entries decode to the same bytes, the first one declared keeps the string →
    /// id lookup.  Published vocabularies do contain such duplicates, so this isn't an error.  An
    /// added token's content replaces whatever the base vocabulary had for the same id.
    pub fn new<Iter, Key>(
        symbols: &ByteEncoder,
        base: Iter,
        added: impl IntoIterator<Item = AddedToken>,
    ) -> Result<Self>
    where
        Iter: IntoIterator<Item = (Key, TokenId)>,
        Key: AsRef<str>,
    {
        let base = base.into_iter();
        let mut encode = HashMap::default();
        let mut decode = HashMap::default();
        encode.reserve(base.size_hint().0);
        decode.reserve(base.size_hint().0);

        for (key, id) in base {
            let bytes = symbols.decode_str(key.as_ref());

            decode.entry(id).or_insert_with(|| bytes.clone());
            encode.entry(bytes).or_insert(id);
        }

        let added = added.into_iter().collect::<Vec<_>>();
        for token in &added {
            ensure!(!token.content.is_empty(), EmptyAddedTokenSnafu { id: token.id });

            decode.insert(token.id, token.content.as_bytes().to_vec());
        }

        Ok(Self {
            encode,
            decode,
            added,
        })
    }

    /// The id of the base-vocabulary token with exactly these bytes.
    pub fn id_for_bytes(&self, bytes: impl AsRef<[u8]>) -> Option<TokenId> {
        self.encode.get(bytes.as_ref()).copied()
    }

    /// The raw bytes of a token, base or added.
    pub fn bytes_for_id(&self, id: TokenId) -> Option<&[u8]> {
        self.decode.get(&id).map(Vec::as_slice)
    }

    /// The added token with this id, if `id` belongs to one.
    pub fn added_token(&self, id: TokenId) -> Option<&AddedToken> {
        self.added.iter().find(|token| token.id == id)
    }

    pub fn added_tokens(&self) -> &[AddedToken] {
        &self.added
    }

    /// Number of distinct ids, base and added
    pub fn len(&self) -> usize {
        self.decode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decode.is_empty()
    }
}
