use snafu::OptionExt;
use std::fmt::{self, Debug};
use std::path::Path;
use std::sync::Arc;

mod bpe;
mod byte_encoder;
mod cache;
mod description;
mod error;
mod merges;
mod params;
mod pretokenize;
mod stream;
mod token;
mod vocab;

pub use bpe::*;
pub use byte_encoder::*;
pub use cache::CachePolicy;
pub use description::*;
pub use error::*;
pub use merges::*;
pub use pretokenize::*;
pub use stream::*;
pub use token::*;
pub use vocab::*;

use params::TokenizerParams;

pub type Result<T, E = BpetokError> = std::result::Result<T, E>;

/// Settings that affect how a tokenizer runs, but not what it produces.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct TokenizerOptions {
    pub cache: CachePolicy,
}

/// A byte-level BPE tokenizer loaded from a tokenizer description.
///
/// With a tokenizer, it's possible to encode text into the integer token ids a model expects,
/// and to decode ids the model produced back into text.
///
/// Instances of `Tokenizer` are light weight and can be very cheaply cloned.  They are also
/// thread safe; clones share the loaded vocabulary and the word cache, so a word encoded on one
/// thread is a cache hit on every other.
#[derive(Clone)]
pub struct Tokenizer {
    params: Arc<TokenizerParams>,
}

impl Tokenizer {
    /// Load a tokenizer from a description file, with default options.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_options(path, TokenizerOptions::default())
    }

    pub fn from_file_with_options(
        path: impl AsRef<Path>,
        options: TokenizerOptions,
    ) -> Result<Self> {
        let desc = TokenizerDescription::from_file(path)?;

        Self::from_description(&desc, options)
    }

    /// Load a tokenizer from the contents of a description file, with default options.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let desc = TokenizerDescription::from_slice(bytes)?;

        Self::from_description(&desc, TokenizerOptions::default())
    }

    /// Build a tokenizer from an already parsed description.
    ///
    /// Fails if the declared type isn't supported, any merge rule is malformed, or an added token
    /// is empty.  Nothing is returned until every table has been built.
    pub fn from_description(desc: &TokenizerDescription, options: TokenizerOptions) -> Result<Self> {
        Ok(Self {
            params: Arc::new(TokenizerParams::new(desc, &options)?),
        })
    }
}

impl Tokenizer {
    /// Encode text into token ids.
    ///
    /// Added tokens that occur literally in `text` are always encoded as their own id.  Fails
    /// with [`BpetokError::OutOfVocabulary`] if the merges reduce a word to a symbol that the
    /// vocabulary doesn't have an id for.
    pub fn encode(&self, text: impl AsRef<str>) -> Result<Vec<TokenId>> {
        let text = text.as_ref();
        let mut ids = Vec::with_capacity(text.len() / 3 + 1);

        for word in self.params.pretokenizer.words(text) {
            match word? {
                Word::Added { id, .. } => ids.push(id),
                Word::Text(word) => ids.extend_from_slice(&self.params.encode_word(word)?),
            }
        }

        Ok(ids)
    }

    /// Decode token ids back into text.
    ///
    /// Ids that don't add up to valid UTF-8 (say, a sequence cut off in the middle of a
    /// multi-byte character) decode with U+FFFD in place of the broken bytes.  Use
    /// [`Self::decode_to_bytes`] to handle that some other way.
    pub fn decode(&self, ids: &[TokenId]) -> Result<String> {
        let bytes = self.decode_to_bytes(ids)?;

        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Decode token ids into the raw bytes they stand for.
    pub fn decode_to_bytes(&self, ids: &[TokenId]) -> Result<TokenBytes> {
        let mut bytes = TokenBytes::with_capacity(ids.len() * 4);

        for &id in ids {
            bytes.extend_from_slice(self.decode_one(id)?);
        }

        Ok(bytes)
    }

    /// The raw bytes of a single token.
    ///
    /// These may be only part of a UTF-8 sequence.  To print ids as they're generated, use
    /// [`Self::stream_decoder`] instead.
    pub fn decode_one(&self, id: TokenId) -> Result<&[u8]> {
        self.params
            .vocab
            .bytes_for_id(id)
            .context(UnknownTokenIdSnafu { id })
    }

    /// Start decoding a stream of ids one at a time.
    pub fn stream_decoder(&self) -> StreamDecoder {
        StreamDecoder::new(self.clone())
    }

    /// Split text into the words that are encoded independently of each other.
    ///
    /// This is what [`Self::encode`] does first.  Mostly useful to see why some text tokenized
    /// the way it did.
    pub fn words<'a>(&'a self, text: &'a str) -> Words<'a, 'a> {
        self.params.pretokenizer.words(text)
    }
}

impl Tokenizer {
    /// Look up the id of a token, spelled the way the description file spells it (printable
    /// alphabet for base tokens, literal content for added tokens).
    pub fn token_to_id(&self, token: &str) -> Option<TokenId> {
        let vocab = &self.params.vocab;

        vocab
            .added_tokens()
            .iter()
            .find(|added| added.content == token)
            .map(|added| added.id)
            .or_else(|| vocab.id_for_bytes(self.params.symbols.decode_str(token)))
    }

    /// The inverse of [`Self::token_to_id`]
    pub fn id_to_token(&self, id: TokenId) -> Option<String> {
        let vocab = &self.params.vocab;

        match vocab.added_token(id) {
            Some(added) => Some(added.content.clone()),
            None => vocab
                .bytes_for_id(id)
                .map(|bytes| self.params.symbols.encode_bytes(bytes)),
        }
    }

    pub fn added_tokens(&self) -> &[AddedToken] {
        self.params.vocab.added_tokens()
    }

    pub fn tokenizer_type(&self) -> TokenizerType {
        self.params.typ
    }

    /// Number of distinct token ids, including added tokens
    pub fn vocab_size(&self) -> usize {
        self.params.vocab.len()
    }

    /// Number of distinct merge rules
    pub fn merge_count(&self) -> usize {
        self.params.ranks.len()
    }

    pub fn cache_policy(&self) -> CachePolicy {
        self.params.cache.policy()
    }

    /// Number of words currently cached.  Shared by all clones of this tokenizer.
    pub fn cache_len(&self) -> usize {
        self.params.cache.len()
    }

    /// Forget every cached word.  Doesn't change any results, only how fast they come back.
    pub fn clear_cache(&self) {
        self.params.cache.clear()
    }
}

impl Debug for Tokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tokenizer")
            .field("typ", &self.params.typ)
            .field("vocab_size", &self.vocab_size())
            .field("merges", &self.merge_count())
            .field("added_tokens", &self.added_tokens().len())
            .field("cache", &self.cache_policy())
            .finish()
    }
}
