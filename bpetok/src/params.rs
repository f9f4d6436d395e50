use crate::bpe::byte_pair_encode;
use crate::cache::WordCache;
use crate::merges::MergeRankTable;
use crate::{
    ByteEncoder, PreTokenizer, Result, TokenId, TokenizerDescription, TokenizerOptions,
    TokenizerType, Vocabulary,
};
use std::sync::Arc;
use tracing::*;

/// Everything a loaded tokenizer needs, built once from a description.
///
/// Only the word cache changes after construction.
pub(crate) struct TokenizerParams {
    pub(crate) typ: TokenizerType,

    /// Byte ↔ printable symbol table the vocabulary and merges are spelled in
    pub(crate) symbols: &'static ByteEncoder,

    pub(crate) vocab: Vocabulary,

    pub(crate) ranks: MergeRankTable,

    /// Splits text into words, added tokens first
    pub(crate) pretokenizer: PreTokenizer,

    /// Word → ids memo for [`Self::encode_word`]
    pub(crate) cache: WordCache,
}

impl TokenizerParams {
    pub(crate) fn new(desc: &TokenizerDescription, options: &TokenizerOptions) -> Result<Self> {
        let typ = desc.tokenizer_type()?;
        let symbols = ByteEncoder::standard()?;

        // Merge halves are spelled in the printable alphabet, same as vocabulary keys
        let ranks = MergeRankTable::new(
            desc.merge_halves()?
                .into_iter()
                .map(|(left, right)| (symbols.decode_str(left), symbols.decode_str(right))),
        );

        let vocab = Vocabulary::new(
            symbols,
            desc.model.vocab.iter().map(|(key, id)| (key, *id)),
            desc.added_tokens.iter().cloned(),
        )?;

        let pretokenizer = PreTokenizer::new(vocab.added_tokens())?;

        debug!(
            %typ,
            vocab_size = vocab.len(),
            merges = ranks.len(),
            added_tokens = vocab.added_tokens().len(),
            cache = ?options.cache,
            "loaded tokenizer"
        );

        Ok(Self {
            typ,
            symbols,
            vocab,
            ranks,
            pretokenizer,
            cache: WordCache::new(options.cache),
        })
    }

    /// Ids for one word that isn't an added token, from the cache when possible.
    pub(crate) fn encode_word(&self, word: &str) -> Result<Arc<[TokenId]>> {
        if let Some(ids) = self.cache.get(word) {
            return Ok(ids);
        }

        trace!(word, "word cache miss");
        let ids: Arc<[TokenId]> =
            byte_pair_encode(word.as_bytes(), &self.ranks, &self.vocab, self.symbols)?.into();
        self.cache.insert(word, ids.clone());

        Ok(ids)
    }
}
