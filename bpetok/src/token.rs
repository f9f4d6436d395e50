/// A token output by the tokenizer, represented in its integer form.
///
/// This is the id the model was trained against.  Base-vocabulary ids are dense from 0, but once
/// added tokens are included the id space is allowed to have holes, so don't assume every value
/// below [`crate::Tokenizer::vocab_size`] is in use.
pub type TokenId = u32;

/// A token in its raw byte string form.
///
/// The vocabulary file spells tokens in the printable alphabet of [`crate::ByteEncoder`], but
/// internally every lookup is done on the raw bytes those symbols stand for.  A single token's
/// bytes are not necessarily valid UTF-8 on their own; only a complete sequence of tokens
/// produced from a string is guaranteed to be.
pub type TokenBytes = Vec<u8>;
