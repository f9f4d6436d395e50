use crate::TokenId;
use snafu::Snafu;
use std::path::PathBuf;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BpetokError {
    #[snafu(display("Error reading tokenizer description '{}'", path.display()))]
    ReadDescription {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("Tokenizer description is malformed"))]
    ParseDescription { source: serde_json::Error },

    #[snafu(display(
        "Tokenizer type '{typ}' isn't supported; supported types are: {}",
        crate::TokenizerType::supported().join(", ")
    ))]
    UnsupportedTokenizerType { typ: String },

    #[snafu(display("Merge rule #{index} '{merge}' is not a pair of two symbols"))]
    MalformedMerge { index: usize, merge: String },

    #[snafu(display("Added token {id} has empty content"))]
    EmptyAddedToken { id: TokenId },

    #[snafu(display("Word splitting pattern failed to compile"))]
    InvalidPattern { source: fancy_regex::Error },

    #[snafu(display("Byte-to-symbol table is not a bijection: {reason}"))]
    InvalidByteTable { reason: String },

    #[snafu(display("Symbol '{symbol}' produced while encoding word '{word}' is not in the vocabulary"))]
    OutOfVocabulary { symbol: String, word: String },

    #[snafu(display("Token id {id} is not part of this vocabulary"))]
    UnknownTokenId { id: TokenId },

    #[snafu(display("Word splitting failed while scanning input text"))]
    Segmentation { source: fancy_regex::Error },
}

/// Coarse classification of a [`BpetokError`].
///
/// None of these are transient.  Every failure is a deterministic function of the tokenizer
/// description and the input, so retrying the same call will fail the same way.
#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
pub enum ErrorKind {
    /// The tokenizer description couldn't be read, parsed, or is of an unsupported type.
    Config,

    /// The byte-to-symbol table failed its self check.
    Validation,

    /// A word reduced to a symbol that has no vocabulary id.
    OutOfVocabulary,

    /// The caller passed something this tokenizer can't act on, like an unknown token id.
    Usage,
}

impl BpetokError {
    pub fn kind(&self) -> ErrorKind {
        use BpetokError::*;
        match self {
            ReadDescription { .. }
            | ParseDescription { .. }
            | UnsupportedTokenizerType { .. }
            | MalformedMerge { .. }
            | EmptyAddedToken { .. }
            | InvalidPattern { .. } => ErrorKind::Config,
            InvalidByteTable { .. } => ErrorKind::Validation,
            OutOfVocabulary { .. } => ErrorKind::OutOfVocabulary,
            UnknownTokenId { .. } | Segmentation { .. } => ErrorKind::Usage,
        }
    }
}
