//! Splitting input text into the "words" that the BPE merge loop encodes independently.
//!
//! Added tokens are found first, with a leftmost-longest literal matcher.  The text between them
//! is then split with the GPT-2 word pattern, which recognizes, in priority order, English
//! contractions, letter runs, digit runs, and runs of other symbols (each optionally preceded by
//! a single space), then whitespace not attached to a following word, then any other
//! whitespace.
//!
//! Segmentation is lazy: [`Words`] finds one match at a time and never looks past the end of the
//! word it's about to return, except for the single-character lookahead in the whitespace rule.
use crate::error::*;
use crate::{AddedToken, Result, TokenId};
use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};
use snafu::ResultExt;

/// The word splitting pattern used by GPT-2 and the vocabularies derived from it.
///
/// The `(?!\S)` lookahead is what makes `"a   b"` split as `"a"`, `"  "`, `" b"`: the last
/// space stays attached to the next word.  That needs backtracking, which is why this is
/// compiled with `fancy_regex` rather than `regex`.
///
/// `\s` is the Unicode `White_Space` property: U+0085 counts as whitespace, U+FEFF does not.
pub const WORD_PATTERN: &str =
    r"'s|'t|'re|'ve|'m|'ll|'d| ?\p{L}+| ?\p{N}+| ?[^\s\p{L}\p{N}]+|\s+(?!\S)|\s+";

/// One independently-encoded piece of the input.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Word<'t> {
    /// Literal occurrence of an added token
    Added { text: &'t str, id: TokenId },

    /// Anything else; encoded with the merge algorithm
    Text(&'t str),
}

impl<'t> Word<'t> {
    pub fn as_str(&self) -> &'t str {
        match self {
            Word::Added { text, .. } => text,
            Word::Text(text) => text,
        }
    }
}

pub struct PreTokenizer {
    /// Word pattern for everything that isn't an added token
    regex: fancy_regex::Regex,

    /// A/C automaton over added-token contents.  `None` when there are no added tokens.
    added_finder: Option<AhoCorasick>,

    /// Token id for each pattern index in `added_finder`
    added_ids: Vec<TokenId>,
}

impl PreTokenizer {
    /// Make a pre-tokenizer that recognizes `added_tokens` and otherwise splits with
    /// [`WORD_PATTERN`].
    ///
    /// If two added tokens share the same content, the first one declared wins.
    pub fn new<'a>(added_tokens: impl IntoIterator<Item = &'a AddedToken>) -> Result<Self> {
        Self::with_pattern(WORD_PATTERN, added_tokens)
    }

    /// Like [`Self::new`] with a custom word pattern.
    ///
    /// The pattern must match every non-empty input somewhere; any text it skips over is still
    /// returned as a word of its own, so nothing is ever dropped.
    pub fn with_pattern<'a>(
        pattern: &str,
        added_tokens: impl IntoIterator<Item = &'a AddedToken>,
    ) -> Result<Self> {
        let regex = fancy_regex::Regex::new(pattern).context(InvalidPatternSnafu)?;

        let mut contents: Vec<&str> = Vec::new();
        let mut added_ids = Vec::new();
        for token in added_tokens {
            if !contents.contains(&token.content.as_str()) {
                contents.push(&token.content);
                added_ids.push(token.id);
            }
        }

        let added_finder = if contents.is_empty() {
            None
        } else {
            Some(
                AhoCorasickBuilder::new()
                    .match_kind(MatchKind::LeftmostLongest)
                    .dfa(true)
                    .build(contents),
            )
        };

        Ok(Self {
            regex,
            added_finder,
            added_ids,
        })
    }

    /// Lazily split `text` into words.
    ///
    /// Calling this again on the same text starts over from the beginning.
    pub fn words<'p, 't>(&'p self, text: &'t str) -> Words<'p, 't> {
        Words {
            pre: self,
            text,
            pos: 0,
            upcoming_added: None,
        }
    }

    /// The regex source used for non-added text
    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// An added token occurrence, as byte offsets into the whole text
#[derive(Clone, Copy, Debug)]
struct AddedMatch {
    start: usize,
    end: usize,
    id: TokenId,
}

/// Iterator over the words in a text.  See [`PreTokenizer::words`].
#[derive(Clone)]
pub struct Words<'p, 't> {
    pre: &'p PreTokenizer,
    text: &'t str,

    /// Offset into `text` where the next word starts
    pos: usize,

    /// Next added token at or after `pos`, once it has been searched for.  `Some(None)` means
    /// there are no more.
    upcoming_added: Option<Option<AddedMatch>>,
}

impl<'p, 't> Words<'p, 't> {
    /// `pos` never moves past an added token without consuming it, so a cached match stays
    /// valid until it's returned.
    fn upcoming_added(&mut self) -> Option<AddedMatch> {
        let (pre, text, pos) = (self.pre, self.text, self.pos);
        *self.upcoming_added.get_or_insert_with(|| {
            let finder = pre.added_finder.as_ref()?;
            let m = finder.find(&text[pos..])?;

            Some(AddedMatch {
                start: pos + m.start(),
                end: pos + m.end(),
                id: pre.added_ids[m.pattern()],
            })
        })
    }
}

impl<'p, 't> Iterator for Words<'p, 't> {
    type Item = Result<Word<'t>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.text.len() {
            return None;
        }

        let upcoming = self.upcoming_added();
        if let Some(added) = upcoming.filter(|m| m.start == self.pos) {
            self.pos = added.end;
            self.upcoming_added = None;

            return Some(Ok(Word::Added {
                text: &self.text[added.start..added.end],
                id: added.id,
            }));
        }

        // The word pattern only sees text up to the next added token, so its lookahead treats
        // that boundary like the end of input
        let limit = upcoming.map_or(self.text.len(), |m| m.start);
        let segment = &self.text[..limit];

        match self.pre.regex.find_from_pos(segment, self.pos) {
            Ok(Some(m)) if m.end() > self.pos => {
                // Anything the pattern skipped over before the match is a word of its own
                let start = if m.start() > self.pos { self.pos } else { m.start() };
                let end = if m.start() > self.pos { m.start() } else { m.end() };
                self.pos = end;

                Some(Ok(Word::Text(&self.text[start..end])))
            }
            Ok(_) => {
                let rest = &self.text[self.pos..limit];
                self.pos = limit;

                Some(Ok(Word::Text(rest)))
            }
            Err(e) => {
                // No way to resume after the engine gives up, so this iterator is done
                self.pos = self.text.len();

                Some(Err(BpetokError::Segmentation { source: e }))
            }
        }
    }
}
