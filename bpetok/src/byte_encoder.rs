//! The reversible mapping between raw byte values and the printable symbols that vocabulary and
//! merge files use to spell byte sequences.
//!
//! Byte-level BPE vocabularies are serialized as JSON strings, but tokens are arbitrary byte
//! sequences, including control bytes and fragments of multi-byte UTF-8 code points.  To make
//! them expressible (and matchable) as text, every byte value is assigned one visible Unicode
//! symbol.  Bytes which are already printable stand for themselves; the rest are moved up to
//! U+0100 and beyond, in ascending byte order.  So a space is `Ġ`, a newline is `Ċ`, and so on.
//!
//! The table must be an exact bijection.  A table that is off by one symbol still produces
//! plausible-looking token ids, they're just the wrong ones, so construction fails loudly rather
//! than let that through.
use crate::error::*;
use crate::{Result, TokenBytes};
use once_cell::sync::OnceCell;
use rustc_hash::FxHashMap as HashMap;

/// Number of distinct byte values, and so the number of symbols in the alphabet.
const ALPHABET_LEN: usize = 256;

/// First code point handed out to bytes that aren't printable on their own.
const FIRST_REMAPPED_SYMBOL: u32 = 256;

/// Bytes in these ranges are printable as-is and map to the code point with the same value:
/// printable ASCII without the space, and Latin-1 without NBSP and the soft hyphen.
const fn is_self_mapped(b: u8) -> bool {
    matches!(b, b'!'..=b'~' | 0xA1..=0xAC | 0xAE..=0xFF)
}

/// Bijection between the 256 byte values and a 256-symbol printable alphabet.
#[derive(Clone, Debug)]
pub struct ByteEncoder {
    symbols: [char; ALPHABET_LEN],
    bytes: HashMap<char, u8>,
}

impl ByteEncoder {
    /// The alphabet used by GPT-2 and everything derived from its vocabulary format, including
    /// GPT-NeoX and RWKV.
    ///
    /// Built and validated once per process.
    pub fn standard() -> Result<&'static ByteEncoder> {
        static INSTANCE: OnceCell<ByteEncoder> = OnceCell::new();

        INSTANCE.get_or_try_init(|| Self::from_symbols(standard_symbols()))
    }

    /// Build an encoder from an explicit symbol table, where the symbol at index `b` is the
    /// printable stand-in for byte `b`.
    ///
    /// Fails unless the table has exactly 256 entries, no symbol is repeated, and no symbol is
    /// whitespace (merge rules use a plain space to separate their two halves).
    pub fn from_symbols(symbols: impl IntoIterator<Item = char>) -> Result<Self> {
        let symbols: [char; ALPHABET_LEN] = symbols
            .into_iter()
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|symbols: Vec<char>| {
                InvalidByteTableSnafu {
                    reason: format!(
                        "expected {ALPHABET_LEN} symbols, found {}",
                        symbols.len()
                    ),
                }
                .build()
            })?;

        let mut bytes = HashMap::default();
        bytes.reserve(ALPHABET_LEN);

        for (byte, &symbol) in (0..=u8::MAX).zip(symbols.iter()) {
            if symbol.is_whitespace() {
                return InvalidByteTableSnafu {
                    reason: format!("byte {byte:#04x} maps to whitespace symbol {symbol:?}"),
                }
                .fail();
            }

            if let Some(previous) = bytes.insert(symbol, byte) {
                return InvalidByteTableSnafu {
                    reason: format!(
                        "symbol {symbol:?} is assigned to both {previous:#04x} and {byte:#04x}"
                    ),
                }
                .fail();
            }
        }

        Ok(Self { symbols, bytes })
    }

    /// The printable symbol standing in for `byte`.
    pub fn encode(&self, byte: u8) -> char {
        self.symbols[byte as usize]
    }

    /// The byte a printable symbol stands for, or `None` if `symbol` isn't in the alphabet.
    pub fn decode(&self, symbol: char) -> Option<u8> {
        self.bytes.get(&symbol).copied()
    }

    /// Spell a byte sequence in the printable alphabet, one symbol per byte.
    pub fn encode_bytes(&self, bytes: &[u8]) -> String {
        bytes.iter().map(|&b| self.encode(b)).collect()
    }

    /// Convert a string spelled in the printable alphabet back to the raw bytes it stands for.
    ///
    /// Characters outside the alphabet are kept as their own UTF-8 bytes.  Real vocabularies
    /// occasionally contain such keys (hand-added entries that were never byte-encoded) and they
    /// must not abort loading.
    pub fn decode_str(&self, symbols: &str) -> TokenBytes {
        let mut bytes = TokenBytes::with_capacity(symbols.len());
        let mut utf8 = [0u8; 4];

        for symbol in symbols.chars() {
            match self.decode(symbol) {
                Some(byte) => bytes.push(byte),
                None => bytes.extend_from_slice(symbol.encode_utf8(&mut utf8).as_bytes()),
            }
        }

        bytes
    }
}

/// The standard alphabet, in byte order.
///
/// Self-mapped bytes all fall below [`FIRST_REMAPPED_SYMBOL`], so the remaining bytes simply take
/// consecutive code points from there.
fn standard_symbols() -> impl Iterator<Item = char> {
    let mut next_remapped = FIRST_REMAPPED_SYMBOL;

    (0..=u8::MAX).map(move |byte| {
        if is_self_mapped(byte) {
            char::from(byte)
        } else {
            let code_point = next_remapped;
            next_remapped += 1;

            // Never hit for code points in this range; a bad value would be caught as a duplicate
            // by `from_symbols` anyway
            char::from_u32(code_point).unwrap_or(char::REPLACEMENT_CHARACTER)
        }
    })
}
