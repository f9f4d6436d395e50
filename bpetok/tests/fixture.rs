//! Encode and decode against a small but complete tokenizer description: all 256 byte symbols,
//! about a hundred trained merges, and two added tokens.
//!
//! The expected ids were recorded from a Python implementation of the same algorithm (word
//! splitting with the `regex` module) run on the same file.  It splits added tokens out before the
//! word pattern runs, like this crate does, so `"!<|endoftext|>"` is `"!"` then the added token.
//! A tokenizer that runs the word pattern first lets the symbol rule swallow `"!<|"` and encodes
//! that text as plain bytes instead; that case is the one deliberate difference.
use assert_matches::assert_matches;
use bpetok::{
    BpetokError, CachePolicy, ErrorKind, TokenId, Tokenizer, TokenizerDescription,
    TokenizerOptions, Word,
};
use proptest::prelude::*;
use std::path::PathBuf;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("test_data/tiny_tokenizer.json")
}

fn fixture() -> Tokenizer {
    Tokenizer::from_file(fixture_path()).unwrap()
}

fn fixture_with_cache(cache: CachePolicy) -> Tokenizer {
    Tokenizer::from_file_with_options(fixture_path(), TokenizerOptions { cache }).unwrap()
}

const GOLDEN: &[(&str, &[TokenId])] = &[
    ("", &[]),
    ("a", &[66]),
    ("Hello world!", &[41, 304, 268, 2]),
    ("\nHello world!", &[200, 41, 304, 268, 2]),
    ("<|endoftext|>", &[0]),
    ("hello<|endoftext|>world", &[258, 270, 0, 88, 80, 83, 265]),
    ("!<|endoftext|>", &[2, 0]),
    ("<|padding|><|endoftext|>", &[1, 0]),
    ("hello hello hello", &[258, 270, 288, 288]),
    ("hello\r\nworld", &[258, 270, 203, 200, 88, 80, 83, 265]),
    (
        "The dragons spoke perfect English.",
        &[
            306, 292, 271, 81, 80, 349, 294, 355, 71, 70, 68, 85, 222, 38, 79, 72, 77, 303, 73, 15,
        ],
    ),
    (
        "The quick brown fox jumps over the lazy dog.",
        &[
            306, 336, 339, 83, 80, 88, 79, 321, 222, 75, 345, 81, 84, 337, 279, 83, 260, 287, 91,
            90, 323, 15,
        ],
    ),
    ("Café 東京 2024", &[36, 356, 222, 299, 326, 21]),
    ("東京", &[299]),
    ("naïve café", &[79, 66, 129, 109, 279, 338, 356]),
    (
        "  leading   spaces\n\n",
        &[222, 272, 70, 66, 69, 281, 277, 271, 81, 66, 68, 70, 84, 200, 200],
    ),
    ("they're I'm it's", &[85, 258, 90, 8, 262, 341, 8, 78, 222, 74, 85, 358]),
    ("\t x", &[199, 222, 89]),
];

#[test]
fn encodes_like_the_reference() {
    let tokenizer = fixture();

    for (text, expected) in GOLDEN {
        assert_eq!(
            expected.to_vec(),
            tokenizer.encode(text).unwrap(),
            "encoding {text:?}"
        );
    }
}

#[test]
fn golden_ids_decode_to_their_text() {
    let tokenizer = fixture();

    for (text, ids) in GOLDEN {
        assert_eq!(*text, tokenizer.decode(ids).unwrap());
    }
}

#[test]
fn segments_like_the_reference() {
    let tokenizer = fixture();

    let words = |text| {
        tokenizer
            .words(text)
            .map(|word| word.unwrap().as_str().to_string())
            .collect::<Vec<_>>()
    };

    assert_eq!(vec!["Hello", " world", "!"], words("Hello world!"));
    assert_eq!(vec!["hello", "\r", "\n", "world"], words("hello\r\nworld"));
    assert_eq!(vec!["\t", " x"], words("\t x"));
    assert_eq!(
        vec![
            Word::Text("hello"),
            Word::Added {
                text: "<|endoftext|>",
                id: 0
            },
            Word::Text("world")
        ],
        tokenizer
            .words("hello<|endoftext|>world")
            .collect::<Result<Vec<_>, _>>()
            .unwrap()
    );
}

#[test]
fn fixture_metadata() {
    let tokenizer = fixture();

    assert_eq!(359, tokenizer.vocab_size());
    assert_eq!(101, tokenizer.merge_count());
    assert_eq!(
        vec!["<|endoftext|>", "<|padding|>"],
        tokenizer
            .added_tokens()
            .iter()
            .map(|token| token.content.as_str())
            .collect::<Vec<_>>()
    );
    assert!(tokenizer.added_tokens().iter().all(|token| token.special));

    assert_eq!(Some(258), tokenizer.token_to_id("he"));
    assert_eq!(Some(260), tokenizer.token_to_id("Ġthe"));
    assert_eq!(Some(200), tokenizer.token_to_id("Ċ"));
    assert_eq!(Some(1), tokenizer.token_to_id("<|padding|>"));
    assert_eq!(Some("Ġt".to_string()), tokenizer.id_to_token(259));
    assert_eq!(Some("Ġ".to_string()), tokenizer.id_to_token(222));
}

#[test]
fn single_ids_can_be_partial_code_points() {
    let tokenizer = fixture();

    // 'ï' is 0xC3 0xAF, and no merge joins those two bytes
    assert_eq!(&[0xC3], tokenizer.decode_one(129).unwrap());
    assert_eq!(&[0xAF], tokenizer.decode_one(109).unwrap());
    assert_eq!("\u{FFFD}", tokenizer.decode(&[129]).unwrap());
    assert_eq!(vec![0xC3], tokenizer.decode_to_bytes(&[129]).unwrap());

    let mut stream = tokenizer.stream_decoder();
    assert_eq!(Some("n".to_string()), stream.push(79).unwrap());
    assert_eq!(Some("a".to_string()), stream.push(66).unwrap());
    assert_eq!(None, stream.push(129).unwrap());
    assert_eq!(Some("ï".to_string()), stream.push(109).unwrap());
}

#[test]
fn cache_fills_with_distinct_words() {
    let tokenizer = fixture();

    tokenizer.encode("hello hello hello<|endoftext|>").unwrap();

    // "hello" and " hello"
    assert_eq!(2, tokenizer.cache_len());
}

#[test]
fn pair_format_merges_load_the_same_tokenizer() {
    let json = std::fs::read_to_string(fixture_path()).unwrap();
    let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let merges = value["model"]["merges"].as_array_mut().unwrap();
    for merge in merges.iter_mut() {
        let (left, right) = merge.as_str().unwrap().split_once(' ').unwrap();
        *merge = serde_json::json!([left, right]);
    }
    let pairs = Tokenizer::from_slice(&serde_json::to_vec(&value).unwrap()).unwrap();
    let joined = fixture();

    assert_eq!(joined.merge_count(), pairs.merge_count());
    for (text, _) in GOLDEN {
        assert_eq!(joined.encode(text).unwrap(), pairs.encode(text).unwrap());
    }
}

#[test]
fn greedy_merge_example() {
    let tokenizer = Tokenizer::from_slice(
        br#"{ "model": { "type": "BPE", "vocab": { "a": 0, "b": 1, "ab": 2 }, "merges": [ "a b" ] } }"#,
    )
    .unwrap();

    assert_eq!(vec![2], tokenizer.encode("ab").unwrap());
}

#[test]
fn repeated_merge_takes_its_last_rank() {
    // "b c" listed first and last ranks after "a b"
    let tokenizer = Tokenizer::from_slice(
        br#"{ "added_tokens": [ { "id": 5, "content": "<|x|>" } ],
              "model": { "type": "BPE",
                         "vocab": { "a": 0, "b": 1, "c": 2, "ab": 3, "bc": 4 },
                         "merges": [ "b c", "a b", "b c" ] } }"#,
    )
    .unwrap();

    assert_eq!(2, tokenizer.merge_count());
    assert_eq!(vec![3, 2], tokenizer.encode("abc").unwrap());
    assert_eq!(vec![4, 0], tokenizer.encode("bca").unwrap());
}

#[test]
fn first_declared_duplicate_key_wins() {
    // 'Ā' is the printable spelling of NUL; a literal NUL key spells the same byte
    let tokenizer = Tokenizer::from_slice(
        r#"{ "model": { "type": "BPE", "vocab": { "Ā": 0, "\u0000": 5 }, "merges": [] } }"#
            .as_bytes(),
    )
    .unwrap();

    assert_eq!(vec![0], tokenizer.encode("\u{0}").unwrap());
    assert_eq!("\u{0}", tokenizer.decode(&[5]).unwrap());
}

#[test]
fn out_of_vocabulary_symbol_is_an_error() {
    let tokenizer = Tokenizer::from_slice(
        br#"{ "model": { "type": "BPE", "vocab": { "a": 0, "b": 1 }, "merges": [ "a b" ] } }"#,
    )
    .unwrap();

    let err = tokenizer.encode("ab").unwrap_err();

    assert_matches!(&err, BpetokError::OutOfVocabulary { symbol, word } if symbol == "ab" && word == "ab");
    assert_eq!(ErrorKind::OutOfVocabulary, err.kind());
}

#[test]
fn load_failures_are_config_errors() {
    let unsupported = br#"{ "model": { "type": "Unigram", "vocab": {}, "merges": [] } }"#;
    let malformed_merge = br#"{ "model": { "type": "BPE", "vocab": {}, "merges": [ "ab" ] } }"#;
    let empty_added = br#"{ "added_tokens": [ { "id": 0, "content": "" } ],
        "model": { "type": "BPE", "vocab": {}, "merges": [] } }"#;

    assert_matches!(
        Tokenizer::from_slice(unsupported),
        Err(BpetokError::UnsupportedTokenizerType { .. })
    );
    assert_matches!(
        Tokenizer::from_slice(malformed_merge),
        Err(BpetokError::MalformedMerge { index: 0, .. })
    );
    assert_matches!(
        Tokenizer::from_slice(empty_added),
        Err(BpetokError::EmptyAddedToken { id: 0 })
    );
    assert_matches!(
        Tokenizer::from_slice(b"{ \"model\": "),
        Err(BpetokError::ParseDescription { .. })
    );

    for bytes in [&unsupported[..], &malformed_merge[..], &empty_added[..]] {
        assert_eq!(ErrorKind::Config, Tokenizer::from_slice(bytes).unwrap_err().kind());
    }
}

#[test]
fn loads_from_a_copied_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokenizer.json");
    std::fs::copy(fixture_path(), &path).unwrap();

    let desc = TokenizerDescription::from_file(&path).unwrap();
    let tokenizer = Tokenizer::from_description(&desc, TokenizerOptions::default()).unwrap();

    assert_eq!(vec![41, 304, 268, 2], tokenizer.encode("Hello world!").unwrap());

    std::fs::remove_file(&path).unwrap();
    assert_matches!(
        Tokenizer::from_file(&path),
        Err(BpetokError::ReadDescription { .. })
    );
}

proptest! {
    #[test]
    fn round_trips_any_text(text in "\\PC*") {
        let tokenizer = fixture();

        let ids = tokenizer.encode(&text).unwrap();
        prop_assert_eq!(&text, &tokenizer.decode(&ids).unwrap());
    }

    #[test]
    fn round_trips_text_with_added_tokens(
        parts in proptest::collection::vec(
            prop_oneof!["[a-z ]{0,8}", Just("<|endoftext|>".to_string()), Just("<|padding|>".to_string())],
            0..8
        )
    ) {
        let tokenizer = fixture();
        let text = parts.concat();

        let ids = tokenizer.encode(&text).unwrap();
        prop_assert_eq!(&text, &tokenizer.decode(&ids).unwrap());
    }

    #[test]
    fn cached_and_uncached_encodes_agree(text in "\\PC*") {
        let cached = fixture_with_cache(CachePolicy::Unbounded);
        let uncached = fixture_with_cache(CachePolicy::Disabled);

        let first = cached.encode(&text).unwrap();
        let second = cached.encode(&text).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &uncached.encode(&text).unwrap());
    }

    #[test]
    fn streaming_matches_whole_decode(text in "\\PC*") {
        let tokenizer = fixture();
        let ids = tokenizer.encode(&text).unwrap();

        let mut stream = tokenizer.stream_decoder();
        let mut streamed = String::new();
        for id in &ids {
            streamed.extend(stream.push(*id).unwrap());
        }
        streamed.push_str(&stream.finish());

        prop_assert_eq!(text, streamed);
    }
}
