//! Record codec: SaveRecord <-> storable blob
//!
//! A record is first written as compact JSON, then shrunk with a fixed
//! compression dictionary: well-known object keys and the bare literals
//! `null`, `true` and `false` are replaced by a two-character code made of
//! the sigil `~` followed by one character from `CODE_ALPHABET`.
//!
//! Substitution works on whole JSON tokens found by a string-aware scan:
//! - a key is only replaced when the complete `"key":` token matches
//! - string contents are copied verbatim, so player-visible text that
//!   happens to contain `null`, `"name":` or `~a` is never rewritten
//!
//! Outside of string literals compact JSON only contains structural
//! characters, digits and the three literals, so the sigil can never be
//! confused with real data there.
//!
//! # Rust Learning Notes
//!
//! The scanners work on bytes rather than chars. Every structural character
//! JSON cares about is ASCII, and UTF-8 guarantees that no byte of a
//! multi-byte character falls in the ASCII range, so slicing at a quote or
//! backslash position is always on a char boundary.

use serde_json::Value;

use super::error::SaveError;
use super::types::{INVENTORY_SIZE, SaveRecord};

/// Marks a compressed token
pub const SIGIL: char = '~';

/// Code characters, assigned to dictionary entries in order
const CODE_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// A substitutable JSON token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token {
    /// An object key, matched as the whole `"key":` sequence
    Key(&'static str),
    /// A bare literal outside of any string
    Literal(&'static str),
}

/// The compression dictionary
///
/// Entry `i` is encoded as `~` + `CODE_ALPHABET[i]`. Append only: reordering
/// or removing entries changes the meaning of every existing blob.
const DICTIONARY: &[Token] = &[
    Token::Key("metadata"),
    Token::Key("version"),
    Token::Key("timestamp"),
    Token::Key("playtime"),
    Token::Key("location"),
    Token::Key("party_level"),
    Token::Key("preview"),
    Token::Key("party"),
    Token::Key("characters"),
    Token::Key("formation"),
    Token::Key("front"),
    Token::Key("back"),
    Token::Key("gold"),
    Token::Key("id"),
    Token::Key("name"),
    Token::Key("class"),
    Token::Key("level"),
    Token::Key("stats"),
    Token::Key("equipment"),
    Token::Key("hp"),
    Token::Key("mp"),
    Token::Key("current"),
    Token::Key("max"),
    Token::Key("attack"),
    Token::Key("defense"),
    Token::Key("speed"),
    Token::Key("magic"),
    Token::Key("inventory"),
    Token::Key("slots"),
    Token::Key("item"),
    Token::Key("quantity"),
    Token::Key("type"),
    Token::Key("world"),
    Token::Key("zone"),
    Token::Key("floor"),
    Token::Key("position"),
    Token::Key("x"),
    Token::Key("z"),
    Token::Key("direction"),
    Token::Key("visited"),
    Token::Key("cleared"),
    Token::Key("opened"),
    Token::Key("progress"),
    Token::Key("completed_quests"),
    Token::Key("unlocked_areas"),
    Token::Key("defeated_bosses"),
    Token::Key("game_started_at"),
    Token::Key("last_saved_at"),
    Token::Key("settings"),
    Token::Key("difficulty"),
    Token::Key("auto_save"),
    Token::Key("auto_save_interval_secs"),
    Token::Literal("null"),
    Token::Literal("true"),
    Token::Literal("false"),
];

fn code_where(matches: impl Fn(&Token) -> bool) -> Option<char> {
    DICTIONARY
        .iter()
        .position(matches)
        .map(|index| CODE_ALPHABET[index] as char)
}

fn key_code(key: &str) -> Option<char> {
    code_where(|entry| matches!(entry, Token::Key(name) if *name == key))
}

fn literal_code(word: &str) -> Option<char> {
    code_where(|entry| matches!(entry, Token::Literal(literal) if *literal == word))
}

fn token_for(code: u8) -> Option<Token> {
    CODE_ALPHABET
        .iter()
        .position(|c| *c == code)
        .and_then(|index| DICTIONARY.get(index).copied())
}

/// Index just past the closing quote of the string starting at `start`
///
/// Returns `None` for an unterminated string.
fn string_end(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

/// Pushes the char at `i` and returns the index after it
fn copy_char(text: &str, i: usize, out: &mut String) -> usize {
    match text[i..].chars().next() {
        Some(ch) => {
            out.push(ch);
            i + ch.len_utf8()
        }
        None => text.len(),
    }
}

/// Applies the compression dictionary to compact JSON text
pub fn compress(json: &str) -> String {
    let bytes = json.as_bytes();
    let mut out = String::with_capacity(json.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let Some(end) = string_end(bytes, i) else {
                    out.push_str(&json[i..]);
                    break;
                };
                if bytes.get(end) == Some(&b':') {
                    if let Some(code) = key_code(&json[i + 1..end - 1]) {
                        out.push(SIGIL);
                        out.push(code);
                        i = end + 1;
                        continue;
                    }
                }
                out.push_str(&json[i..end]);
                i = end;
            }
            b if b.is_ascii_alphabetic() => {
                let start = i;
                while i < bytes.len() && bytes[i].is_ascii_alphabetic() {
                    i += 1;
                }
                let word = &json[start..i];
                match literal_code(word) {
                    Some(code) => {
                        out.push(SIGIL);
                        out.push(code);
                    }
                    None => out.push_str(word),
                }
            }
            _ => i = copy_char(json, i, &mut out),
        }
    }

    out
}

/// Reverses `compress`
///
/// Fails on a sigil that isn't followed by a known code. Anything else that
/// is wrong with the text is left for the JSON parser to reject.
pub fn decompress(text: &str) -> Result<String, SaveError> {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() * 2);
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                let Some(end) = string_end(bytes, i) else {
                    out.push_str(&text[i..]);
                    break;
                };
                out.push_str(&text[i..end]);
                i = end;
            }
            b if b == SIGIL as u8 => {
                let code = bytes.get(i + 1).copied().ok_or_else(|| {
                    SaveError::DeserializationError("blob ends inside a compressed token".to_string())
                })?;
                match token_for(code) {
                    Some(Token::Key(name)) => {
                        out.push('"');
                        out.push_str(name);
                        out.push_str("\":");
                    }
                    Some(Token::Literal(word)) => out.push_str(word),
                    None => {
                        return Err(SaveError::DeserializationError(format!(
                            "unknown compression code at byte {}",
                            i
                        )));
                    }
                }
                i += 2;
            }
            _ => i = copy_char(text, i, &mut out),
        }
    }

    Ok(out)
}

/// Serializes a record into a storable blob
pub fn serialize(record: &SaveRecord) -> Result<Vec<u8>, SaveError> {
    let json = serde_json::to_string(record)?;
    Ok(compress(&json).into_bytes())
}

/// Encodes arbitrary structured data the same way `serialize` encodes a record
pub fn encode_value(value: &Value) -> Result<Vec<u8>, SaveError> {
    let json = serde_json::to_string(value)?;
    Ok(compress(&json).into_bytes())
}

/// Decodes a blob into raw structured data
///
/// The inventory slot array, when present, is padded with empty slots or
/// truncated to exactly `INVENTORY_SIZE` entries. No other normalization is
/// applied; judging the data is the validator's job.
pub fn decode_value(blob: &[u8]) -> Result<Value, SaveError> {
    let text = std::str::from_utf8(blob)
        .map_err(|e| SaveError::DeserializationError(format!("blob is not UTF-8: {}", e)))?;
    let json = decompress(text)?;
    let mut value: Value = serde_json::from_str(&json)
        .map_err(|e| SaveError::DeserializationError(e.to_string()))?;

    if let Some(slots) = value
        .pointer_mut("/inventory/slots")
        .and_then(Value::as_array_mut)
    {
        slots.resize(INVENTORY_SIZE, Value::Null);
    }

    Ok(value)
}

/// Rebuilds a typed record from decoded data
pub fn record_from_value(value: Value) -> Result<SaveRecord, SaveError> {
    serde_json::from_value(value).map_err(|e| SaveError::DeserializationError(e.to_string()))
}

/// Deserializes a blob produced by `serialize`
pub fn deserialize(blob: &[u8]) -> Result<SaveRecord, SaveError> {
    record_from_value(decode_value(blob)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::save::test_support::sample_record;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_dictionary_fits_alphabet() {
        assert!(DICTIONARY.len() <= CODE_ALPHABET.len());
    }

    #[test]
    fn test_dictionary_has_no_duplicates() {
        for (i, a) in DICTIONARY.iter().enumerate() {
            for b in &DICTIONARY[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_compress_replaces_keys_and_literals() {
        let compressed = compress(r#"{"gold":150,"preview":null,"auto_save":true}"#);
        assert_eq!(compressed, "{~m150,~g~0,~Y~1}");
        assert_eq!(
            decompress(&compressed).unwrap(),
            r#"{"gold":150,"preview":null,"auto_save":true}"#
        );
    }

    #[test]
    fn test_compress_leaves_string_contents_alone() {
        let json = r#"{"name":"null \"name\": ~a true","zone":"false"}"#;
        let compressed = compress(json);

        assert!(compressed.contains(r#""null \"name\": ~a true""#));
        assert!(compressed.contains(r#""false""#));
        assert_eq!(decompress(&compressed).unwrap(), json);
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let json = r#"{"weapon":{"id":"sword"}}"#;
        let compressed = compress(json);
        assert!(compressed.starts_with(r#"{"weapon":"#));
        assert_eq!(decompress(&compressed).unwrap(), json);
    }

    #[test]
    fn test_exponent_numbers_survive() {
        let json = r#"{"x":1e300,"z":-2.5e-7}"#;
        assert_eq!(decompress(&compress(json)).unwrap(), json);
    }

    #[test]
    fn test_serialized_blob_is_smaller() {
        let record = sample_record();
        let json = serde_json::to_string(&record).unwrap();
        let blob = serialize(&record).unwrap();
        assert!(blob.len() < json.len());
    }

    #[test]
    fn test_round_trip() {
        let record = sample_record();
        let blob = serialize(&record).unwrap();
        let loaded = deserialize(&blob).unwrap();
        assert_eq!(loaded, record);
    }

    #[test]
    fn test_decode_pads_short_inventory() {
        let mut value = serde_json::to_value(sample_record()).unwrap();
        value["inventory"]["slots"] = json!(vec![Value::Null; 35]);

        let decoded = decode_value(&encode_value(&value).unwrap()).unwrap();
        assert_eq!(decoded["inventory"]["slots"].as_array().unwrap().len(), INVENTORY_SIZE);

        let record = record_from_value(decoded).unwrap();
        assert_eq!(record.inventory.slots.len(), INVENTORY_SIZE);
    }

    #[test]
    fn test_decode_truncates_long_inventory() {
        let mut value = serde_json::to_value(sample_record()).unwrap();
        let mut slots = vec![Value::Null; 45];
        slots[44] = json!({ "item": { "id": "x", "name": "X", "type": "junk" }, "quantity": 1 });
        value["inventory"]["slots"] = Value::Array(slots);

        let record = deserialize(&encode_value(&value).unwrap()).unwrap();
        assert_eq!(record.inventory.slots.len(), INVENTORY_SIZE);
        assert!(record.inventory.slots.iter().all(Option::is_none));
    }

    #[test]
    fn test_truncated_blob_is_a_deserialization_error() {
        let blob = serialize(&sample_record()).unwrap();
        let truncated = &blob[..blob.len() / 2];

        match deserialize(truncated) {
            Err(SaveError::DeserializationError(_)) => {}
            other => panic!("expected DeserializationError, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_code_is_rejected() {
        assert!(matches!(
            decompress("{~!1}"),
            Err(SaveError::DeserializationError(_))
        ));
        assert!(matches!(
            decompress("{~"),
            Err(SaveError::DeserializationError(_))
        ));
    }

    #[test]
    fn test_garbage_bytes_are_rejected() {
        assert!(matches!(
            deserialize(&[0xff, 0xfe, 0x00]),
            Err(SaveError::DeserializationError(_))
        ));
        assert!(matches!(
            deserialize(b"not a save"),
            Err(SaveError::DeserializationError(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_text_round_trips(name in any::<String>(), location in "[a-z~\" :]{0,24}") {
            let mut record = sample_record();
            record.metadata.location = location;
            if let Some(Some(first)) = record.party.characters.first_mut() {
                first.name = name;
            }

            let loaded = deserialize(&serialize(&record).unwrap()).unwrap();
            prop_assert_eq!(loaded, record);
        }

        #[test]
        fn prop_gold_and_position_round_trip(gold in 0u64..1_000_000, x in -40_000i32..40_000, z in -40_000i32..40_000) {
            let mut record = sample_record();
            record.party.gold = gold;
            record.inventory.gold = gold;
            // Quarter steps are exact in binary, so text round-trips are too
            record.world.position.x = f64::from(x) / 4.0;
            record.world.position.z = f64::from(z) / 4.0;

            let loaded = deserialize(&serialize(&record).unwrap()).unwrap();
            prop_assert_eq!(loaded, record);
        }
    }
}
