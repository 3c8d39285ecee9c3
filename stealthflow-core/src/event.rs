//! Cairo serialization of the `Announcement` event and `announce` call.
//!
//! Event layout:
//!
//! ```text
//! keys: [selector, scheme_id_low, scheme_id_high, view_tag]
//! data: [eph_len, eph_0 .. eph_n, ct_len, ct_0 .. ct_m, caller]
//! ```
//!
//! The ephemeral key array holds either `[x, y]` or the 128-bit halves
//! `[x_low, x_high, y_low, y_high]`. Every length is checked against the
//! remaining data before it is used.

use serde::{Deserialize, Serialize};

use crate::constants::{
    ANNOUNCEMENT_EVENT_KEYS, EPHEMERAL_WORDS_PACKED, EPHEMERAL_WORDS_SPLIT, MAX_CIPHERTEXT_WORDS,
};
use crate::error::{Result, StealthFlowError};
use crate::types::{AnnouncementPayload, AnnouncementRecord, Point, U256};

/// A raw event as returned by a Starknet node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Indexed keys
    pub keys: Vec<U256>,
    /// Non-indexed data
    pub data: Vec<U256>,
    /// Block containing the event
    pub block_number: u64,
    /// Transaction that emitted the event
    pub transaction_hash: String,
}

fn malformed(msg: impl Into<String>) -> StealthFlowError {
    StealthFlowError::MalformedEvent(msg.into())
}

/// Reads a 128-bit half, rejecting wider words.
fn half(word: &U256, name: &str) -> Result<u128> {
    word.to_u128()
        .ok_or_else(|| malformed(format!("{} does not fit in 128 bits", name)))
}

/// Sequential reader over event data with bounds checks.
struct Cursor<'a> {
    words: &'a [U256],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(words: &'a [U256]) -> Self {
        Self { words, pos: 0 }
    }

    fn next(&mut self, what: &str) -> Result<U256> {
        let word = self
            .words
            .get(self.pos)
            .ok_or_else(|| malformed(format!("data ends before {}", what)))?;
        self.pos += 1;
        Ok(*word)
    }

    fn array(&mut self, what: &str, max: usize) -> Result<&'a [U256]> {
        let len = self
            .next(what)?
            .to_u64()
            .and_then(|n| usize::try_from(n).ok())
            .filter(|n| *n <= max)
            .ok_or_else(|| malformed(format!("{} length exceeds {}", what, max)))?;

        let remaining = self.words.len() - self.pos;
        if len > remaining {
            return Err(malformed(format!(
                "{} claims {} words but only {} remain",
                what, len, remaining
            )));
        }

        let out = &self.words[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    fn finish(&self) -> Result<()> {
        if self.pos != self.words.len() {
            return Err(malformed(format!(
                "{} unexpected trailing words",
                self.words.len() - self.pos
            )));
        }
        Ok(())
    }
}

/// Decodes an ephemeral public key from its 2- or 4-word array form.
pub fn decode_ephemeral_pubkey(words: &[U256]) -> Result<Point> {
    let (x, y) = match words.len() {
        EPHEMERAL_WORDS_PACKED => (words[0], words[1]),
        EPHEMERAL_WORDS_SPLIT => (
            U256::from_halves(half(&words[0], "x_low")?, half(&words[1], "x_high")?),
            U256::from_halves(half(&words[2], "y_low")?, half(&words[3], "y_high")?),
        ),
        n => {
            return Err(malformed(format!(
                "ephemeral key must have {} or {} words, got {}",
                EPHEMERAL_WORDS_PACKED, EPHEMERAL_WORDS_SPLIT, n
            )))
        }
    };

    Point::from_coordinates(x, y)
        .map_err(|e| malformed(format!("ephemeral key is not a curve point: {}", e)))
}

/// Decodes an `Announcement` event into a record.
pub fn decode_announcement_event(event: &RawEvent) -> Result<AnnouncementRecord> {
    if event.keys.len() < ANNOUNCEMENT_EVENT_KEYS {
        return Err(malformed(format!(
            "expected {} keys, got {}",
            ANNOUNCEMENT_EVENT_KEYS,
            event.keys.len()
        )));
    }

    let scheme_id = U256::from_halves(
        half(&event.keys[1], "scheme_id_low")?,
        half(&event.keys[2], "scheme_id_high")?,
    );
    let view_tag = event.keys[3]
        .to_u64()
        .and_then(|t| u8::try_from(t).ok())
        .ok_or_else(|| malformed("view tag does not fit in one byte"))?;

    let mut cursor = Cursor::new(&event.data);
    let ephemeral = cursor.array("ephemeral key", EPHEMERAL_WORDS_SPLIT)?;
    let ephemeral_pub = decode_ephemeral_pubkey(ephemeral)?;
    let ciphertext = cursor.array("ciphertext", MAX_CIPHERTEXT_WORDS)?.to_vec();
    let caller = cursor.next("caller")?;
    cursor.finish()?;

    let payload = AnnouncementPayload {
        scheme_id,
        view_tag,
        ephemeral_pub,
        ciphertext,
    };
    Ok(AnnouncementRecord::from_payload(
        payload,
        caller,
        event.block_number,
        event.transaction_hash.clone(),
    ))
}

/// Encodes `announce(scheme_id, ephemeral_pubkey, ciphertext, view_tag)` calldata.
///
/// The ephemeral key is always written in split form.
pub fn encode_announce_calldata(payload: &AnnouncementPayload) -> Vec<U256> {
    let (scheme_low, scheme_high) = payload.scheme_id.split();
    let mut calldata = Vec::with_capacity(9 + payload.ciphertext.len());
    calldata.push(U256::from_u128(scheme_low));
    calldata.push(U256::from_u128(scheme_high));
    calldata.push(U256::from_u64(EPHEMERAL_WORDS_SPLIT as u64));
    calldata.extend(payload.ephemeral_pub.to_split_words());
    calldata.push(U256::from_u64(payload.ciphertext.len() as u64));
    calldata.extend(payload.ciphertext.iter().copied());
    calldata.push(U256::from_u64(payload.view_tag as u64));
    calldata
}

/// Encodes a record as the event the contract emits for it.
pub fn encode_announcement_event(record: &AnnouncementRecord, selector: U256) -> RawEvent {
    let (scheme_low, scheme_high) = record.scheme_id.split();
    let keys = vec![
        selector,
        U256::from_u128(scheme_low),
        U256::from_u128(scheme_high),
        U256::from_u64(record.view_tag as u64),
    ];

    let mut data = Vec::with_capacity(7 + record.ciphertext.len());
    data.push(U256::from_u64(EPHEMERAL_WORDS_SPLIT as u64));
    data.extend(record.ephemeral_pub.to_split_words());
    data.push(U256::from_u64(record.ciphertext.len() as u64));
    data.extend(record.ciphertext.iter().copied());
    data.push(record.caller);

    RawEvent {
        keys,
        data,
        block_number: record.block_number,
        transaction_hash: record.tx_hash.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AnnouncementBuilder, PrivateKey};

    fn record(ciphertext: Vec<U256>) -> AnnouncementRecord {
        AnnouncementBuilder::new()
            .ephemeral_pub(PrivateKey::from_hex("0xabcdef").unwrap().public_key().unwrap())
            .view_tag(0xa7)
            .ciphertext(ciphertext)
            .caller(U256::from_u64(0x5151))
            .block_number(812_000)
            .tx_hash("0x0badc0de")
            .build()
            .unwrap()
    }

    #[test]
    fn test_event_roundtrip() {
        let original = record(vec![U256::from_u64(123)]);
        let event = encode_announcement_event(&original, U256::from_u64(0xfeed));
        assert_eq!(decode_announcement_event(&event).unwrap(), original);

        let empty = record(vec![]);
        let event = encode_announcement_event(&empty, U256::ZERO);
        assert!(decode_announcement_event(&event).unwrap().ciphertext.is_empty());
    }

    #[test]
    fn test_packed_ephemeral_key() {
        let original = record(vec![]);
        let mut event = encode_announcement_event(&original, U256::ZERO);
        let p = original.ephemeral_pub;
        event.data = vec![U256::from_u64(2), *p.x(), *p.y(), U256::ZERO, original.caller];
        assert_eq!(decode_announcement_event(&event).unwrap(), original);
    }

    #[test]
    fn test_bad_ephemeral_lengths() {
        for n in [0usize, 1, 3] {
            let words = vec![U256::from_u64(1); n];
            assert!(matches!(
                decode_ephemeral_pubkey(&words),
                Err(StealthFlowError::MalformedEvent(_))
            ));
        }
    }

    #[test]
    fn test_split_half_overflow() {
        let p = record(vec![]).ephemeral_pub;
        let mut words = p.to_split_words().to_vec();
        words[1] = U256::from_halves(0, 1);
        assert!(decode_ephemeral_pubkey(&words).is_err());
    }

    #[test]
    fn test_length_overrun_is_an_error() {
        let original = record(vec![U256::from_u64(1)]);
        let mut event = encode_announcement_event(&original, U256::ZERO);

        // ciphertext length claims more words than exist
        event.data[5] = U256::from_u64(9);
        assert!(decode_announcement_event(&event).is_err());

        // absurd length word
        event.data[5] = U256::from_be_bytes([0xff; 32]);
        assert!(decode_announcement_event(&event).is_err());
    }

    #[test]
    fn test_truncated_and_trailing_data() {
        let original = record(vec![U256::from_u64(1)]);
        let event = encode_announcement_event(&original, U256::ZERO);

        for cut in 0..event.data.len() {
            let mut short = event.clone();
            short.data.truncate(cut);
            assert!(decode_announcement_event(&short).is_err(), "cut at {}", cut);
        }

        let mut long = event.clone();
        long.data.push(U256::ZERO);
        assert!(decode_announcement_event(&long).is_err());
    }

    #[test]
    fn test_bad_keys() {
        let original = record(vec![]);
        let mut event = encode_announcement_event(&original, U256::ZERO);
        event.keys[3] = U256::from_u64(256);
        assert!(decode_announcement_event(&event).is_err());

        event.keys.truncate(3);
        assert!(decode_announcement_event(&event).is_err());
    }

    #[test]
    fn test_calldata_layout() {
        let original = record(vec![U256::from_u64(42)]);
        let calldata = encode_announce_calldata(&original.payload());
        assert_eq!(calldata.len(), 10);
        assert_eq!(calldata[0], U256::from_u64(1));
        assert_eq!(calldata[2], U256::from_u64(4));
        assert_eq!(calldata[7], U256::from_u64(1));
        assert_eq!(calldata[8], U256::from_u64(42));
        assert_eq!(calldata[9], U256::from_u64(0xa7));
        assert_eq!(decode_ephemeral_pubkey(&calldata[3..7]).unwrap(), original.ephemeral_pub);
    }
}
