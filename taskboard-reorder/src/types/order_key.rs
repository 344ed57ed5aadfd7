//! Order keys for item ordering using fractional indexing.
//!
//! A key is a string of base-62 digits read as a fraction in `(0, 1)`. Keys
//! never end with the zero digit, so plain byte-wise comparison agrees with
//! numeric comparison and a new key can always be found between two others
//! by growing the string. The [`OrderKeySpace`] caps that growth: once a key
//! would exceed `max_len` digits the list has to be renumbered.

use crate::error::{ReorderError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Digits in ascending ASCII order
const DIGITS: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
const BASE: usize = 62;
const ZERO: u8 = b'0';

/// Default rebalance threshold (maximum key length in digits)
pub const DEFAULT_MAX_KEY_LEN: usize = 16;

/// Smallest threshold that still leaves room for a renumbered list
pub const MIN_MAX_KEY_LEN: usize = 4;

/// Comparable position of an item within its list.
///
/// Ordinals sort lexicographically, which allows inserting between existing
/// items without touching the other positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OrderKey(String);

impl OrderKey {
    /// Key handed to the first item of an empty list
    pub fn initial() -> Self {
        Self((DIGITS[BASE / 2] as char).to_string())
    }

    /// Parse and validate a key
    pub fn parse(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(ReorderError::invalid_order_key(s, "empty key"));
        }
        if let Some(bad) = s.bytes().find(|b| digit_value(*b).is_none()) {
            return Err(ReorderError::invalid_order_key(
                s,
                format!("'{}' is not a base-62 digit", bad as char),
            ));
        }
        if s.as_bytes().last() == Some(&ZERO) {
            return Err(ReorderError::invalid_order_key(s, "trailing zero digit"));
        }
        Ok(Self(s.to_string()))
    }

    /// Get the inner string value
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Number of digits
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn from_digits(bytes: Vec<u8>) -> Self {
        // Only ever called with bytes drawn from DIGITS.
        Self(bytes.into_iter().map(char::from).collect())
    }
}

impl Default for OrderKey {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for OrderKey {
    type Err = ReorderError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OrderKey {
    type Error = ReorderError;

    fn try_from(s: String) -> Result<Self> {
        Self::parse(&s)
    }
}

impl From<OrderKey> for String {
    fn from(key: OrderKey) -> Self {
        key.0
    }
}

/// Generates keys and decides when a list has run out of room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderKeySpace {
    max_len: usize,
}

impl Default for OrderKeySpace {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_KEY_LEN)
    }
}

impl OrderKeySpace {
    /// Create a key space with the given rebalance threshold.
    ///
    /// Thresholds below [`MIN_MAX_KEY_LEN`] are raised to it.
    pub fn new(max_len: usize) -> Self {
        Self {
            max_len: max_len.max(MIN_MAX_KEY_LEN),
        }
    }

    pub fn max_len(&self) -> usize {
        self.max_len
    }

    /// Key strictly between `lower` and `upper`; `None` is the list boundary.
    ///
    /// Fails with [`ReorderError::RebalanceRequired`] when the key would be
    /// longer than the threshold, and with [`ReorderError::InvalidKeyRange`]
    /// when `lower >= upper`.
    pub fn key_between(
        &self,
        lower: Option<&OrderKey>,
        upper: Option<&OrderKey>,
    ) -> Result<OrderKey> {
        if let (Some(lo), Some(hi)) = (lower, upper) {
            if lo >= hi {
                return Err(ReorderError::InvalidKeyRange {
                    lower: lo.to_string(),
                    upper: hi.to_string(),
                });
            }
        }

        let lower_digits = lower.map(|k| k.0.as_bytes()).unwrap_or(&[]);
        let upper_digits = upper.map(|k| k.0.as_bytes());
        let key = OrderKey::from_digits(midpoint(lower_digits, upper_digits));

        if key.len() > self.max_len {
            return Err(ReorderError::RebalanceRequired {
                length: key.len(),
                max: self.max_len,
            });
        }
        Ok(key)
    }

    /// `count` evenly spaced, strictly increasing keys for a full renumbering.
    ///
    /// All keys share one width: the smallest that fits `count` keys, plus a
    /// digit of headroom for later insertions.
    pub fn rebalanced(&self, count: usize) -> Vec<OrderKey> {
        if count == 0 {
            return Vec::new();
        }

        let slots = count as u128 + 1;
        let mut width = 1u32;
        let mut span = BASE as u128;
        while span < slots {
            width += 1;
            span *= BASE as u128;
        }
        width += 1;
        span *= BASE as u128;

        (1..=count as u128)
            .map(|i| OrderKey::from_digits(encode_fraction(i * span / slots, width)))
            .collect()
    }
}

fn digit_value(byte: u8) -> Option<usize> {
    match byte {
        b'0'..=b'9' => Some((byte - b'0') as usize),
        b'A'..=b'Z' => Some((byte - b'A') as usize + 10),
        b'a'..=b'z' => Some((byte - b'a') as usize + 36),
        _ => None,
    }
}

/// Digits of a fraction strictly between `lower` (empty = 0) and `upper`
/// (`None` = 1). Both inputs are valid keys with `lower < upper`.
fn midpoint(lower: &[u8], upper: Option<&[u8]>) -> Vec<u8> {
    if let Some(upper) = upper {
        // Shared prefix, reading missing lower digits as zero
        let shared = upper
            .iter()
            .enumerate()
            .take_while(|(i, d)| lower.get(*i).copied().unwrap_or(ZERO) == **d)
            .count();
        if shared > 0 {
            let mut out = upper[..shared].to_vec();
            out.extend(midpoint(
                lower.get(shared..).unwrap_or(&[]),
                Some(&upper[shared..]),
            ));
            return out;
        }
    }

    let lo = lower.first().and_then(|d| digit_value(*d)).unwrap_or(0);
    let hi = upper
        .and_then(|u| u.first())
        .and_then(|d| digit_value(*d))
        .unwrap_or(BASE);

    if hi.saturating_sub(lo) > 1 {
        return vec![DIGITS[(lo + hi) / 2]];
    }

    // Adjacent leading digits
    if let Some(upper) = upper {
        if upper.len() > 1 {
            return vec![upper[0]];
        }
    }
    let mut out = vec![DIGITS[lo]];
    out.extend(midpoint(lower.get(1..).unwrap_or(&[]), None));
    out
}

/// Fixed-width base-62 digits of `value / 62^width`, trailing zeros removed
fn encode_fraction(mut value: u128, width: u32) -> Vec<u8> {
    let mut out = vec![ZERO; width as usize];
    for slot in out.iter_mut().rev() {
        *slot = DIGITS[(value % BASE as u128) as usize];
        value /= BASE as u128;
    }
    while out.last() == Some(&ZERO) {
        out.pop();
    }
    out
}
