// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Value Scrambler
//!
//! Keyed, deterministic pseudonyms that keep the length and the punctuation
//! of the original text. Pseudonyms are stable for the lifetime of one
//! [`Scrambler`] only; every new instance draws a fresh secret.

use log::{debug, warn};
use rand::Rng;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::convert::TryFrom;
use std::sync::OnceLock;

use crate::error::{DumpError, Result};

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Inputs up to this many characters get explicit collision checks.
pub const SHORT_STRING_LENGTH: usize = 8;

pub const DEFAULT_MAX_ATTEMPTS: usize = 1000;

/// Stands in for a scrambled position in a shape key.
const SCRAMBLED: char = '\0';

static PRESERVED: OnceLock<Regex> = OnceLock::new();

/// Copied through unchanged at their position: ASCII punctuation and symbols,
/// Unicode punctuation (curly quotes, dashes, ...) and whitespace.
fn is_preserved(ch: char) -> bool {
    let pattern = PRESERVED.get_or_init(|| {
        Regex::new(r"^[[:punct:]\p{P}\s]$").expect("preserved-character pattern is valid")
    });
    let mut buf = [0; 4];
    pattern.is_match(ch.encode_utf8(&mut buf))
}

/// `text` with every scrambled position blanked out. Pseudonyms of equal
/// length share this key with their input.
fn shape_key(text: &str) -> String {
    text.chars()
        .map(|ch| if is_preserved(ch) { ch } else { SCRAMBLED })
        .collect()
}

/// How many distinct pseudonyms exist for inputs of this shape.
fn shape_capacity(key: &str) -> u64 {
    let scrambled = key.chars().filter(|&ch| ch == SCRAMBLED).count();
    u32::try_from(scrambled)
        .ok()
        .and_then(|exp| (ALPHABET.len() as u64).checked_pow(exp))
        .unwrap_or(u64::MAX)
}

fn random_token() -> String {
    hex::encode(rand::thread_rng().gen::<[u8; 16]>())
}

/// Not synchronized: share one across threads only behind a lock.
pub struct Scrambler {
    secret: String,
    short_to_scrambled: HashMap<String, String>,
    scrambled_to_short: HashMap<String, String>,
    /// Same-length pseudonyms handed out per shape key.
    taken_per_shape: HashMap<String, u64>,
    max_attempts: usize,
}

impl Scrambler {
    /// A scrambler with a fresh random secret.
    pub fn new() -> Self {
        Scrambler::with_secret(random_token())
    }

    /// A scrambler with a fixed secret, for reproducible output.
    pub fn with_secret<S: Into<String>>(secret: S) -> Self {
        Scrambler {
            secret: secret.into(),
            short_to_scrambled: HashMap::new(),
            scrambled_to_short: HashMap::new(),
            taken_per_shape: HashMap::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// How many candidates a short input may try before giving up.
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Number of distinct short inputs seen so far.
    pub fn short_values_seen(&self) -> usize {
        self.short_to_scrambled.len()
    }

    /// Pseudonymize `text`. Same input, same output, for the life of `self`.
    /// Distinct short inputs never share an output; once every same-length
    /// pseudonym for a short input's shape is taken, its output is longer.
    pub fn scramble(&mut self, text: &str) -> Result<String> {
        if text.chars().count() <= SHORT_STRING_LENGTH {
            self.scramble_short(text)
        } else {
            Ok(self.pseudonym(text, ""))
        }
    }

    fn scramble_short(&mut self, text: &str) -> Result<String> {
        if let Some(existing) = self.short_to_scrambled.get(text) {
            return Ok(existing.clone());
        }

        let key = shape_key(text);
        let taken = self.taken_per_shape.get(&key).copied().unwrap_or(0);
        if taken >= shape_capacity(&key) {
            return self.scramble_overflow(text);
        }

        let mut nonce = String::new();
        for attempt in 0..self.max_attempts {
            let candidate = self.pseudonym(text, &nonce);
            if self.scrambled_to_short.contains_key(&candidate) {
                debug!("short pseudonym collision on attempt {}", attempt + 1);
                nonce = random_token();
                continue;
            }

            self.remember(text, candidate.clone());
            *self.taken_per_shape.entry(key).or_insert(0) += 1;
            return Ok(candidate);
        }

        Err(DumpError::PseudonymSpaceExhausted {
            length: text.chars().count(),
            attempts: self.max_attempts,
        })
    }

    /// Every same-length pseudonym is in use: scramble `text` with a random
    /// suffix appended, which makes the output longer than the input.
    fn scramble_overflow(&mut self, text: &str) -> Result<String> {
        warn!(
            "all {}-character pseudonyms of this shape are taken, {:?} gets a longer one",
            text.chars().count(),
            text
        );

        for _ in 0..self.max_attempts {
            let candidate = self.pseudonym(&format!("{}{}", text, random_token()), "");
            if !self.scrambled_to_short.contains_key(&candidate) {
                self.remember(text, candidate.clone());
                return Ok(candidate);
            }
        }

        Err(DumpError::PseudonymSpaceExhausted {
            length: text.chars().count(),
            attempts: self.max_attempts,
        })
    }

    fn remember(&mut self, text: &str, pseudonym: String) {
        self.scrambled_to_short
            .insert(pseudonym.clone(), text.to_string());
        self.short_to_scrambled.insert(text.to_string(), pseudonym);
    }

    /// One output character per input character, picked by the digest of
    /// `secret ++ text ++ nonce`.
    fn pseudonym(&self, text: &str, nonce: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.secret.as_bytes());
        hasher.update(text.as_bytes());
        hasher.update(nonce.as_bytes());
        let digest = hasher.finalize();

        text.chars()
            .enumerate()
            .map(|(i, ch)| {
                if is_preserved(ch) {
                    ch
                } else {
                    let byte = digest[i % digest.len()] as usize;
                    ALPHABET[byte % ALPHABET.len()] as char
                }
            })
            .collect()
    }
}

impl Default for Scrambler {
    fn default() -> Self {
        Scrambler::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use matches::assert_matches;
    use std::collections::HashSet;

    fn shape(s: &str) -> Vec<bool> {
        s.chars().map(is_preserved).collect()
    }

    #[test]
    fn same_input_same_output() {
        let mut scrambler = Scrambler::new();
        for input in &["Jo", "Margaret Thatcher-Smith", "", "a much longer note text"] {
            let first = scrambler.scramble(input).unwrap();
            assert_eq!(scrambler.scramble(input).unwrap(), first);
        }
    }

    #[test]
    fn keeps_length_and_punctuation() {
        let mut scrambler = Scrambler::with_secret("k");
        for input in &[
            "+1 (555) 010-4477",
            "O'Brien, J.",
            "x",
            "tab\tand\nnewline",
            "ünïcödé names",
        ] {
            let output = scrambler.scramble(input).unwrap();
            assert_eq!(output.chars().count(), input.chars().count());
            assert_eq!(shape(&output), shape(input), "{:?} -> {:?}", input, output);
        }
    }

    #[test]
    fn output_uses_the_alphabet() {
        let mut scrambler = Scrambler::with_secret("k");
        let output = scrambler.scramble("Correspondence 1901").unwrap();
        assert!(output
            .chars()
            .all(|c| c == ' ' || c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(output, "Correspondence 1901");
    }

    #[test]
    fn fixed_secret_is_reproducible() {
        let mut a = Scrambler::with_secret("same");
        let mut b = Scrambler::with_secret("same");
        let mut c = Scrambler::with_secret("other");
        let text = "Papers of the historical society";
        assert_eq!(a.scramble(text).unwrap(), b.scramble(text).unwrap());
        assert_ne!(a.scramble(text).unwrap(), c.scramble(text).unwrap());
    }

    #[test]
    fn distinct_short_inputs_never_collide() {
        let mut scrambler = Scrambler::with_secret("k");
        let mut outputs = HashSet::new();
        let letters: Vec<char> = ('a'..='z').collect();
        let digits: Vec<char> = ('0'..='9').collect();
        for a in &letters {
            for b in &digits {
                let input: String = [*a, *b].iter().collect();
                let output = scrambler.scramble(&input).unwrap();
                assert_eq!(output.chars().count(), 2);
                assert!(outputs.insert(output));
            }
        }
        assert_eq!(scrambler.short_values_seen(), letters.len() * digits.len());
    }

    #[test]
    fn full_short_space_falls_back_to_longer_pseudonyms() {
        // One alphanumeric character only has 36 possible pseudonyms.
        let mut scrambler = Scrambler::with_secret("k");
        let initials: Vec<String> = ('A'..='Z')
            .chain('a'..='z')
            .map(|c| c.to_string())
            .collect();

        let outputs: Vec<String> = initials
            .iter()
            .map(|initial| scrambler.scramble(initial).unwrap())
            .collect();

        let distinct: HashSet<&String> = outputs.iter().collect();
        assert_eq!(distinct.len(), initials.len());
        assert!(outputs[..36].iter().all(|o| o.chars().count() == 1));
        assert!(outputs[36..].iter().all(|o| o.chars().count() > 1));

        // Assignments stay stable, longer ones included.
        for (initial, output) in initials.iter().zip(&outputs) {
            assert_eq!(&scrambler.scramble(initial).unwrap(), output);
        }
    }

    #[test]
    fn retry_bound_miss_is_an_error() {
        // A single attempt gives up at the first collision, long before all
        // 36 one-character pseudonyms are handed out.
        let mut scrambler = Scrambler::with_secret("k").with_max_attempts(1);
        let failure = ('a'..='z')
            .chain('0'..='9')
            .map(|c| scrambler.scramble(&c.to_string()))
            .find(|result| result.is_err());

        assert_matches!(
            failure,
            Some(Err(DumpError::PseudonymSpaceExhausted {
                length: 1,
                attempts: 1
            }))
        );
        assert!(scrambler.short_values_seen() < 36);
    }

    #[test]
    fn unicode_punctuation_is_preserved() {
        let mut scrambler = Scrambler::with_secret("k");
        let input = "Jane’s papers — “1901”";
        let output = scrambler.scramble(input).unwrap();

        assert_eq!(shape(&output), shape(input));
        for (before, after) in input.chars().zip(output.chars()) {
            if "’—“” ".contains(before) {
                assert_eq!(before, after);
            } else {
                assert!(after.is_ascii_lowercase() || after.is_ascii_digit());
            }
        }
    }

    #[test]
    fn symbols_outside_ascii_are_scrambled() {
        assert!(is_preserved('$'));
        assert!(is_preserved('«'));
        assert!(is_preserved('\u{a0}'));
        assert!(!is_preserved('©'));
        assert!(!is_preserved('é'));
    }

    #[test]
    fn max_attempts_is_at_least_one() {
        let mut scrambler = Scrambler::with_secret("k").with_max_attempts(0);
        assert!(scrambler.scramble("abc").is_ok());
    }
}
