use std::fmt;

use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, InvalidChallenge};

pub const MAX_REQUIRED_KEYS: usize = 3;
const ALPHABET_LEN: usize = 26;

/// A typing goal: an accepted letter-count interval plus letters that must
/// appear somewhere in the input. Never mutated once built; a satisfied slot
/// gets a brand-new challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawChallenge")]
pub struct Challenge {
    min_count: usize,
    max_count: usize,
    required_keys: Vec<char>,
}

#[derive(Deserialize)]
struct RawChallenge {
    min_count: usize,
    max_count: usize,
    #[serde(default)]
    required_keys: Vec<char>,
}

impl TryFrom<RawChallenge> for Challenge {
    type Error = InvalidChallenge;

    fn try_from(raw: RawChallenge) -> Result<Self, Self::Error> {
        Challenge::new(raw.min_count, raw.max_count, raw.required_keys)
    }
}

impl Challenge {
    pub fn new(
        min_count: usize,
        max_count: usize,
        required_keys: impl IntoIterator<Item = char>,
    ) -> Result<Self, InvalidChallenge> {
        let challenge = Self {
            min_count,
            max_count,
            required_keys: required_keys
                .into_iter()
                .map(|k| k.to_ascii_uppercase())
                .collect(),
        };
        challenge.validate()?;
        Ok(challenge)
    }

    pub fn validate(&self) -> Result<(), InvalidChallenge> {
        if self.min_count > self.max_count {
            return Err(InvalidChallenge::InvertedRange {
                min: self.min_count,
                max: self.max_count,
            });
        }
        if self.required_keys.len() > MAX_REQUIRED_KEYS {
            return Err(InvalidChallenge::TooManyKeys {
                count: self.required_keys.len(),
            });
        }
        // Each required key takes one letter of the budget.
        if self.required_keys.len() > self.max_count {
            return Err(InvalidChallenge::KeysExceedMaximum {
                keys: self.required_keys.len(),
                max: self.max_count,
            });
        }
        for (i, &key) in self.required_keys.iter().enumerate() {
            if !key.is_ascii_uppercase() {
                return Err(InvalidChallenge::NotALetter { key });
            }
            if self.required_keys[..i].contains(&key) {
                return Err(InvalidChallenge::DuplicateKey { key });
            }
        }
        Ok(())
    }

    pub fn min_count(&self) -> usize {
        self.min_count
    }

    pub fn max_count(&self) -> usize {
        self.max_count
    }

    pub fn required_keys(&self) -> &[char] {
        &self.required_keys
    }

    pub fn accepts_count(&self, count: usize) -> bool {
        (self.min_count..=self.max_count).contains(&count)
    }
}

impl fmt::Display for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min_count, self.max_count)?;
        if !self.required_keys.is_empty() {
            let keys: String = self.required_keys.iter().collect();
            write!(f, " [{keys}]")?;
        }
        Ok(())
    }
}

/// Generation ranges for new challenges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChallengeSpec {
    pub min_count_low: usize,
    pub min_count_high: usize,
    pub span_low: usize,
    pub span_high: usize,
    pub max_required_keys: usize,
}

impl Default for ChallengeSpec {
    fn default() -> Self {
        Self {
            min_count_low: 10,
            min_count_high: 20,
            span_low: 4,
            span_high: 6,
            max_required_keys: MAX_REQUIRED_KEYS,
        }
    }
}

impl ChallengeSpec {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_count_low > self.min_count_high {
            return Err(ConfigError::InvertedRange {
                field: "challenge.min_count",
                low: self.min_count_low as f64,
                high: self.min_count_high as f64,
            });
        }
        if self.span_low > self.span_high {
            return Err(ConfigError::InvertedRange {
                field: "challenge.span",
                low: self.span_low as f64,
                high: self.span_high as f64,
            });
        }
        if self.max_required_keys > MAX_REQUIRED_KEYS {
            return Err(ConfigError::TooLarge {
                field: "challenge.max_required_keys",
                value: self.max_required_keys,
                max: MAX_REQUIRED_KEYS,
            });
        }
        // The shortest challenge must still have room for every key.
        let shortest = self.min_count_low + self.span_low;
        if self.max_required_keys > shortest {
            return Err(ConfigError::TooLarge {
                field: "challenge.max_required_keys",
                value: self.max_required_keys,
                max: shortest,
            });
        }
        Ok(())
    }
}

/// Seeded random challenge generator.
#[derive(Debug, Clone)]
pub struct ChallengeFactory {
    spec: ChallengeSpec,
    rng: StdRng,
    relaxed: bool,
}

impl ChallengeFactory {
    pub fn new(spec: ChallengeSpec, seed: u64) -> Self {
        Self {
            spec,
            rng: StdRng::seed_from_u64(seed),
            relaxed: false,
        }
    }

    pub fn spec(&self) -> &ChallengeSpec {
        &self.spec
    }

    /// While relaxed, generated challenges carry no required keys.
    pub fn set_relaxed(&mut self, relaxed: bool) {
        self.relaxed = relaxed;
    }

    pub fn create(&mut self) -> Challenge {
        let spec = self.spec;
        let min_count = self
            .rng
            .random_range(spec.min_count_low..=spec.min_count_high);
        let max_count = min_count + self.rng.random_range(spec.span_low..=spec.span_high);

        let key_count = if self.relaxed {
            0
        } else {
            self.rng
                .random_range(0..=spec.max_required_keys)
                .min(max_count)
        };
        let required_keys = index::sample(&mut self.rng, ALPHABET_LEN, key_count)
            .into_iter()
            .map(|i| char::from(b'A' + i as u8))
            .collect();

        let challenge = Challenge {
            min_count,
            max_count,
            required_keys,
        };
        debug_assert_eq!(challenge.validate(), Ok(()));
        challenge
    }
}
