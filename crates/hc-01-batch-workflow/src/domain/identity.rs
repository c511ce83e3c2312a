//! # Batch Identity
//!
//! Human-readable ids of the form `PREFIX-YEAR-SUFFIX`, e.g. `ASH-2024-7K3QZP`.
//!
//! - PREFIX: first three ASCII letters of the species, upper-cased, padded with `X`
//! - YEAR: UTC year of creation
//! - SUFFIX: six Crockford base32 characters (32^6, about 1.07e9 per prefix-year)

use super::errors::{WorkflowError, WorkflowResult};
use chrono::{DateTime, Datelike, Utc};
use rand::Rng;
use shared_types::{BatchId, Timestamp};
use std::sync::Arc;

/// Crockford base32: no I, L, O or U.
pub const CROCKFORD_ALPHABET: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";

/// Default suffix length.
pub const DEFAULT_SUFFIX_LEN: usize = 6;

/// Default candidates tried before giving up.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Source of random id suffixes.
///
/// Abstracted to allow testing with forced collisions.
pub trait SuffixSource: Send + Sync {
    /// Returns `len` characters from `CROCKFORD_ALPHABET`.
    fn suffix(&self, len: usize) -> String;
}

/// Default suffix source backed by the thread-local RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomSuffix;

impl SuffixSource for RandomSuffix {
    fn suffix(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| CROCKFORD_ALPHABET[rng.gen_range(0..CROCKFORD_ALPHABET.len())] as char)
            .collect()
    }
}

/// Generates and validates batch ids.
#[derive(Clone)]
pub struct BatchIdentity {
    source: Arc<dyn SuffixSource>,
    max_attempts: u32,
    suffix_len: usize,
}

impl BatchIdentity {
    pub fn new(max_attempts: u32) -> Self {
        Self::with_source(Arc::new(RandomSuffix), max_attempts)
    }

    pub fn with_source(source: Arc<dyn SuffixSource>, max_attempts: u32) -> Self {
        Self {
            source,
            max_attempts: max_attempts.max(1),
            suffix_len: DEFAULT_SUFFIX_LEN,
        }
    }

    /// Suffix length, kept within what `validate` accepts.
    pub fn with_suffix_len(mut self, len: usize) -> Self {
        self.suffix_len = len.clamp(3, 12);
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// PREFIX for a species: first three ASCII letters, upper-cased, padded with `X`.
    pub fn prefix(herb_species: &str) -> String {
        let mut prefix: String = herb_species
            .chars()
            .filter(char::is_ascii_alphabetic)
            .take(3)
            .map(|c| c.to_ascii_uppercase())
            .collect();
        while prefix.len() < 3 {
            prefix.push('X');
        }
        prefix
    }

    /// UTC year of a millisecond timestamp.
    pub fn year_of(now: Timestamp) -> i32 {
        i64::try_from(now)
            .ok()
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(|dt| dt.year())
            .unwrap_or(1970)
    }

    /// One candidate id. Not checked for uniqueness.
    pub fn candidate(&self, herb_species: &str, year: i32) -> BatchId {
        BatchId::new(format!(
            "{}-{:04}-{}",
            Self::prefix(herb_species),
            year,
            self.source.suffix(self.suffix_len)
        ))
    }

    /// Try candidates until `try_claim` accepts one.
    ///
    /// `try_claim` returns `Ok(Some(_))` when the candidate was taken into
    /// use, `Ok(None)` on collision, and `Err` to abort.
    pub fn allocate<T>(
        &self,
        herb_species: &str,
        year: i32,
        mut try_claim: impl FnMut(BatchId) -> WorkflowResult<Option<T>>,
    ) -> WorkflowResult<T> {
        for attempt in 1..=self.max_attempts {
            let candidate = self.candidate(herb_species, year);
            tracing::trace!(attempt, candidate = %candidate, "[hc-01] Trying batch id");
            if let Some(accepted) = try_claim(candidate)? {
                return Ok(accepted);
            }
        }
        Err(WorkflowError::IdGenerationExhausted {
            attempts: self.max_attempts,
        })
    }

    /// Generate an id not rejected by `is_taken`.
    pub fn generate(
        &self,
        herb_species: &str,
        year: i32,
        is_taken: impl Fn(&BatchId) -> bool,
    ) -> WorkflowResult<BatchId> {
        self.allocate(herb_species, year, |candidate| {
            Ok((!is_taken(&candidate)).then_some(candidate))
        })
    }

    /// Shape check for explicitly requested ids: `^[A-Z]{3}-\d{4}-[0-9A-Z]{3,12}$`.
    pub fn validate(id: &BatchId) -> WorkflowResult<()> {
        let parts: Vec<&str> = id.as_str().split('-').collect();
        let valid = match parts.as_slice() {
            [prefix, year, suffix] => {
                prefix.len() == 3
                    && prefix.bytes().all(|b| b.is_ascii_uppercase())
                    && year.len() == 4
                    && year.bytes().all(|b| b.is_ascii_digit())
                    && (3..=12).contains(&suffix.len())
                    && suffix
                        .bytes()
                        .all(|b| b.is_ascii_digit() || b.is_ascii_uppercase())
            }
            _ => false,
        };

        if valid {
            Ok(())
        } else {
            Err(WorkflowError::Validation(format!(
                "batch id '{id}' must look like ABC-2024-001"
            )))
        }
    }
}

impl Default for BatchIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS)
    }
}
