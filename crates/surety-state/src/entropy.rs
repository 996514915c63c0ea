//! # Oracle Index Derivation
//!
//! Oracle workers are scattered across a small index space so that each
//! status request only involves the oracles sharing its index bucket.
//! [`IndexSource`] is the injectable generator: the ledger supplies the
//! subject and a monotonic counter, the source turns them into indices.
//!
//! [`DigestIndexSource`] is the production source. Each draw hashes the
//! canonical JSON of `{tag, entropy, subject, counter, attempt}` with SHA-256
//! and reduces the leading eight bytes modulo the index space. Identical
//! inputs always give identical indices.
//!
//! [`FixedIndexSource`] returns preset indices, for tests that need to
//! control which oracles see which request.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use surety_core::{sha256_digest, CanonicalBytes, FlightKey, LedgerAccount, LedgerError};

/// Produces index assignments for oracles and status requests.
///
/// Implementations must be deterministic in their arguments.
pub trait IndexSource: std::fmt::Debug + Send {
    /// `count` distinct indices in `0..space` for a newly registered oracle,
    /// in ascending order. `counter` is the registration counter.
    fn oracle_indices(
        &self,
        oracle: &LedgerAccount,
        counter: u64,
        count: usize,
        space: u16,
    ) -> Result<Vec<u8>, LedgerError>;

    /// The index bucket for a status request. `counter` is the request
    /// counter.
    fn request_index(&self, flight: &FlightKey, counter: u64, space: u16) -> Result<u8, LedgerError>;
}

// ─── Digest Source ───────────────────────────────────────────────────

/// Hash-based index source seeded with a context entropy string.
#[derive(Debug, Clone, Default)]
pub struct DigestIndexSource {
    entropy: String,
}

#[derive(Serialize)]
struct DrawSeed<'a, T: Serialize> {
    tag: &'a str,
    entropy: &'a str,
    subject: &'a T,
    counter: u64,
    attempt: u64,
}

impl DigestIndexSource {
    /// A source mixing `entropy` into every draw.
    pub fn with_entropy(entropy: impl Into<String>) -> Self {
        Self {
            entropy: entropy.into(),
        }
    }

    fn draw<T: Serialize>(
        &self,
        tag: &str,
        subject: &T,
        counter: u64,
        attempt: u64,
        space: u16,
    ) -> Result<u8, LedgerError> {
        let seed = DrawSeed {
            tag,
            entropy: &self.entropy,
            subject,
            counter,
            attempt,
        };
        let digest = sha256_digest(&CanonicalBytes::new(&seed)?);
        reduce(digest.leading_u64(), space)
    }
}

impl IndexSource for DigestIndexSource {
    fn oracle_indices(
        &self,
        oracle: &LedgerAccount,
        counter: u64,
        count: usize,
        space: u16,
    ) -> Result<Vec<u8>, LedgerError> {
        let count = count.min(usize::from(space));
        let mut picked = BTreeSet::new();
        // Rejection sampling; a hash cycle that keeps colliding falls back to
        // the lowest free indices so the result always has `count` entries.
        let max_attempts = 64 * u64::from(space.max(1));
        let mut attempt = 0;
        while picked.len() < count && attempt < max_attempts {
            picked.insert(self.draw("oracle-index", oracle, counter, attempt, space)?);
            attempt += 1;
        }
        let mut fill = 0u16;
        while picked.len() < count && fill < space {
            picked.insert(reduce(u64::from(fill), space)?);
            fill += 1;
        }
        Ok(picked.into_iter().collect())
    }

    fn request_index(&self, flight: &FlightKey, counter: u64, space: u16) -> Result<u8, LedgerError> {
        self.draw("status-request", flight, counter, 0, space)
    }
}

fn reduce(value: u64, space: u16) -> Result<u8, LedgerError> {
    if space == 0 {
        return Err(LedgerError::IndexDerivation("index space is empty".into()));
    }
    u8::try_from(value % u64::from(space))
        .map_err(|_| LedgerError::IndexDerivation(format!("index space {space} exceeds 256")))
}

// ─── Fixed Source ────────────────────────────────────────────────────

/// Preset indices: every oracle gets `default_indices` unless overridden,
/// every request lands on `request_index`.
#[derive(Debug, Clone)]
pub struct FixedIndexSource {
    default_indices: Vec<u8>,
    overrides: BTreeMap<LedgerAccount, Vec<u8>>,
    request_index: u8,
}

impl FixedIndexSource {
    /// Every oracle gets `indices`; every request gets `request_index`.
    pub fn new(indices: Vec<u8>, request_index: u8) -> Self {
        Self {
            default_indices: indices,
            overrides: BTreeMap::new(),
            request_index,
        }
    }

    /// Give `oracle` its own index set.
    pub fn with_oracle(mut self, oracle: LedgerAccount, indices: Vec<u8>) -> Self {
        self.overrides.insert(oracle, indices);
        self
    }
}

impl IndexSource for FixedIndexSource {
    fn oracle_indices(
        &self,
        oracle: &LedgerAccount,
        _counter: u64,
        count: usize,
        space: u16,
    ) -> Result<Vec<u8>, LedgerError> {
        let preset = self.overrides.get(oracle).unwrap_or(&self.default_indices);
        let set: BTreeSet<u8> = preset
            .iter()
            .copied()
            .filter(|i| u16::from(*i) < space)
            .collect();
        Ok(set.into_iter().take(count).collect())
    }

    fn request_index(&self, _flight: &FlightKey, _counter: u64, space: u16) -> Result<u8, LedgerError> {
        reduce(u64::from(self.request_index), space)
    }
}
