//! Unique identifier issuance
//!
//! Every durable record in a document (assets, cached images, scenes, scene
//! entities) is named by an [`Identifier`] minted by one shared
//! [`IdentifierProvider`]. The provider remembers everything it has ever
//! issued, so a fresh identifier is checked against the whole history before
//! it is handed out. The history is persisted with the document as a plain
//! RON sequence of strings.

use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::codec::{self, CodecError};

/// Minimum number of generation attempts before issuance gives up
pub const DEFAULT_ATTEMPT_LIMIT: usize = 10_000;

/// An opaque, immutable identifier string
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Wrap an existing identifier string (e.g. one read back from a file name)
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identifier {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Identifier {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Error type for identifier issuance and persistence
#[derive(Debug, Error)]
pub enum IdentifierError {
    /// Tried to restore a provider from empty input
    #[error("identifier provider data is missing")]
    MissingInputData,

    /// The persisted identifier sequence could not be decoded
    #[error("identifier provider data is malformed: {0}")]
    Malformed(#[source] CodecError),

    /// The identifier sequence could not be encoded
    #[error("failed to encode identifier provider: {0}")]
    Encode(#[source] CodecError),

    /// Every attempt produced an identifier that was already issued.
    ///
    /// Random identifiers practically never collide, so this signals an
    /// internal fault (e.g. a broken random source), not a normal condition.
    #[error("could not issue a unique identifier after {attempts} attempts")]
    InternalFault { attempts: usize },
}

/// Issues collision-checked identifiers and remembers all of them
#[derive(Debug)]
pub struct IdentifierProvider {
    /// Issued identifiers in issue order (the persisted form)
    issued: Vec<Identifier>,
    /// Same identifiers, for constant-time collision checks
    index: HashSet<Identifier>,
    rng: StdRng,
    attempt_limit: usize,
}

/// The issuer shared by every component of one document
pub type SharedIdentifierProvider = Rc<RefCell<IdentifierProvider>>;

impl Default for IdentifierProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentifierProvider {
    /// Create an empty provider with an entropy-seeded random source
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Create an empty provider with a deterministic random source
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            issued: Vec::new(),
            index: HashSet::new(),
            rng,
            attempt_limit: DEFAULT_ATTEMPT_LIMIT,
        }
    }

    /// Override how many collisions `new_identifier` tolerates before failing.
    ///
    /// Unlike [`set_attempt_limit`](Self::set_attempt_limit) this accepts
    /// bounds below [`DEFAULT_ATTEMPT_LIMIT`], for exercising exhaustion.
    pub fn with_attempt_limit(mut self, attempts: usize) -> Self {
        self.attempt_limit = attempts.max(1);
        self
    }

    /// Raise the attempt bound; never goes below [`DEFAULT_ATTEMPT_LIMIT`]
    pub fn set_attempt_limit(&mut self, attempts: usize) {
        if attempts < DEFAULT_ATTEMPT_LIMIT {
            tracing::warn!(
                requested = attempts,
                minimum = DEFAULT_ATTEMPT_LIMIT,
                "identifier attempt bound below minimum; using minimum"
            );
        }
        self.attempt_limit = attempts.max(DEFAULT_ATTEMPT_LIMIT);
    }

    pub fn attempt_limit(&self) -> usize {
        self.attempt_limit
    }

    /// Wrap this provider for sharing between document components
    pub fn into_shared(self) -> SharedIdentifierProvider {
        Rc::new(RefCell::new(self))
    }

    /// Issue a new identifier, checked against everything issued before
    pub fn new_identifier(&mut self) -> Result<Identifier, IdentifierError> {
        for _ in 0..self.attempt_limit {
            let candidate = self.generate();
            if !self.index.contains(&candidate) {
                self.record(candidate.clone());
                return Ok(candidate);
            }
        }
        tracing::error!(
            attempts = self.attempt_limit,
            issued = self.issued.len(),
            "identifier issuance exhausted its attempts"
        );
        Err(IdentifierError::InternalFault {
            attempts: self.attempt_limit,
        })
    }

    /// Issue a new identifier without the collision retry loop.
    ///
    /// The result is still recorded, so later checked calls never return it.
    pub fn new_unchecked_identifier(&mut self) -> Identifier {
        let candidate = self.generate();
        self.record(candidate.clone());
        candidate
    }

    /// Whether the identifier has been issued (or registered) by this provider
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.index.contains(identifier)
    }

    /// Record an identifier obtained elsewhere so it is never issued again.
    ///
    /// Returns false if it was already known.
    pub fn register(&mut self, identifier: Identifier) -> bool {
        if self.index.contains(&identifier) {
            return false;
        }
        self.record(identifier);
        true
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Iterate over known identifiers in issue order
    pub fn iter(&self) -> impl Iterator<Item = &Identifier> {
        self.issued.iter()
    }

    /// Serialize the issued identifiers as a RON sequence
    pub fn to_bytes(&self) -> Result<Vec<u8>, IdentifierError> {
        codec::encode_record(&self.issued, false).map_err(IdentifierError::Encode)
    }

    /// Restore a provider from its serialized sequence
    pub fn from_bytes(data: &[u8]) -> Result<Self, IdentifierError> {
        if data.is_empty() {
            return Err(IdentifierError::MissingInputData);
        }
        let issued: Vec<Identifier> =
            codec::decode_record(data).map_err(IdentifierError::Malformed)?;

        let mut provider = Self::new();
        for identifier in issued {
            provider.register(identifier);
        }
        Ok(provider)
    }

    fn generate(&mut self) -> Identifier {
        let bytes: [u8; 16] = self.rng.gen();
        let uuid = uuid::Builder::from_random_bytes(bytes).into_uuid();
        Identifier(uuid.hyphenated().encode_upper(&mut uuid::Uuid::encode_buffer()).to_string())
    }

    fn record(&mut self, identifier: Identifier) {
        self.index.insert(identifier.clone());
        self.issued.push(identifier);
    }
}
