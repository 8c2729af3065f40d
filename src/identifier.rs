//! Unique identifiers for features, constraints and models.
//!
//! Every identifier remembers the [`IdentifierFactory`] that minted it, so a
//! fresh identifier of the same scheme can be produced later (for example when
//! a feature is cloned into the same model). Identifiers compare by value only.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use serde::{Serialize, Serializer};
use uuid::Uuid;

use crate::error::{ModelError, Result};

/// The two supported identifier schemes.
///
/// - `Counter`: monotonically increasing integers, deterministic and reproducible
/// - `Uuid`: random 128-bit values, unique across processes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierScheme {
    Counter,
    Uuid,
}

impl IdentifierScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counter => "counter",
            Self::Uuid => "uuid",
        }
    }
}

impl fmt::Display for IdentifierScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IdentifierScheme {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "counter" => Ok(Self::Counter),
            "uuid" => Ok(Self::Uuid),
            _ => Err(ModelError::InvalidScheme(s.to_string())),
        }
    }
}

/// Largest counter value accepted by [`IdentifierFactory::parse`].
pub const MAX_PARSED_COUNTER: u64 = i64::MAX as u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum IdentifierValue {
    Counter(u64),
    Uuid(Uuid),
}

/// Mints identifiers of one scheme.
///
/// Cloning a counter factory shares its counter, so every clone keeps issuing
/// values distinct from the others.
#[derive(Debug, Clone)]
pub enum IdentifierFactory {
    Counter(Arc<AtomicU64>),
    Uuid,
}

impl IdentifierFactory {
    /// A fresh counter factory. The first identifier it issues is `1`.
    pub fn counter() -> Self {
        Self::Counter(Arc::new(AtomicU64::new(0)))
    }

    pub fn uuid() -> Self {
        Self::Uuid
    }

    pub fn for_scheme(scheme: IdentifierScheme) -> Self {
        match scheme {
            IdentifierScheme::Counter => Self::counter(),
            IdentifierScheme::Uuid => Self::uuid(),
        }
    }

    pub fn scheme(&self) -> IdentifierScheme {
        match self {
            Self::Counter(_) => IdentifierScheme::Counter,
            Self::Uuid => IdentifierScheme::Uuid,
        }
    }

    /// Issue an identifier distinct from every one this factory issued before.
    ///
    /// Parsed counter values stay below [`MAX_PARSED_COUNTER`], which leaves
    /// at least 2^63 values to issue before the counter runs out.
    pub fn new_identifier(&self) -> Identifier {
        self.try_new_identifier()
            .expect("counter identifier space exhausted")
    }

    /// Like [`new_identifier`](Self::new_identifier), but reports an exhausted
    /// counter instead of panicking. The counter never wraps around.
    pub fn try_new_identifier(&self) -> Result<Identifier> {
        let value = match self {
            Self::Counter(counter) => {
                let previous = counter
                    .fetch_update(AtomicOrdering::Relaxed, AtomicOrdering::Relaxed, |n| {
                        n.checked_add(1)
                    })
                    .map_err(|_| ModelError::IdentifiersExhausted(self.scheme()))?;
                IdentifierValue::Counter(previous + 1)
            }
            Self::Uuid => IdentifierValue::Uuid(Uuid::new_v4()),
        };
        Ok(Identifier {
            value,
            factory: self.clone(),
        })
    }

    /// Reconstruct an identifier from its textual form.
    ///
    /// Counter identifiers are plain decimal digits without leading zeros, up
    /// to [`MAX_PARSED_COUNTER`]; parsing one moves the counter past it so the
    /// factory never issues it again.
    pub fn parse(&self, input: &str) -> Result<Identifier> {
        let malformed = || ModelError::MalformedIdentifier {
            scheme: self.scheme(),
            input: input.to_string(),
        };

        let value = match self {
            Self::Counter(counter) => {
                if input.is_empty()
                    || !input.bytes().all(|b| b.is_ascii_digit())
                    || (input.len() > 1 && input.starts_with('0'))
                {
                    return Err(malformed());
                }
                let n = input.parse::<u64>().map_err(|_| malformed())?;
                if n > MAX_PARSED_COUNTER {
                    return Err(malformed());
                }
                counter.fetch_max(n, AtomicOrdering::Relaxed);
                IdentifierValue::Counter(n)
            }
            Self::Uuid => IdentifierValue::Uuid(Uuid::parse_str(input).map_err(|_| malformed())?),
        };

        Ok(Identifier {
            value,
            factory: self.clone(),
        })
    }
}

/// Identifies one entity within a feature model.
#[derive(Clone)]
pub struct Identifier {
    value: IdentifierValue,
    factory: IdentifierFactory,
}

impl Identifier {
    /// Shorthand for the first identifier of a brand new counter factory.
    pub fn new_counter() -> Self {
        IdentifierFactory::counter().new_identifier()
    }

    pub fn new_uuid() -> Self {
        IdentifierFactory::uuid().new_identifier()
    }

    pub fn factory(&self) -> &IdentifierFactory {
        &self.factory
    }

    pub fn scheme(&self) -> IdentifierScheme {
        self.factory.scheme()
    }

    /// Mint a new identifier from the factory that produced this one.
    pub fn new_identifier(&self) -> Identifier {
        self.factory.new_identifier()
    }
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.value.cmp(&other.value)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            IdentifierValue::Counter(n) => write!(f, "{}", n),
            IdentifierValue::Uuid(uuid) => write!(f, "{}", uuid.hyphenated()),
        }
    }
}

impl fmt::Debug for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Identifier({})", self)
    }
}

impl Serialize for Identifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
