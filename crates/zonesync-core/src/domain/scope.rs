//! Scopes and partitions of the remote store
//!
//! A [`Scope`] is a top-level namespace (private, shared or public data).
//! A [`Partition`] is a zone inside one scope whose changes are tracked
//! independently. Both own a change token; the [`TokenKeyed`] trait is the
//! single place where the storage key for that token is derived.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::DomainError;
use super::newtypes::{PartitionName, SubscriptionId, TokenKey};

/// Anything that owns a change token
///
/// Implementors derive a key that is unique across all scopes, so two
/// partitions with the same name in different scopes never share a token.
pub trait TokenKeyed {
    /// Returns the unprefixed key under which this item's token is stored
    fn token_key(&self) -> TokenKey;
}

// ============================================================================
// Scope
// ============================================================================

/// Kind of top-level namespace in the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeKind {
    /// Data owned by the signed-in user
    Private,
    /// Data other users shared with the signed-in user
    Shared,
    /// World-readable data
    Public,
}

impl ScopeKind {
    /// All scope kinds, in a stable order
    pub const ALL: [ScopeKind; 3] = [ScopeKind::Private, ScopeKind::Shared, ScopeKind::Public];

    /// Stable lowercase name, also used as the token key
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Private => "private",
            ScopeKind::Shared => "shared",
            ScopeKind::Public => "public",
        }
    }
}

impl Display for ScopeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ScopeKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(ScopeKind::Private),
            "shared" => Ok(ScopeKind::Shared),
            "public" => Ok(ScopeKind::Public),
            other => Err(DomainError::UnknownScope(other.to_string())),
        }
    }
}

/// A top-level namespace of the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    kind: ScopeKind,
}

impl Scope {
    /// Creates a scope of the given kind
    #[must_use]
    pub const fn new(kind: ScopeKind) -> Self {
        Self { kind }
    }

    /// The user's private scope
    #[must_use]
    pub const fn private() -> Self {
        Self::new(ScopeKind::Private)
    }

    /// The shared scope
    #[must_use]
    pub const fn shared() -> Self {
        Self::new(ScopeKind::Shared)
    }

    /// The public scope
    #[must_use]
    pub const fn public() -> Self {
        Self::new(ScopeKind::Public)
    }

    /// Returns the kind of this scope
    #[must_use]
    pub const fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Builds a partition of this scope
    #[must_use]
    pub fn partition(&self, name: PartitionName) -> Partition {
        Partition::new(self.kind, name)
    }
}

impl From<ScopeKind> for Scope {
    fn from(kind: ScopeKind) -> Self {
        Self::new(kind)
    }
}

impl Display for Scope {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl TokenKeyed for Scope {
    fn token_key(&self) -> TokenKey {
        TokenKey::new(self.kind.as_str())
    }
}

// ============================================================================
// Partition
// ============================================================================

/// A zone within a scope
///
/// The partition refers to its scope by kind only; it does not hold the
/// scope itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Partition {
    scope: ScopeKind,
    name: PartitionName,
}

impl Partition {
    /// Creates a partition reference
    #[must_use]
    pub fn new(scope: ScopeKind, name: PartitionName) -> Self {
        Self { scope, name }
    }

    /// Returns the kind of the owning scope
    #[must_use]
    pub fn scope(&self) -> ScopeKind {
        self.scope
    }

    /// Returns the partition name
    #[must_use]
    pub fn name(&self) -> &PartitionName {
        &self.name
    }
}

impl Display for Partition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scope, self.name)
    }
}

impl TokenKeyed for Partition {
    fn token_key(&self) -> TokenKey {
        TokenKey::new(format!("{}.{}", self.scope.as_str(), self.name.as_str()))
    }
}

// ============================================================================
// SyncTarget
// ============================================================================

/// A scope together with the subscription that watches it
///
/// One orchestrator run synchronizes exactly one target.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SyncTarget {
    pub scope: Scope,
    pub subscription_id: SubscriptionId,
}

impl SyncTarget {
    /// Creates a target
    pub fn new(scope: Scope, subscription_id: SubscriptionId) -> Self {
        Self {
            scope,
            subscription_id,
        }
    }
}

impl Display for SyncTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.scope, self.subscription_id)
    }
}
