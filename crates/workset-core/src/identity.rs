//! Caller identity resolution.
//!
//! Every public operation starts by turning the calling principal into an
//! [`OwnerId`]. Stores are keyed by owner, so a caller can only ever reach
//! its own sessions.

use std::collections::HashSet;

use async_trait::async_trait;
use workset_state::OwnerId;

use crate::memory::{MemoryResult, NotFoundKind, WorkingMemoryError};

/// The principal on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    subject: Option<String>,
}

impl Caller {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: Some(subject.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { subject: None }
    }

    /// The authenticated subject, if any. Blank subjects count as anonymous.
    pub fn subject(&self) -> Option<&str> {
        self.subject
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Map `caller` to the owner its stores are filed under.
    ///
    /// Fails with `NotAuthenticated` for an anonymous caller and
    /// `NotFound(Owner)` for a subject with no known owner.
    async fn resolve(&self, caller: &Caller) -> MemoryResult<OwnerId>;
}

/// Accepts only subjects from a fixed set.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityResolver {
    known: HashSet<String>,
}

impl StaticIdentityResolver {
    pub fn new<I, S>(owners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            known: owners.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl IdentityResolver for StaticIdentityResolver {
    async fn resolve(&self, caller: &Caller) -> MemoryResult<OwnerId> {
        let subject = caller.subject().ok_or(WorkingMemoryError::NotAuthenticated)?;
        if self.known.contains(subject) {
            Ok(OwnerId(subject.to_string()))
        } else {
            Err(WorkingMemoryError::NotFound(NotFoundKind::Owner(
                subject.to_string(),
            )))
        }
    }
}

/// Trusts any non-blank subject as its own owner.
///
/// Used by the local CLI and daemon, which already run with the authority of
/// the invoking OS user.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrustedIdentityResolver;

#[async_trait]
impl IdentityResolver for TrustedIdentityResolver {
    async fn resolve(&self, caller: &Caller) -> MemoryResult<OwnerId> {
        caller
            .subject()
            .map(|s| OwnerId(s.to_string()))
            .ok_or(WorkingMemoryError::NotAuthenticated)
    }
}
