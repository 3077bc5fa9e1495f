//! Identity shared with everything rendered inside an authorized gate.
//!
//! SYSTEM CONTEXT
//! ==============
//! A gate publishes one `IdentityContext` when it becomes authorized and
//! hands it to its children by reference. Descendants pass it further down
//! (or clone it, which only bumps an `Arc`) instead of threading individual
//! fields. Readers outside an authorized gate see `IdentityContext::default()`,
//! the empty-email sentinel.

#[cfg(test)]
#[path = "context_test.rs"]
mod context_test;

use std::sync::Arc;

use crate::session::Identity;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityContext {
    identity: Arc<Identity>,
}

impl IdentityContext {
    /// Only the gate provides a populated context.
    pub(crate) fn provide(identity: Arc<Identity>) -> Self {
        Self { identity }
    }

    #[must_use]
    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.identity.email
    }
}

/// Identity attributes a field can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    Email,
}

impl FieldKey {
    /// `None` for names this crate does not expose.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "email" => Some(Self::Email),
            _ => None,
        }
    }
}

/// Leaf reader for one named identity attribute.
///
/// Unrecognized names render nothing rather than failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorizedField {
    key: Option<FieldKey>,
}

impl AuthorizedField {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self { key: FieldKey::parse(name) }
    }

    #[must_use]
    pub fn key(&self) -> Option<FieldKey> {
        self.key
    }

    /// The attribute verbatim, or `None` for an unrecognized name.
    #[must_use]
    pub fn render<'a>(&self, ctx: &'a IdentityContext) -> Option<&'a str> {
        match self.key? {
            FieldKey::Email => Some(ctx.email()),
        }
    }
}
