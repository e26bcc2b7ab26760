//! Who a cart request is for.
//!
//! An authenticated user always wins: their cart is keyed by user id and any
//! session token on the request is ignored. Anonymous shoppers are keyed by
//! the session token they send; when they send none, a fresh token is minted
//! and carried back on the cart so the client can reuse it.

use cartline_core::{SessionToken, UserId};

use crate::models::CartOwner;

/// Identity information extracted from a request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestIdentity {
    pub user: Option<UserId>,
    pub session_token: Option<SessionToken>,
}

impl RequestIdentity {
    /// An authenticated user.
    #[must_use]
    pub const fn user(id: UserId) -> Self {
        Self {
            user: Some(id),
            session_token: None,
        }
    }

    /// An anonymous shopper with a known token.
    #[must_use]
    pub const fn session(token: SessionToken) -> Self {
        Self {
            user: None,
            session_token: Some(token),
        }
    }

    /// An anonymous shopper with no token yet.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self {
            user: None,
            session_token: None,
        }
    }

    /// Resolve to exactly one cart owner, minting a token if needed.
    #[must_use]
    pub fn resolve(&self) -> ResolvedIdentity {
        if let Some(user) = self.user {
            return ResolvedIdentity {
                owner: CartOwner::User(user),
                issued: false,
            };
        }

        match &self.session_token {
            Some(token) => ResolvedIdentity {
                owner: CartOwner::Session(token.clone()),
                issued: false,
            },
            None => ResolvedIdentity {
                owner: CartOwner::Session(SessionToken::generate()),
                issued: true,
            },
        }
    }

    /// The owner for read-only lookups; `None` for a token-less anonymous
    /// request, which cannot have a cart yet.
    #[must_use]
    pub fn existing_owner(&self) -> Option<CartOwner> {
        match (self.user, &self.session_token) {
            (Some(user), _) => Some(CartOwner::User(user)),
            (None, Some(token)) => Some(CartOwner::Session(token.clone())),
            (None, None) => None,
        }
    }
}

/// The outcome of identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub owner: CartOwner,
    /// Whether the session token was generated for this request.
    pub issued: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_wins_over_session_token() {
        let identity = RequestIdentity {
            user: Some(UserId::new(5)),
            session_token: Some(SessionToken::generate()),
        };
        let resolved = identity.resolve();
        assert_eq!(resolved.owner, CartOwner::User(UserId::new(5)));
        assert!(!resolved.issued);
    }

    #[test]
    fn test_supplied_token_is_reused() {
        let token = SessionToken::generate();
        let resolved = RequestIdentity::session(token.clone()).resolve();
        assert_eq!(resolved.owner, CartOwner::Session(token));
        assert!(!resolved.issued);
    }

    #[test]
    fn test_missing_token_is_minted() {
        let first = RequestIdentity::anonymous().resolve();
        let second = RequestIdentity::anonymous().resolve();
        assert!(first.issued);
        assert!(first.owner.session_token().is_some());
        assert_ne!(first.owner, second.owner);
        assert_eq!(RequestIdentity::anonymous().existing_owner(), None);
    }
}
