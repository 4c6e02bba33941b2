// src/policy.rs

//! Authorization checks shared by every protected operation.
//!
//! A [`Policy`] runs its checks in the order they are chained and stops at
//! the first one that fails, so the resulting [`Decision`] always names the
//! earliest reason a request was refused. Handlers chain the checks in this
//! order: session user exists, target exists, caller not frozen, caller owns
//! the target, caller is admin, caller is who they claim to be.

use crate::{error::AppError, models::user::User};

pub const UNAUTHENTICATED: &str = "You are not authorized to call this API.";
pub const FROZEN: &str = "You are not authorized to call this API. Your account is frozen.";
pub const NOT_ADMIN: &str = "You are not authorized to call this API. You are not an admin.";
pub const NOT_SELF: &str =
    "You are not authorized to call this API. You are not who you say you are.";
pub const SESSION_USER_MISSING: &str = "The user attached to this session doesn't exist.";

/// Outcome of an authorization pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allowed,
    Unauthenticated,
    NotFound(&'static str),
    Unprocessable(&'static str),
    Frozen,
    Forbidden(&'static str),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed)
    }

    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allowed => Ok(()),
            denied => Err(denied.into()),
        }
    }
}

impl From<Decision> for AppError {
    fn from(decision: Decision) -> Self {
        match decision {
            // Only reachable if a caller converts an allowed decision by hand.
            Decision::Allowed => AppError::InternalServerError("allowed decision used as error".into()),
            Decision::Unauthenticated => AppError::AuthError(UNAUTHENTICATED.into()),
            Decision::NotFound(msg) => AppError::NotFound(msg.into()),
            Decision::Unprocessable(msg) => AppError::Unprocessable(msg.into()),
            Decision::Frozen => AppError::Forbidden(FROZEN.into()),
            Decision::Forbidden(msg) => AppError::Forbidden(msg.into()),
        }
    }
}

/// Session identity: the e-mail the token was issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub email: String,
}

/// The first check of every protected operation.
pub fn authenticate(principal: Option<Principal>) -> Result<Principal, Decision> {
    principal.ok_or(Decision::Unauthenticated)
}

/// Short-circuiting chain of checks against the acting user.
#[derive(Debug)]
pub struct Policy<'a> {
    actor: Option<&'a User>,
    decision: Decision,
}

impl<'a> Policy<'a> {
    /// Starts a pipeline for the user record resolved from the session.
    pub fn new(actor: Option<&'a User>) -> Self {
        Self {
            actor,
            decision: Decision::Allowed,
        }
    }

    fn then(mut self, check: impl FnOnce(&Self) -> Decision) -> Self {
        if self.decision.is_allowed() {
            self.decision = check(&self);
        }
        self
    }

    /// The session user must still exist in the store.
    pub fn actor_exists(self, otherwise: Decision) -> Self {
        self.then(|p| match p.actor {
            Some(_) => Decision::Allowed,
            None => otherwise,
        })
    }

    /// The targeted entity must exist.
    pub fn exists<T>(self, target: Option<&T>, otherwise: Decision) -> Self {
        self.then(|_| match target {
            Some(_) => Decision::Allowed,
            None => otherwise,
        })
    }

    /// Frozen users may not mutate anything guarded by this check.
    pub fn not_frozen(self) -> Self {
        self.then(|p| match p.actor {
            Some(user) if user.frozen => Decision::Frozen,
            Some(_) => Decision::Allowed,
            None => Decision::NotFound(SESSION_USER_MISSING),
        })
    }

    /// The acting user must be the owner at the end of the owner chain.
    pub fn owns(self, owner_id: Option<&str>, otherwise: &'static str) -> Self {
        self.then(|p| match (p.actor, owner_id) {
            (Some(user), Some(owner)) if user.id == owner => Decision::Allowed,
            (None, _) => Decision::NotFound(SESSION_USER_MISSING),
            _ => Decision::Forbidden(otherwise),
        })
    }

    pub fn admin(self) -> Self {
        self.then(|p| match p.actor {
            Some(user) if user.admin => Decision::Allowed,
            _ => Decision::Forbidden(NOT_ADMIN),
        })
    }

    /// The e-mail the caller restated in the request body must be their own.
    pub fn claims_identity(self, claimed_email: &str) -> Self {
        self.then(|p| match p.actor {
            Some(user) if user.email == claimed_email => Decision::Allowed,
            _ => Decision::Forbidden(NOT_SELF),
        })
    }

    pub fn decide(self) -> Decision {
        self.decision
    }

    /// Finishes the pipeline, handing back the acting user when allowed.
    pub fn check(self) -> Result<&'a User, AppError> {
        match (self.decision, self.actor) {
            (Decision::Allowed, Some(user)) => Ok(user),
            (Decision::Allowed, None) => Err(Decision::NotFound(SESSION_USER_MISSING).into()),
            (denied, _) => {
                tracing::debug!(?denied, "request refused by policy");
                Err(denied.into())
            }
        }
    }
}
