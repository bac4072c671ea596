//! Eligibility guard
//!
//! Pure predicate functions over account, competition, and
//! registration state. No store access and no mutation: callers supply
//! fresh reads (the existing registration in particular) and the
//! current instant. Used by the registration machine and exposed for
//! UI hints.

use chrono::{DateTime, Utc};

use crate::models::{Competition, Registration, User};

/// Check whether a user may participate in a competition.
///
/// `existing_registration` is the registration already held by this
/// user for the competition, if any, read at call time.
pub fn can_participate(
    user: &User,
    existing_registration: Option<&Registration>,
) -> Result<(), &'static str> {
    if !user.is_active() {
        return Err("Account not active");
    }
    if !user.email_verified {
        return Err("Email not verified");
    }
    if existing_registration.is_some() {
        return Err("Already registered for this competition");
    }
    Ok(())
}

/// Check whether a competition currently accepts new registrations
pub fn registration_open(competition: &Competition, now: DateTime<Utc>) -> bool {
    competition.is_registration_open(now)
}

/// Full registration gate: window first, then participant eligibility
pub fn can_register(
    user: &User,
    competition: &Competition,
    existing_registration: Option<&Registration>,
    now: DateTime<Utc>,
) -> Result<(), &'static str> {
    if !registration_open(competition, now) {
        return Err("Registration is not open");
    }
    can_participate(user, existing_registration)
}
