//! # Collateral Invariant
//!
//! For every operator and every application `a`:
//!
//! ```text
//! authorized(a) <= native + legacy_a + legacy_b
//! ```
//!
//! Withdrawals are bounded by the smallest slack across applications:
//!
//! ```text
//! slack(a)          = total - authorized(a)
//! min_locked(s)     = max over a of max(0, balance(s) - slack(a))
//! withdrawable(s)   = balance(s) - min_locked(s)
//! ```
//!
//! which makes `withdrawable(s) = min(balance(s), min over a of slack(a))`.
//! Withdrawing at most that much from `s` keeps the invariant for every
//! application. Pending decreases do not count until approved.

use unistake_core::Amount;

/// Headroom between total stake and one application's authorization.
pub fn slack(total: Amount, authorized: Amount) -> Amount {
    total.saturating_sub(authorized)
}

/// Portion of `balance` that must stay locked so no application drops
/// below its authorization.
pub fn min_locked<I>(balance: Amount, total: Amount, authorizations: I) -> Amount
where
    I: IntoIterator<Item = Amount>,
{
    authorizations
        .into_iter()
        .map(|authorized| balance.saturating_sub(slack(total, authorized)))
        .max()
        .unwrap_or(Amount::ZERO)
}

/// Portion of `balance` that may be withdrawn.
pub fn withdrawable<I>(balance: Amount, total: Amount, authorizations: I) -> Amount
where
    I: IntoIterator<Item = Amount>,
{
    balance.saturating_sub(min_locked(balance, total, authorizations))
}

/// Stake not yet committed to any application.
///
/// Authorizations can overlap, but their sum is held at or below total stake
/// when an increase is granted, so this is what a further increase may use.
pub fn available_to_authorize<I>(total: Amount, authorizations: I) -> Amount
where
    I: IntoIterator<Item = Amount>,
{
    let committed = authorizations
        .into_iter()
        .fold(Amount::ZERO, |acc, a| acc.checked_add(a).unwrap_or(Amount::MAX));
    total.saturating_sub(committed)
}

/// Whether `total` covers every authorization.
pub fn is_collateralized<I>(total: Amount, authorizations: I) -> bool
where
    I: IntoIterator<Item = Amount>,
{
    authorizations.into_iter().all(|a| a <= total)
}
