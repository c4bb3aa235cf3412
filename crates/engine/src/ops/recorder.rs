//! The single write path for ledger entries.
//!
//! Deposits and withdrawals go through [`record`]: it validates the requested
//! allocations, reconciles them with the entry amount, locks the targeted
//! pools, checks balances for withdrawals and then writes one `ledger` row
//! plus one `allocation` row per pool. It always runs inside the caller's
//! transaction, so either everything is written or nothing is.

use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::{DatabaseTransaction, QueryFilter, QueryOrder, QuerySelect, prelude::*};

use crate::{
    Allocation, AllocationRequest, CAPTURE_TOLERANCE_MINOR, EngineError, LedgerEntry, MoneyCents,
    PayerName, ResultEngine, TransactionKind, VerifiedCapture, allocations, funding_pools, ledger,
    users::display_parts,
};

use super::balances::pool_balances;

/// Where the amount of an entry comes from.
#[derive(Clone, Debug)]
pub(super) enum EntrySource {
    /// Paid through the payment processor. The capture fixes the amount.
    Captured(VerifiedCapture),
    /// Entered by a moderator. The amount is the allocation sum.
    Moderator,
}

/// Whether a display name is stored on the entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum DisplayName {
    Hidden,
    /// First and last name of the attributed user when known; the payer
    /// record of a capture is the fallback.
    Resolve(Option<(String, String)>),
}

#[derive(Clone, Debug)]
pub(super) struct RecordCmd {
    pub kind: TransactionKind,
    pub source: EntrySource,
    pub attributed_user: Option<String>,
    pub anonymous: bool,
    pub display: DisplayName,
    pub description: Option<String>,
    pub allocations: Vec<AllocationRequest>,
}

/// How zero-amount allocations are treated.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(super) enum ZeroAllocations {
    /// Captured deposits: zeros are dropped, never stored.
    Drop,
    /// Moderator entries: every allocation must be strictly positive.
    Reject,
}

impl EntrySource {
    pub(super) fn zero_allocations(&self) -> ZeroAllocations {
        match self {
            Self::Captured(_) => ZeroAllocations::Drop,
            Self::Moderator => ZeroAllocations::Reject,
        }
    }
}

/// Reject negative amounts, apply the zero policy and require a non-empty set.
pub(super) fn normalize_allocations(
    requested: &[AllocationRequest],
    zeros: ZeroAllocations,
) -> ResultEngine<Vec<AllocationRequest>> {
    if requested.iter().any(|a| a.amount.is_negative()) {
        return Err(EngineError::Validation(
            "allocation amounts must not be negative".to_string(),
        ));
    }
    if zeros == ZeroAllocations::Reject && requested.iter().any(|a| a.amount.is_zero()) {
        return Err(EngineError::Validation(
            "allocation amounts must be positive".to_string(),
        ));
    }

    let kept: Vec<AllocationRequest> = requested
        .iter()
        .copied()
        .filter(|a| !a.amount.is_zero())
        .collect();
    if kept.is_empty() {
        return Err(EngineError::Validation(
            "at least one allocation is required".to_string(),
        ));
    }
    Ok(kept)
}

pub(super) fn allocation_sum(allocations: &[AllocationRequest]) -> ResultEngine<MoneyCents> {
    allocations
        .iter()
        .try_fold(MoneyCents::ZERO, |acc, a| acc.checked_add(a.amount))
        .ok_or_else(|| EngineError::Validation("allocation total too large".to_string()))
}

/// Fix the entry amount and make the allocations sum to it exactly.
///
/// For captured deposits the captured amount wins. A difference within
/// [`CAPTURE_TOLERANCE_MINOR`] is absorbed by the largest allocation; anything
/// beyond it is a [`EngineError::SecurityMismatch`]. An allocation brought
/// down to zero by the residual is dropped.
pub(super) fn reconcile(
    source: &EntrySource,
    mut allocations: Vec<AllocationRequest>,
) -> ResultEngine<(MoneyCents, Vec<AllocationRequest>)> {
    let declared = allocation_sum(&allocations)?;
    let EntrySource::Captured(capture) = source else {
        return Ok((declared, allocations));
    };

    let captured = capture.amount;
    if captured.abs_diff(declared) > CAPTURE_TOLERANCE_MINOR {
        return Err(EngineError::SecurityMismatch { captured, declared });
    }

    let residual = captured - declared;
    if !residual.is_zero() {
        let largest = allocations
            .iter_mut()
            .reduce(|best, a| if a.amount > best.amount { a } else { best });
        if let Some(target) = largest {
            target.amount += residual;
        }
        allocations.retain(|a| a.amount.is_positive());
    }
    Ok((captured, allocations))
}

/// Requested amount per pool, summing repeated pool ids.
pub(super) fn per_pool_totals(allocations: &[AllocationRequest]) -> BTreeMap<i32, MoneyCents> {
    let mut totals: BTreeMap<i32, MoneyCents> = BTreeMap::new();
    for a in allocations {
        *totals.entry(a.funding_pool_id).or_default() += a.amount;
    }
    totals
}

/// First name and last initial for the ledger.
///
/// The stored user wins; the processor's payer record is the fallback.
fn resolve_display(
    user: Option<(String, String)>,
    payer: Option<&PayerName>,
) -> (Option<String>, Option<String>) {
    if let Some((first, last)) = user {
        let parts = display_parts(&first, &last);
        if parts.0.is_some() {
            return parts;
        }
    }
    match payer {
        Some(payer) => display_parts(
            payer.given_name.as_deref().unwrap_or_default(),
            payer.surname.as_deref().unwrap_or_default(),
        ),
        None => (None, None),
    }
}

/// Lock the targeted pools in ascending id order and fail if any is missing.
///
/// Withdrawals lock exclusively so concurrent withdrawals on the same pool
/// serialize before reading balances. Deposits take a shared lock, enough to
/// block a concurrent delete.
async fn lock_pools(
    db_tx: &DatabaseTransaction,
    kind: TransactionKind,
    pool_ids: &[i32],
) -> ResultEngine<()> {
    let query = funding_pools::Entity::find()
        .filter(funding_pools::Column::Id.is_in(pool_ids.iter().copied()))
        .order_by_asc(funding_pools::Column::Id);
    let query = match kind {
        TransactionKind::Withdrawal => query.lock_exclusive(),
        TransactionKind::Deposit => query.lock_shared(),
    };
    let found = query.all(db_tx).await?;
    if found.len() != pool_ids.len() {
        return Err(EngineError::KeyNotFound(
            "funding pool not found".to_string(),
        ));
    }
    Ok(())
}

pub(super) async fn record(
    db_tx: &DatabaseTransaction,
    cmd: RecordCmd,
) -> ResultEngine<LedgerEntry> {
    let requested = normalize_allocations(&cmd.allocations, cmd.source.zero_allocations())?;
    let (amount, requested) = reconcile(&cmd.source, requested)?;

    let totals = per_pool_totals(&requested);
    let pool_ids: Vec<i32> = totals.keys().copied().collect();
    lock_pools(db_tx, cmd.kind, &pool_ids).await?;

    if cmd.kind == TransactionKind::Withdrawal {
        let balances = pool_balances(db_tx, &pool_ids).await?;
        for (pool_id, wanted) in &totals {
            let balance = balances.get(pool_id).copied().unwrap_or_default();
            if *wanted > balance {
                return Err(EngineError::InsufficientFunds(format!(
                    "withdrawal amount for pool {pool_id} exceeds its balance of {balance}"
                )));
            }
        }
    }

    let (first_name, last_initial) = match (cmd.anonymous, cmd.display) {
        (true, _) | (_, DisplayName::Hidden) => (None, None),
        (false, DisplayName::Resolve(user)) => {
            let payer = match &cmd.source {
                EntrySource::Captured(capture) => Some(&capture.payer),
                EntrySource::Moderator => None,
            };
            resolve_display(user, payer)
        }
    };

    let transaction_id = match &cmd.source {
        EntrySource::Captured(capture) => Some(capture.capture_id.clone()),
        EntrySource::Moderator => None,
    };

    let mut entry = LedgerEntry {
        id: 0,
        transaction_id,
        amount,
        created_at: Utc::now(),
        kind: cmd.kind,
        user_subject_id: cmd.attributed_user,
        first_name,
        last_initial,
        anonymous: cmd.anonymous,
        description: cmd.description,
        allocations: Vec::with_capacity(requested.len()),
    };

    let inserted = ledger::ActiveModel::from(&entry).insert(db_tx).await?;
    entry.id = inserted.id;

    for request in &requested {
        let model = allocations::ActiveModel::new_allocation(
            entry.id,
            request.funding_pool_id,
            request.amount,
        )
        .insert(db_tx)
        .await?;
        entry.allocations.push(Allocation::from(model));
    }

    tracing::info!(
        ledger_id = entry.id,
        kind = entry.kind.as_str(),
        amount = %entry.amount,
        allocations = entry.allocations.len(),
        "ledger entry recorded"
    );
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(cents: i64) -> EntrySource {
        EntrySource::Captured(VerifiedCapture {
            amount: MoneyCents::new(cents),
            capture_id: "CAP".to_string(),
            payer: PayerName::default(),
        })
    }

    fn alloc(pool: i32, cents: i64) -> AllocationRequest {
        AllocationRequest::new(pool, cents)
    }

    #[test]
    fn captured_deposits_drop_zero_allocations() {
        let kept =
            normalize_allocations(&[alloc(1, 3000), alloc(2, 0)], ZeroAllocations::Drop).unwrap();
        assert_eq!(kept, vec![alloc(1, 3000)]);
    }

    #[test]
    fn moderator_entries_reject_zero() {
        let err = normalize_allocations(&[alloc(1, 0)], ZeroAllocations::Reject).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[test]
    fn negatives_and_empty_sets_are_rejected() {
        let zeros = ZeroAllocations::Drop;
        assert!(normalize_allocations(&[alloc(1, -1), alloc(2, 101)], zeros).is_err());
        assert!(normalize_allocations(&[alloc(1, 0)], zeros).is_err());
        assert!(normalize_allocations(&[], ZeroAllocations::Reject).is_err());
    }

    #[test]
    fn exact_capture_keeps_allocations() {
        let (amount, allocations) =
            reconcile(&captured(5000), vec![alloc(1, 3000), alloc(2, 2000)]).unwrap();
        assert_eq!(amount, MoneyCents::new(5000));
        assert_eq!(allocations, vec![alloc(1, 3000), alloc(2, 2000)]);
    }

    #[test]
    fn residual_within_tolerance_goes_to_largest() {
        let (amount, allocations) =
            reconcile(&captured(5001), vec![alloc(1, 2000), alloc(2, 3000)]).unwrap();
        assert_eq!(amount, MoneyCents::new(5001));
        assert_eq!(allocations, vec![alloc(1, 2000), alloc(2, 3001)]);
        assert_eq!(allocation_sum(&allocations).unwrap(), amount);
    }

    #[test]
    fn negative_residual_never_leaves_a_zero_allocation() {
        let (amount, allocations) =
            reconcile(&captured(1), vec![alloc(1, 1), alloc(2, 1)]).unwrap();
        assert_eq!(amount, MoneyCents::new(1));
        assert_eq!(allocations, vec![alloc(2, 1)]);
        assert!(allocations.iter().all(|a| a.amount.is_positive()));
        assert_eq!(allocation_sum(&allocations).unwrap(), amount);
    }

    #[test]
    fn mismatch_beyond_tolerance_is_security_failure() {
        let err = reconcile(&captured(5000), vec![alloc(1, 4998)]).unwrap_err();
        assert_eq!(
            err,
            EngineError::SecurityMismatch {
                captured: MoneyCents::new(5000),
                declared: MoneyCents::new(4998),
            }
        );
    }

    #[test]
    fn repeated_pools_are_summed() {
        let totals = per_pool_totals(&[alloc(2, 100), alloc(1, 50), alloc(2, 25)]);
        assert_eq!(
            totals.into_iter().collect::<Vec<_>>(),
            vec![(1, MoneyCents::new(50)), (2, MoneyCents::new(125))]
        );
    }

    #[test]
    fn display_prefers_user_then_payer() {
        let payer = PayerName {
            given_name: Some("Grace".to_string()),
            surname: Some("Hopper".to_string()),
        };
        assert_eq!(
            resolve_display(Some(("Ada".into(), "Lovelace".into())), Some(&payer)),
            (Some("Ada".to_string()), Some("L".to_string()))
        );
        assert_eq!(
            resolve_display(None, Some(&payer)),
            (Some("Grace".to_string()), Some("H".to_string()))
        );
        assert_eq!(
            resolve_display(Some((String::new(), String::new())), Some(&payer)),
            (Some("Grace".to_string()), Some("H".to_string()))
        );
        assert_eq!(resolve_display(None, None), (None, None));
    }
}
