use api_types::ledger::{Allocation, LedgerEntry, LedgerResponse, TransactionType};
use axum::{Json, extract::State};
use engine::TransactionKind;

use crate::{ServerError, server::ServerState};

fn to_view(entry: engine::LedgerEntry) -> LedgerEntry {
    let transaction_type = match entry.kind {
        TransactionKind::Deposit => TransactionType::Deposit,
        TransactionKind::Withdrawal => TransactionType::Withdrawal,
    };
    LedgerEntry {
        id: entry.id,
        transaction_id: entry.transaction_id,
        amount_minor: entry.amount.cents(),
        timestamp: entry.created_at,
        transaction_type,
        first_name: entry.first_name,
        last_initial: entry.last_initial,
        description: entry.description,
        anonymous: entry.anonymous,
        allocations: entry
            .allocations
            .into_iter()
            .map(|a| Allocation {
                id: a.id,
                ledger_id: a.ledger_id,
                funding_pool_id: a.funding_pool_id,
                amount_minor: a.amount.cents(),
            })
            .collect(),
    }
}

/// Full public ledger, newest first, with running totals.
pub async fn list(State(state): State<ServerState>) -> Result<Json<LedgerResponse>, ServerError> {
    let ledger = state.engine.ledger().await?;
    Ok(Json(LedgerResponse {
        transactions: ledger.entries.into_iter().map(to_view).collect(),
        total_donations_minor: ledger.totals.total_donations.cents(),
        total_withdrawals_minor: ledger.totals.total_withdrawals.cents(),
    }))
}
