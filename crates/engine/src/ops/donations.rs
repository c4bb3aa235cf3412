use sea_orm::TransactionTrait;

use crate::{
    CaptureDonationCmd, EngineError, ExternalDonationCmd, LedgerEntry, ResultEngine,
    TransactionKind, verify_capture,
};

use super::{
    Engine,
    access::{find_user, require_moderator},
    normalize_optional_text,
    recorder::{DisplayName, EntrySource, RecordCmd, ZeroAllocations, normalize_allocations, record},
    require_name, with_tx,
};

impl Engine {
    /// Capture a processor order and record it as a deposit.
    ///
    /// The request is validated before the processor is called. The capture
    /// itself happens outside the database transaction; if recording fails
    /// afterwards the capture id is logged for manual reconciliation.
    pub async fn capture_donation(&self, cmd: CaptureDonationCmd) -> ResultEngine<LedgerEntry> {
        let order_id = cmd.order_id.trim();
        if order_id.is_empty() {
            return Err(EngineError::Validation("order id is required".to_string()));
        }
        normalize_allocations(&cmd.allocations, ZeroAllocations::Drop)?;

        let gateway = self.payments()?;
        let response = gateway.capture(order_id).await.map_err(|err| {
            tracing::error!(order_id, error = %err, "payment capture failed");
            EngineError::Upstream("failed to capture payment".to_string())
        })?;
        let capture = verify_capture(response, &self.currency).inspect_err(|err| {
            tracing::error!(order_id, error = %err, "payment capture rejected");
        })?;
        let capture_id = capture.capture_id.clone();

        let donor_name = match cmd.donor.as_deref() {
            Some(subject_id) if !cmd.anonymous => self.donor_name(subject_id).await,
            _ => None,
        };

        let record_cmd = RecordCmd {
            kind: TransactionKind::Deposit,
            source: EntrySource::Captured(capture),
            attributed_user: cmd.donor,
            anonymous: cmd.anonymous,
            display: DisplayName::Resolve(donor_name),
            description: normalize_optional_text(cmd.description.as_deref()),
            allocations: cmd.allocations,
        };

        match self.record_in_tx(record_cmd).await {
            Ok(entry) => Ok(entry),
            Err(EngineError::SecurityMismatch { captured, declared }) => {
                tracing::error!(
                    target: "security",
                    order_id,
                    capture_id = %capture_id,
                    captured = %captured,
                    declared = %declared,
                    "CRITICAL: captured amount does not match declared allocations"
                );
                Err(EngineError::SecurityMismatch { captured, declared })
            }
            Err(err) => {
                tracing::error!(
                    order_id,
                    capture_id = %capture_id,
                    error = %err,
                    "payment captured but not recorded"
                );
                Err(err)
            }
        }
    }

    /// Record a donation received outside the payment processor.
    pub async fn external_donation(&self, cmd: ExternalDonationCmd) -> ResultEngine<LedgerEntry> {
        with_tx!(self, |db_tx| {
            let moderator = require_moderator(&db_tx, &cmd.moderator).await?;
            require_name(&cmd.description, "description is required")?;
            let entry = record(
                &db_tx,
                RecordCmd {
                    kind: TransactionKind::Deposit,
                    source: EntrySource::Moderator,
                    attributed_user: Some(moderator.subject_id),
                    anonymous: false,
                    display: DisplayName::Hidden,
                    description: Some(cmd.description),
                    allocations: cmd.allocations,
                },
            )
            .await?;
            Ok::<_, EngineError>(entry)
        })
    }

    /// Name of a logged-in donor, read before the recording transaction.
    ///
    /// The payment is already captured at this point, so a failed lookup
    /// only costs the name: the payer record is used instead.
    async fn donor_name(&self, subject_id: &str) -> Option<(String, String)> {
        match find_user(&self.database, subject_id).await {
            Ok(user) => user.map(|u| (u.first_name, u.last_name)),
            Err(err) => {
                tracing::warn!(subject_id, error = %err, "donor lookup failed, using payer name");
                None
            }
        }
    }

    async fn record_in_tx(&self, cmd: RecordCmd) -> ResultEngine<LedgerEntry> {
        with_tx!(self, |db_tx| {
            let entry = record(&db_tx, cmd).await?;
            Ok::<_, EngineError>(entry)
        })
    }
}
