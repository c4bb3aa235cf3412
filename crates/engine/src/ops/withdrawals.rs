use sea_orm::TransactionTrait;

use crate::{EngineError, LedgerEntry, ResultEngine, TransactionKind, WithdrawalCmd};

use super::{
    Engine,
    access::require_moderator,
    recorder::{DisplayName, EntrySource, RecordCmd, record},
    require_name, with_tx,
};

impl Engine {
    /// Take money out of one or more pools.
    ///
    /// The targeted pools are locked before their balances are read, so two
    /// concurrent withdrawals cannot both pass the overdraft check. The entry
    /// shows the issuing moderator's name.
    pub async fn withdraw(&self, cmd: WithdrawalCmd) -> ResultEngine<LedgerEntry> {
        with_tx!(self, |db_tx| {
            let moderator = require_moderator(&db_tx, &cmd.moderator).await?;
            require_name(&cmd.description, "description is required")?;
            let display = DisplayName::Resolve(Some((moderator.first_name, moderator.last_name)));
            let entry = record(
                &db_tx,
                RecordCmd {
                    kind: TransactionKind::Withdrawal,
                    source: EntrySource::Moderator,
                    attributed_user: Some(moderator.subject_id),
                    anonymous: false,
                    display,
                    description: Some(cmd.description),
                    allocations: cmd.allocations,
                },
            )
            .await?;
            Ok::<_, EngineError>(entry)
        })
    }
}
