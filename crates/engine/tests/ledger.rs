use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    AllocationRequest, CaptureDonationCmd, CaptureError, CaptureResponse, Engine, EngineError,
    ExternalDonationCmd, IdentityError, IdentityVerifier, MoneyCents, PaymentGateway, PoolCmd,
    TransactionKind, VerifiedIdentity, WithdrawalCmd,
};
use migration::MigratorTrait;

const MODERATOR: &str = "mod-1";
const DONOR: &str = "donor-1";

#[derive(Default)]
struct FakeGateway {
    orders: Mutex<HashMap<String, CaptureResponse>>,
    calls: AtomicUsize,
}

impl FakeGateway {
    fn complete(&self, order_id: &str, amount: &str) {
        self.insert(order_id, "COMPLETED", amount);
    }

    fn insert(&self, order_id: &str, status: &str, amount: &str) {
        self.orders.lock().unwrap().insert(
            order_id.to_string(),
            CaptureResponse {
                status: status.to_string(),
                captured_amount: amount.to_string(),
                currency: "USD".to_string(),
                capture_id: format!("CAP-{order_id}"),
                payer_given_name: Some("Grace".to_string()),
                payer_surname: Some("Hopper".to_string()),
            },
        );
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn capture(&self, order_id: &str) -> Result<CaptureResponse, CaptureError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.orders
            .lock()
            .unwrap()
            .get(order_id)
            .cloned()
            .ok_or_else(|| CaptureError::CaptureFailed(format!("unknown order {order_id}")))
    }
}

/// Accepts credentials shaped `subject:email:given:family`.
struct FakeIdentity;

#[async_trait]
impl IdentityVerifier for FakeIdentity {
    async fn verify(&self, credential: &str) -> Result<VerifiedIdentity, IdentityError> {
        let parts: Vec<&str> = credential.split(':').collect();
        match parts.as_slice() {
            [subject, email, given, family] => Ok(VerifiedIdentity {
                subject_id: subject.to_string(),
                email: email.to_string(),
                given_name: given.to_string(),
                family_name: family.to_string(),
            }),
            _ => Err(IdentityError::InvalidCredential),
        }
    }
}

async fn seed_user(db: &DatabaseConnection, subject: &str, first: &str, last: &str, moderator: bool) {
    let backend = db.get_database_backend();
    db.execute(Statement::from_sql_and_values(
        backend,
        "INSERT INTO users (subject_id, email, first_name, last_name, is_moderator) VALUES (?, ?, ?, ?, ?)",
        vec![
            subject.into(),
            format!("{subject}@example.org").into(),
            first.into(),
            last.into(),
            moderator.into(),
        ],
    ))
    .await
    .unwrap();
}

async fn engine_with_db() -> (Engine, DatabaseConnection, Arc<FakeGateway>) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    seed_user(&db, MODERATOR, "Mona", "Moderator", true).await;
    seed_user(&db, DONOR, "Ada", "Lovelace", false).await;

    let gateway = Arc::new(FakeGateway::default());
    let engine = Engine::builder()
        .database(db.clone())
        .payments(gateway.clone())
        .identity(Arc::new(FakeIdentity))
        .currency("USD")
        .build()
        .await
        .unwrap();
    (engine, db, gateway)
}

async fn new_pool(engine: &Engine, name: &str) -> i32 {
    engine
        .create_pool(PoolCmd::new(MODERATOR, name, 100_000))
        .await
        .unwrap()
        .id
}

async fn balance(engine: &Engine, pool_id: i32) -> i64 {
    engine.funding_pool(pool_id).await.unwrap().current_amount.cents()
}

async fn deposit(engine: &Engine, gateway: &FakeGateway, order: &str, pool_id: i32, cents: i64) {
    gateway.complete(order, &MoneyCents::new(cents).to_string());
    engine
        .capture_donation(CaptureDonationCmd::new(
            order,
            vec![AllocationRequest::new(pool_id, cents)],
        ))
        .await
        .unwrap();
}

async fn row_count(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get("", "n").unwrap()
}

#[tokio::test]
async fn created_pool_reads_back_verbatim_with_zero_balance() {
    let (engine, _db, _gateway) = engine_with_db().await;

    let created = engine
        .create_pool(PoolCmd::new(MODERATOR, "New roof", 250_000).description("Before winter"))
        .await
        .unwrap();
    assert_eq!(created.current_amount, MoneyCents::ZERO);

    let fetched = engine.funding_pool(created.id).await.unwrap();
    assert_eq!(fetched, created);
    assert_eq!(fetched.name, "New roof");
    assert_eq!(fetched.description.as_deref(), Some("Before winter"));
    assert_eq!(fetched.goal_amount, MoneyCents::new(250_000));
}

#[tokio::test]
async fn pool_mutations_require_a_moderator() {
    let (engine, _db, _gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "Books").await;

    let err = engine
        .create_pool(PoolCmd::new(DONOR, "Sneaky", 1000))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Forbidden("user is not a moderator".to_string()));

    let err = engine
        .update_pool(pool_id, PoolCmd::new("stranger", "Sneaky", 1000))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Unauthenticated);

    let err = engine.delete_pool(DONOR, pool_id).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let pools = engine.funding_pools().await.unwrap();
    assert_eq!(pools.len(), 1);
    assert_eq!(pools[0].name, "Books");
}

#[tokio::test]
async fn pool_validation_rejects_blank_name_and_non_positive_goal() {
    let (engine, _db, _gateway) = engine_with_db().await;

    let err = engine
        .create_pool(PoolCmd::new(MODERATOR, "   ", 1000))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("pool name is required".to_string()));

    let err = engine
        .create_pool(PoolCmd::new(MODERATOR, "Zero", 0))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Validation("goal amount must be a positive number".to_string())
    );
    assert!(engine.funding_pools().await.unwrap().is_empty());
}

#[tokio::test]
async fn update_pool_keeps_derived_balance() {
    let (engine, _db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "Garden").await;
    deposit(&engine, &gateway, "O-1", pool_id, 1500).await;

    let updated = engine
        .update_pool(pool_id, PoolCmd::new(MODERATOR, "Community garden", 9000))
        .await
        .unwrap();
    assert_eq!(updated.name, "Community garden");
    assert_eq!(updated.description, None);
    assert_eq!(updated.goal_amount, MoneyCents::new(9000));
    assert_eq!(updated.current_amount, MoneyCents::new(1500));

    let err = engine
        .update_pool(999, PoolCmd::new(MODERATOR, "Ghost", 9000))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn capture_splits_one_ledger_entry_across_pools() {
    let (engine, db, gateway) = engine_with_db().await;
    let first = new_pool(&engine, "First").await;
    let second = new_pool(&engine, "Second").await;
    gateway.complete("ORDER-1", "50.00");

    let entry = engine
        .capture_donation(CaptureDonationCmd::new(
            "ORDER-1",
            vec![
                AllocationRequest::new(first, 3000),
                AllocationRequest::new(second, 2000),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(entry.kind, TransactionKind::Deposit);
    assert_eq!(entry.amount, MoneyCents::new(5000));
    assert_eq!(entry.transaction_id.as_deref(), Some("CAP-ORDER-1"));
    assert_eq!(entry.allocations.len(), 2);
    let allocated: MoneyCents = entry.allocations.iter().map(|a| a.amount).sum();
    assert_eq!(allocated, entry.amount);

    assert_eq!(balance(&engine, first).await, 3000);
    assert_eq!(balance(&engine, second).await, 2000);
    assert_eq!(row_count(&db, "ledger").await, 1);
    assert_eq!(row_count(&db, "allocation").await, 2);

    let totals = engine.ledger_totals().await.unwrap();
    assert_eq!(totals.total_donations, MoneyCents::new(5000));
    assert_eq!(totals.total_withdrawals, MoneyCents::ZERO);
}

#[tokio::test]
async fn capture_mismatch_writes_nothing() {
    let (engine, db, gateway) = engine_with_db().await;
    let first = new_pool(&engine, "First").await;
    let second = new_pool(&engine, "Second").await;
    gateway.complete("ORDER-2", "50.00");

    let err = engine
        .capture_donation(CaptureDonationCmd::new(
            "ORDER-2",
            vec![
                AllocationRequest::new(first, 3000),
                AllocationRequest::new(second, 1000),
            ],
        ))
        .await
        .unwrap_err();

    assert_eq!(
        err,
        EngineError::SecurityMismatch {
            captured: MoneyCents::new(5000),
            declared: MoneyCents::new(4000),
        }
    );
    assert_eq!(row_count(&db, "ledger").await, 0);
    assert_eq!(row_count(&db, "allocation").await, 0);
    assert_eq!(balance(&engine, first).await, 0);
}

#[tokio::test]
async fn capture_drops_zero_allocations_and_absorbs_cent_residual() {
    let (engine, _db, gateway) = engine_with_db().await;
    let first = new_pool(&engine, "First").await;
    let second = new_pool(&engine, "Second").await;
    let third = new_pool(&engine, "Third").await;
    gateway.complete("ORDER-3", "50.01");

    let entry = engine
        .capture_donation(CaptureDonationCmd::new(
            "ORDER-3",
            vec![
                AllocationRequest::new(first, 3000),
                AllocationRequest::new(second, 2000),
                AllocationRequest::new(third, 0),
            ],
        ))
        .await
        .unwrap();

    assert_eq!(entry.amount, MoneyCents::new(5001));
    assert_eq!(entry.allocations.len(), 2);
    assert_eq!(balance(&engine, first).await, 3001);
    assert_eq!(balance(&engine, second).await, 2000);
    assert_eq!(balance(&engine, third).await, 0);
}

#[tokio::test]
async fn malformed_capture_never_reaches_the_processor() {
    let (engine, _db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    gateway.complete("ORDER-4", "10.00");

    let err = engine
        .capture_donation(CaptureDonationCmd::new(
            "ORDER-4",
            vec![
                AllocationRequest::new(pool_id, 2000),
                AllocationRequest::new(pool_id, -1000),
            ],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .capture_donation(CaptureDonationCmd::new("ORDER-4", vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .capture_donation(CaptureDonationCmd::new(
            " ",
            vec![AllocationRequest::new(pool_id, 1000)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert_eq!(gateway.calls(), 0);
}

#[tokio::test]
async fn incomplete_or_failed_capture_is_upstream_failure() {
    let (engine, db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    gateway.insert("ORDER-5", "PENDING", "10.00");

    let err = engine
        .capture_donation(CaptureDonationCmd::new(
            "ORDER-5",
            vec![AllocationRequest::new(pool_id, 1000)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Upstream(_)));

    let err = engine
        .capture_donation(CaptureDonationCmd::new(
            "UNKNOWN",
            vec![AllocationRequest::new(pool_id, 1000)],
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::Upstream("failed to capture payment".to_string())
    );
    assert_eq!(row_count(&db, "ledger").await, 0);
}

#[tokio::test]
async fn same_capture_cannot_be_recorded_twice() {
    let (engine, db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    deposit(&engine, &gateway, "ORDER-6", pool_id, 1000).await;

    let err = engine
        .capture_donation(CaptureDonationCmd::new(
            "ORDER-6",
            vec![AllocationRequest::new(pool_id, 1000)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Database(_)));
    assert_eq!(row_count(&db, "ledger").await, 1);
    assert_eq!(balance(&engine, pool_id).await, 1000);
}

#[tokio::test]
async fn capture_attribution_prefers_user_then_payer() {
    let (engine, _db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    for order in ["A", "B", "C"] {
        gateway.complete(order, "5.00");
    }
    let alloc = || vec![AllocationRequest::new(pool_id, 500)];

    let named = engine
        .capture_donation(CaptureDonationCmd::new("A", alloc()).donor(DONOR))
        .await
        .unwrap();
    assert_eq!(named.first_name.as_deref(), Some("Ada"));
    assert_eq!(named.last_initial.as_deref(), Some("L"));
    assert_eq!(named.user_subject_id.as_deref(), Some(DONOR));

    let hidden = engine
        .capture_donation(
            CaptureDonationCmd::new("B", alloc())
                .donor(DONOR)
                .anonymous(true),
        )
        .await
        .unwrap();
    assert!(hidden.anonymous);
    assert_eq!(hidden.first_name, None);
    assert_eq!(hidden.last_initial, None);
    assert_eq!(hidden.user_subject_id.as_deref(), Some(DONOR));

    let guest = engine
        .capture_donation(CaptureDonationCmd::new("C", alloc()).description("Keep it up"))
        .await
        .unwrap();
    assert_eq!(guest.first_name.as_deref(), Some("Grace"));
    assert_eq!(guest.last_initial.as_deref(), Some("H"));
    assert_eq!(guest.user_subject_id, None);
    assert_eq!(guest.description.as_deref(), Some("Keep it up"));
}

#[tokio::test]
async fn donor_lookup_failure_falls_back_to_payer_name() {
    let (engine, db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    gateway.complete("ORDER-LOOKUP", "5.00");

    let backend = db.get_database_backend();
    db.execute(Statement::from_string(
        backend,
        "ALTER TABLE users RENAME TO users_archive",
    ))
    .await
    .unwrap();

    let entry = engine
        .capture_donation(
            CaptureDonationCmd::new("ORDER-LOOKUP", vec![AllocationRequest::new(pool_id, 500)])
                .donor(DONOR),
        )
        .await
        .unwrap();
    assert_eq!(entry.first_name.as_deref(), Some("Grace"));
    assert_eq!(entry.last_initial.as_deref(), Some("H"));
    assert_eq!(entry.user_subject_id.as_deref(), Some(DONOR));
    assert_eq!(row_count(&db, "ledger").await, 1);
}

#[tokio::test]
async fn residual_never_stores_a_zero_allocation() {
    let (engine, db, gateway) = engine_with_db().await;
    let first = new_pool(&engine, "First").await;
    let second = new_pool(&engine, "Second").await;
    gateway.complete("ORDER-CENT", "0.01");

    let entry = engine
        .capture_donation(CaptureDonationCmd::new(
            "ORDER-CENT",
            vec![
                AllocationRequest::new(first, 1),
                AllocationRequest::new(second, 1),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(entry.amount, MoneyCents::new(1));
    assert_eq!(entry.allocations.len(), 1);
    assert_eq!(entry.allocations[0].funding_pool_id, second);
    assert!(entry.allocations.iter().all(|a| a.amount.is_positive()));
    assert_eq!(row_count(&db, "allocation").await, 1);
    assert_eq!(balance(&engine, first).await, 0);
    assert_eq!(balance(&engine, second).await, 1);
}

#[tokio::test]
async fn withdrawal_cannot_overdraw_but_may_empty_a_pool() {
    let (engine, db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    deposit(&engine, &gateway, "ORDER-7", pool_id, 3000).await;

    let err = engine
        .withdraw(WithdrawalCmd::new(
            MODERATOR,
            "Too much",
            vec![AllocationRequest::new(pool_id, 4000)],
        ))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::InsufficientFunds(format!(
            "withdrawal amount for pool {pool_id} exceeds its balance of 30.00"
        ))
    );
    assert_eq!(balance(&engine, pool_id).await, 3000);
    assert_eq!(row_count(&db, "ledger").await, 1);

    let entry = engine
        .withdraw(WithdrawalCmd::new(
            MODERATOR,
            "Bought supplies",
            vec![AllocationRequest::new(pool_id, 3000)],
        ))
        .await
        .unwrap();
    assert_eq!(entry.kind, TransactionKind::Withdrawal);
    assert_eq!(entry.first_name.as_deref(), Some("Mona"));
    assert_eq!(entry.last_initial.as_deref(), Some("M"));
    assert!(!entry.anonymous);
    assert_eq!(balance(&engine, pool_id).await, 0);

    let totals = engine.ledger_totals().await.unwrap();
    assert_eq!(totals.total_donations, MoneyCents::new(3000));
    assert_eq!(totals.total_withdrawals, MoneyCents::new(3000));
}

#[tokio::test]
async fn withdrawal_sums_repeated_pools_before_checking() {
    let (engine, _db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    deposit(&engine, &gateway, "ORDER-8", pool_id, 3000).await;

    let err = engine
        .withdraw(WithdrawalCmd::new(
            MODERATOR,
            "Split",
            vec![
                AllocationRequest::new(pool_id, 2000),
                AllocationRequest::new(pool_id, 2000),
            ],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(balance(&engine, pool_id).await, 3000);
}

#[tokio::test]
async fn withdrawal_input_and_role_checks() {
    let (engine, _db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    deposit(&engine, &gateway, "ORDER-9", pool_id, 3000).await;
    let alloc = || vec![AllocationRequest::new(pool_id, 100)];

    let err = engine
        .withdraw(WithdrawalCmd::new(DONOR, "Mine now", alloc()))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine
        .withdraw(WithdrawalCmd::new(MODERATOR, " ", alloc()))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Validation("description is required".to_string()));

    let err = engine
        .withdraw(WithdrawalCmd::new(
            MODERATOR,
            "Zero",
            vec![AllocationRequest::new(pool_id, 0)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .withdraw(WithdrawalCmd::new(
            MODERATOR,
            "Nowhere",
            vec![AllocationRequest::new(404, 100)],
        ))
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound("funding pool not found".to_string()));

    assert_eq!(balance(&engine, pool_id).await, 3000);
}

/// Runs on the single-connection SQLite harness, so the two withdrawals are
/// serialized by the database write lock and `FOR UPDATE` is not emitted.
/// This covers the per-pool overdraft check under overlapping requests; the
/// row-lock path itself is only exercised on Postgres.
#[tokio::test]
async fn overlapping_withdrawals_cannot_both_overdraw() {
    let (engine, _db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    deposit(&engine, &gateway, "ORDER-10", pool_id, 3000).await;

    let (a, b) = tokio::join!(
        engine.withdraw(WithdrawalCmd::new(
            MODERATOR,
            "A",
            vec![AllocationRequest::new(pool_id, 2000)],
        )),
        engine.withdraw(WithdrawalCmd::new(
            MODERATOR,
            "B",
            vec![AllocationRequest::new(pool_id, 2000)],
        )),
    );

    assert_eq!([a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(), 1);
    let failure = a.err().or(b.err()).unwrap();
    assert!(matches!(failure, EngineError::InsufficientFunds(_)));
    assert_eq!(balance(&engine, pool_id).await, 1000);
}

#[tokio::test]
async fn delete_is_blocked_once_a_pool_has_allocations() {
    let (engine, db, gateway) = engine_with_db().await;
    let empty = new_pool(&engine, "Empty").await;
    let funded = new_pool(&engine, "Funded").await;
    deposit(&engine, &gateway, "ORDER-11", funded, 500).await;

    engine.delete_pool(MODERATOR, empty).await.unwrap();
    assert!(matches!(
        engine.funding_pool(empty).await,
        Err(EngineError::KeyNotFound(_))
    ));

    let err = engine.delete_pool(MODERATOR, funded).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::Conflict("cannot delete funding pool with existing donations".to_string())
    );
    assert_eq!(row_count(&db, "funding_pool").await, 1);
    assert_eq!(balance(&engine, funded).await, 500);

    let err = engine.delete_pool(MODERATOR, empty).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn external_donation_is_attributed_but_unnamed() {
    let (engine, _db, _gateway) = engine_with_db().await;
    let first = new_pool(&engine, "First").await;
    let second = new_pool(&engine, "Second").await;

    let entry = engine
        .external_donation(ExternalDonationCmd::new(
            MODERATOR,
            "Cash jar",
            vec![
                AllocationRequest::new(first, 1200),
                AllocationRequest::new(second, 800),
            ],
        ))
        .await
        .unwrap();
    assert_eq!(entry.amount, MoneyCents::new(2000));
    assert_eq!(entry.transaction_id, None);
    assert_eq!(entry.user_subject_id.as_deref(), Some(MODERATOR));
    assert_eq!(entry.first_name, None);
    assert!(!entry.anonymous);
    assert_eq!(balance(&engine, first).await, 1200);

    let err = engine
        .external_donation(ExternalDonationCmd::new(
            MODERATOR,
            "Zero",
            vec![AllocationRequest::new(first, 0)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine
        .external_donation(ExternalDonationCmd::new(
            DONOR,
            "Cash jar",
            vec![AllocationRequest::new(first, 100)],
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn ledger_lists_newest_first_with_allocations() {
    let (engine, _db, gateway) = engine_with_db().await;
    let pool_id = new_pool(&engine, "First").await;
    deposit(&engine, &gateway, "ORDER-12", pool_id, 2000).await;
    engine
        .withdraw(WithdrawalCmd::new(
            MODERATOR,
            "Paint",
            vec![AllocationRequest::new(pool_id, 500)],
        ))
        .await
        .unwrap();

    let ledger = engine.ledger().await.unwrap();
    assert_eq!(ledger.entries.len(), 2);
    assert_eq!(ledger.entries[0].kind, TransactionKind::Withdrawal);
    assert_eq!(ledger.entries[1].kind, TransactionKind::Deposit);
    assert!(ledger.entries[0].id > ledger.entries[1].id);
    for entry in &ledger.entries {
        assert_eq!(entry.allocations.len(), 1);
        assert_eq!(entry.allocations[0].ledger_id, entry.id);
        assert_eq!(entry.allocations[0].amount, entry.amount);
    }
    assert_eq!(ledger.totals.total_donations, MoneyCents::new(2000));
    assert_eq!(ledger.totals.total_withdrawals, MoneyCents::new(500));
}

#[tokio::test]
async fn balances_are_independent_per_pool() {
    let (engine, _db, gateway) = engine_with_db().await;
    let first = new_pool(&engine, "First").await;
    let second = new_pool(&engine, "Second").await;
    deposit(&engine, &gateway, "ORDER-13", first, 1000).await;
    deposit(&engine, &gateway, "ORDER-14", second, 700).await;
    engine
        .withdraw(WithdrawalCmd::new(
            MODERATOR,
            "Tools",
            vec![AllocationRequest::new(second, 200)],
        ))
        .await
        .unwrap();

    let pools = engine.funding_pools().await.unwrap();
    let amounts: Vec<(i32, i64)> = pools
        .iter()
        .map(|p| (p.id, p.current_amount.cents()))
        .collect();
    assert_eq!(amounts, vec![(first, 1000), (second, 500)]);
}

#[tokio::test]
async fn login_upsert_never_touches_the_moderator_flag() {
    let (engine, _db, _gateway) = engine_with_db().await;

    let user = engine
        .login(&format!("{MODERATOR}:new@example.org:Mona:Lisa"))
        .await
        .unwrap();
    assert!(user.is_moderator);
    assert_eq!(user.email, "new@example.org");
    assert_eq!(user.last_name, "Lisa");

    let fresh = engine.login("sub-9:nine@example.org:Nine:Nueve").await.unwrap();
    assert!(!fresh.is_moderator);
    assert_eq!(engine.authenticate("sub-9").await.unwrap(), fresh);

    let err = engine.login("garbage").await.unwrap_err();
    assert_eq!(err, EngineError::Unauthenticated);
}

#[tokio::test]
async fn moderator_flag_takes_effect_immediately() {
    let (engine, _db, _gateway) = engine_with_db().await;

    assert!(engine.authorize_moderator(DONOR).await.is_err());
    engine.set_moderator(DONOR, true).await.unwrap();
    assert!(engine.authorize_moderator(DONOR).await.is_ok());
    engine.set_moderator(DONOR, false).await.unwrap();
    assert!(matches!(
        engine.authorize_moderator(DONOR).await,
        Err(EngineError::Forbidden(_))
    ));

    let users = engine.users().await.unwrap();
    assert_eq!(users.len(), 2);
    assert!(matches!(
        engine.set_moderator("nobody", true).await,
        Err(EngineError::KeyNotFound(_))
    ));
}

#[tokio::test]
async fn site_instance_must_be_seeded() {
    let (engine, _db, _gateway) = engine_with_db().await;

    assert!(matches!(
        engine.site_instance().await,
        Err(EngineError::Config(_))
    ));

    engine
        .set_site_instance("Pool Party", Some("Chip in"))
        .await
        .unwrap();
    let site = engine
        .set_site_instance("Pool Party 2", None)
        .await
        .unwrap();
    assert_eq!(site.site_title, "Pool Party 2");
    assert_eq!(site.site_headline, None);
    assert_eq!(engine.site_instance().await.unwrap(), site);
}
