use chrono::Utc;
use sea_orm::Database;

use ledger::{
    AccountRef, ContributionCmd, Currency, Direction, Ledger, LedgerError, PostingCmd, RefundCmd,
    TransactionKind,
};
use migration::MigratorTrait;
use uuid::Uuid;

async fn ledger_with_db() -> Ledger {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Ledger::builder().database(db).build()
}

#[tokio::test]
async fn contribution_moves_money_between_user_and_goal() {
    let ledger = ledger_with_db().await;

    let tx_id = ledger
        .post_contribution(
            ContributionCmd::new("user-1", "goal-1", 50_000, Currency::Ngn, Utc::now())
                .payment_id(Uuid::new_v4()),
        )
        .await
        .unwrap();

    let user = AccountRef::user("user-1", Currency::Ngn);
    let goal = AccountRef::goal("goal-1", Currency::Ngn);
    assert_eq!(ledger.balance(&user).await.unwrap(), -50_000);
    assert_eq!(ledger.balance(&goal).await.unwrap(), 50_000);

    // Snapshots must agree with the full replay of the entry history.
    assert_eq!(ledger.replayed_balance(&user).await.unwrap(), -50_000);
    assert_eq!(ledger.replayed_balance(&goal).await.unwrap(), 50_000);

    let (tx, entries) = ledger.transaction_with_entries(tx_id).await.unwrap();
    assert_eq!(tx.kind, TransactionKind::Contribution);
    assert_eq!(tx.amount_minor, 50_000);
    assert_eq!(entries.len(), 2);
    let debit_total: i64 = entries
        .iter()
        .filter(|e| e.direction == Direction::Debit)
        .map(|e| e.amount_minor)
        .sum();
    let credit_total: i64 = entries
        .iter()
        .filter(|e| e.direction == Direction::Credit)
        .map(|e| e.amount_minor)
        .sum();
    assert_eq!(debit_total, credit_total);
    assert_eq!(debit_total, 50_000);
}

#[tokio::test]
async fn duplicate_payment_id_posts_exactly_once() {
    let ledger = ledger_with_db().await;
    let payment_id = Uuid::new_v4();

    let cmd = ContributionCmd::new("user-1", "goal-1", 10_000, Currency::Ngn, Utc::now())
        .payment_id(payment_id);
    let first = ledger.post_contribution(cmd.clone()).await.unwrap();
    let second = ledger.post_contribution(cmd).await.unwrap();

    assert_eq!(first, second);
    let goal = AccountRef::goal("goal-1", Currency::Ngn);
    assert_eq!(ledger.balance(&goal).await.unwrap(), 10_000);
    assert_eq!(ledger.entries_for_account(&goal).await.unwrap().len(), 1);
}

#[tokio::test]
async fn refund_restores_balances_and_keeps_system_total() {
    let ledger = ledger_with_db().await;

    let contribution_id = ledger
        .post_contribution(ContributionCmd::new(
            "user-1",
            "goal-1",
            25_000,
            Currency::Ngn,
            Utc::now(),
        ))
        .await
        .unwrap();

    let refund_id = ledger
        .post_refund(RefundCmd::new(contribution_id, Utc::now()).reason("goal cancelled"))
        .await
        .unwrap();

    let user = AccountRef::user("user-1", Currency::Ngn);
    let goal = AccountRef::goal("goal-1", Currency::Ngn);
    assert_eq!(ledger.balance(&user).await.unwrap(), 0);
    assert_eq!(ledger.balance(&goal).await.unwrap(), 0);

    // The original entries are untouched: two transactions, four entries.
    let (_, contribution_entries) = ledger
        .transaction_with_entries(contribution_id)
        .await
        .unwrap();
    assert_eq!(contribution_entries.len(), 2);
    let (refund, refund_entries) = ledger.transaction_with_entries(refund_id).await.unwrap();
    assert_eq!(refund.kind, TransactionKind::Refund);
    assert_eq!(
        refund.metadata.get("refund_of"),
        Some(&contribution_id.to_string())
    );
    assert_eq!(refund_entries.len(), 2);
}

#[tokio::test]
async fn refund_rejects_unknown_and_non_contribution_targets() {
    let ledger = ledger_with_db().await;

    let missing = ledger
        .post_refund(RefundCmd::new(Uuid::new_v4(), Utc::now()))
        .await;
    assert!(matches!(missing, Err(LedgerError::KeyNotFound(_))));

    let contribution_id = ledger
        .post_contribution(ContributionCmd::new(
            "user-1",
            "goal-1",
            5_000,
            Currency::Ngn,
            Utc::now(),
        ))
        .await
        .unwrap();
    let refund_id = ledger
        .post_refund(RefundCmd::new(contribution_id, Utc::now()))
        .await
        .unwrap();

    // A refund cannot itself be refunded.
    let double = ledger
        .post_refund(RefundCmd::new(refund_id, Utc::now()))
        .await;
    assert!(matches!(double, Err(LedgerError::InvalidPosting(_))));
}

#[tokio::test]
async fn snapshots_match_replay_after_many_postings() {
    let ledger = ledger_with_db().await;

    for amount in [1_000, 2_500, 40_000] {
        ledger
            .post_contribution(ContributionCmd::new(
                "user-1",
                "goal-1",
                amount,
                Currency::Ngn,
                Utc::now(),
            ))
            .await
            .unwrap();
    }
    let contribution_id = ledger
        .post_contribution(ContributionCmd::new(
            "user-2",
            "goal-1",
            6_000,
            Currency::Ngn,
            Utc::now(),
        ))
        .await
        .unwrap();
    ledger
        .post_refund(RefundCmd::new(contribution_id, Utc::now()))
        .await
        .unwrap();

    for reference in [
        AccountRef::user("user-1", Currency::Ngn),
        AccountRef::user("user-2", Currency::Ngn),
        AccountRef::goal("goal-1", Currency::Ngn),
    ] {
        let stored = ledger.balance(&reference).await.unwrap();
        let replayed = ledger.replayed_balance(&reference).await.unwrap();
        assert_eq!(stored, replayed, "snapshot drifted for {reference:?}");
        let snapshot = ledger.snapshot(&reference).await.unwrap().unwrap();
        assert_eq!(snapshot.balance_minor, stored);
    }
    assert_eq!(
        ledger
            .balance(&AccountRef::goal("goal-1", Currency::Ngn))
            .await
            .unwrap(),
        43_500
    );
}

#[tokio::test]
async fn posting_rejects_currency_mismatch_and_self_transfer() {
    let ledger = ledger_with_db().await;

    let mismatch = ledger
        .post(PostingCmd::new(
            TransactionKind::Contribution,
            1_000,
            Currency::Ngn,
            AccountRef::user("user-1", Currency::Usd),
            AccountRef::goal("goal-1", Currency::Ngn),
            Utc::now(),
        ))
        .await;
    assert!(matches!(mismatch, Err(LedgerError::CurrencyMismatch(_))));

    let same_account = ledger
        .post(PostingCmd::new(
            TransactionKind::Contribution,
            1_000,
            Currency::Ngn,
            AccountRef::user("user-1", Currency::Ngn),
            AccountRef::user("user-1", Currency::Ngn),
            Utc::now(),
        ))
        .await;
    assert!(matches!(same_account, Err(LedgerError::InvalidPosting(_))));

    let zero = ledger
        .post(PostingCmd::new(
            TransactionKind::Contribution,
            0,
            Currency::Ngn,
            AccountRef::user("user-1", Currency::Ngn),
            AccountRef::goal("goal-1", Currency::Ngn),
            Utc::now(),
        ))
        .await;
    assert!(matches!(zero, Err(LedgerError::InvalidPosting(_))));
}

#[tokio::test]
async fn unposted_account_reports_zero_balance() {
    let ledger = ledger_with_db().await;
    let reference = AccountRef::user("nobody", Currency::Ngn);
    assert_eq!(ledger.balance(&reference).await.unwrap(), 0);
    assert!(ledger.snapshot(&reference).await.unwrap().is_none());
}
