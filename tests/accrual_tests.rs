//! Billing accrual runs against the in-memory store

mod common;

use bookkeep_server::{
    config::OverdueRule,
    models::{LoanRecord, LoanStatus, ReturnOutcome},
    services::accrual::AccrualSummary,
    AppError, LendingRejection,
};
use chrono::Duration;
use common::{days_ago, now, Library};
use rust_decimal_macros::dec;

async fn seeded(rule: OverdueRule) -> Library {
    let lib = Library::with_rule(rule);
    lib.category(1, 5, dec!(10), dec!(5)).await;
    lib.book(10, 1, 3, None).await;
    lib.user(100, dec!(100)).await;
    lib
}

#[tokio::test]
async fn charges_rent_and_flags_loans_taken_before_now() {
    let lib = seeded(OverdueRule::TakenBeforeNow).await;
    lib.loan(500, 10, 100, days_ago(1), 30, LoanStatus::Taken, dec!(0)).await;

    let summary = lib.services.accrual.run_accrual_at(now()).await.unwrap();

    assert_eq!(
        summary,
        AccrualSummary {
            processed: 1,
            charged: 1,
            marked_overdue: 1,
            ..Default::default()
        }
    );
    let record = lib.record(500).await.unwrap();
    assert_eq!(record.bill, dec!(10));
    assert_eq!(record.status, i16::from(LoanStatus::Overdue));
    assert_eq!(lib.balance(100).await, dec!(90));
}

#[tokio::test]
async fn past_valid_days_rule_only_flags_expired_loans() {
    let lib = seeded(OverdueRule::PastValidDays).await;
    lib.loan(500, 10, 100, days_ago(2), 30, LoanStatus::Taken, dec!(0)).await;
    lib.loan(501, 10, 100, days_ago(40), 30, LoanStatus::Taken, dec!(0)).await;

    let summary = lib.services.accrual.run_accrual_at(now()).await.unwrap();

    assert_eq!(summary.charged, 2);
    assert_eq!(summary.marked_overdue, 1);
    assert_eq!(lib.record(500).await.unwrap().status, i16::from(LoanStatus::Taken));
    assert_eq!(lib.record(501).await.unwrap().status, i16::from(LoanStatus::Overdue));
    assert_eq!(lib.balance(100).await, dec!(80));
}

#[tokio::test]
async fn resolved_loans_are_not_billed() {
    let lib = seeded(OverdueRule::TakenBeforeNow).await;
    lib.loan(500, 10, 100, days_ago(9), 30, LoanStatus::Received, dec!(10)).await;
    lib.loan(501, 10, 100, days_ago(9), 5, LoanStatus::OverdueDelivered, dec!(15)).await;
    lib.loan(502, 10, 100, days_ago(9), -1, LoanStatus::Sold, dec!(1)).await;

    let summary = lib.services.accrual.run_accrual_at(now()).await.unwrap();

    assert_eq!(summary, AccrualSummary::default());
    assert_eq!(lib.record(500).await.unwrap().bill, dec!(10));
    assert_eq!(lib.record(501).await.unwrap().bill, dec!(15));
    assert_eq!(lib.record(502).await.unwrap().bill, dec!(1));
    assert_eq!(lib.balance(100).await, dec!(100));
}

#[tokio::test]
async fn overdue_loans_keep_accruing() {
    let lib = seeded(OverdueRule::TakenBeforeNow).await;
    lib.loan(500, 10, 100, days_ago(1), 30, LoanStatus::Taken, dec!(0)).await;

    lib.services.accrual.run_accrual_at(now()).await.unwrap();
    let second = lib
        .services
        .accrual
        .run_accrual_at(now() + Duration::days(1))
        .await
        .unwrap();

    assert_eq!(second.charged, 1);
    assert_eq!(second.marked_overdue, 0);
    let record = lib.record(500).await.unwrap();
    assert_eq!(record.bill, dec!(20));
    assert_eq!(record.status, i16::from(LoanStatus::Overdue));
    assert_eq!(lib.balance(100).await, dec!(80));
}

#[tokio::test]
async fn loans_with_missing_book_or_user_are_discarded() {
    let lib = seeded(OverdueRule::TakenBeforeNow).await;
    lib.loan(500, 99, 100, days_ago(1), 30, LoanStatus::Taken, dec!(0)).await;
    lib.loan(501, 10, 404, days_ago(1), 30, LoanStatus::Taken, dec!(0)).await;
    lib.loan(502, 10, 100, days_ago(1), 30, LoanStatus::Taken, dec!(0)).await;

    let summary = lib.services.accrual.run_accrual_at(now()).await.unwrap();

    assert_eq!(summary.processed, 3);
    assert_eq!(summary.discarded, 2);
    assert_eq!(summary.charged, 1);
    assert!(lib.record(500).await.is_none());
    assert!(lib.record(501).await.is_none());
    assert_eq!(lib.record(502).await.unwrap().bill, dec!(10));
    // Copies are never put back for a discarded loan
    assert_eq!(lib.amount(10).await, 3);
}

#[tokio::test]
async fn unreadable_records_fail_without_stopping_the_run() {
    let lib = seeded(OverdueRule::TakenBeforeNow).await;
    lib.store
        .insert_loan_record(LoanRecord {
            id: 500,
            book_id: 10,
            user_id: 100,
            taken_date: "yesterday-ish".to_string(),
            returning_date: None,
            valid_borrowed_days: 30,
            bill: dec!(0),
            status: LoanStatus::Taken.into(),
        })
        .await;
    lib.loan(501, 10, 100, days_ago(1), 30, LoanStatus::Taken, dec!(0)).await;

    let summary = lib.services.accrual.run_accrual_at(now()).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.charged, 1);
    let untouched = lib.record(500).await.unwrap();
    assert_eq!(untouched.bill, dec!(0));
    assert_eq!(untouched.taken_date, "yesterday-ish");
    assert_eq!(lib.balance(100).await, dec!(90));
}

#[tokio::test]
async fn missing_category_is_a_failure_not_a_discard() {
    let lib = seeded(OverdueRule::TakenBeforeNow).await;
    lib.book(20, 7, 1, None).await;
    lib.loan(500, 20, 100, days_ago(1), 30, LoanStatus::Taken, dec!(0)).await;

    let summary = lib.services.accrual.run_accrual_at(now()).await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.discarded, 0);
    assert!(lib.record(500).await.is_some());
}

#[tokio::test]
async fn flagged_loan_locks_user_until_returned() {
    let lib = seeded(OverdueRule::TakenBeforeNow).await;
    lib.book(11, 1, 3, None).await;
    lib.loan(500, 10, 100, days_ago(1), 30, LoanStatus::Taken, dec!(0)).await;

    lib.services.accrual.run_accrual_at(now()).await.unwrap();

    let refused = lib.services.lending.borrow_at(100, 11, now()).await;
    assert!(matches!(
        refused,
        Err(AppError::Rejected(LendingRejection::OutstandingOverdueLock))
    ));

    // Still within its valid days, so the flagged loan comes back received
    let outcome = lib.services.lending.return_loan_at(500, now()).await.unwrap();
    let ReturnOutcome::Delivered { loan, .. } = outcome else {
        panic!("expected a delivery");
    };
    assert_eq!(loan.status, LoanStatus::Received);
    assert_eq!(loan.bill, dec!(10));
    assert_eq!(lib.balance(100).await, dec!(90));

    lib.services.lending.borrow_at(100, 11, now()).await.unwrap();
}

#[tokio::test]
async fn bill_never_decreases_over_a_loan_lifetime() {
    let lib = seeded(OverdueRule::PastValidDays).await;
    lib.loan(500, 10, 100, days_ago(4), 5, LoanStatus::Taken, dec!(0)).await;

    let mut last = dec!(0);
    for day in 0..4 {
        lib.services
            .accrual
            .run_accrual_at(now() + Duration::days(day))
            .await
            .unwrap();
        let bill = lib.record(500).await.unwrap().bill;
        assert!(bill >= last);
        last = bill;
    }
    assert_eq!(last, dec!(40));

    lib.services
        .lending
        .return_loan_at(500, now() + Duration::days(4))
        .await
        .unwrap();
    let record = lib.record(500).await.unwrap();
    assert_eq!(record.bill, dec!(45));
    assert_eq!(record.status, i16::from(LoanStatus::OverdueDelivered));
}
