//! The destructive user-retirement workflow and its sweep.
//!
//! Retirement replaces a user with an anonymized record, re-points every
//! transaction that references the original, and only then considers
//! deleting the original. The workflow always moves through the same
//! phases: fetch, create replacement, update transactions, decide. The
//! delete decision is a guard over the per-transaction accounting, never
//! incidental control flow: a mixed partial failure must retain the
//! original, otherwise transactions would reference a user that no
//! longer exists.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{transaction, user::UserRecord};
use crate::services::record_store::{CollectionRef, RecordStore, StoreError};
use shared::dates;

/// Tuning of the retirement workflow.
#[derive(Debug, Clone)]
pub struct RetirementPolicy {
    /// When set, any transaction-update failure retains the original.
    /// The default preserves the historical rule that a total
    /// authorization-class failure still deletes.
    pub strict: bool,
    /// Minimum age of the deletion intent before the sweep acts on it.
    pub min_intent_days: i64,
}

impl Default for RetirementPolicy {
    fn default() -> Self {
        Self {
            strict: false,
            min_intent_days: 30,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetireError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("User record {0} is malformed: {1}")]
    Malformed(i64, String),
}

/// Per-transaction accounting of the update phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateAccounting {
    pub succeeded: usize,
    pub authorization_failures: usize,
    pub other_failures: usize,
}

impl UpdateAccounting {
    pub fn failures(&self) -> usize {
        self.authorization_failures + self.other_failures
    }

    /// Transition guard for the delete phase.
    ///
    /// The original may be deleted when every update succeeded, or when
    /// the only failures were authorization-class with zero successes
    /// (the store rejected the credential wholesale, so nothing was
    /// half-moved). Any mixed outcome retains the original. Strict mode
    /// retains on any failure at all.
    pub fn permits_delete(&self, strict: bool) -> bool {
        if strict {
            return self.failures() == 0;
        }
        self.other_failures == 0 && (self.authorization_failures == 0 || self.succeeded == 0)
    }
}

/// Terminal state of one retirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetireOutcome {
    /// The record already carries the retired naming convention; nothing
    /// was touched.
    AlreadyRetired,
    /// Replacement created, transactions re-pointed, original deleted.
    Deleted {
        replacement_id: i64,
        accounting: UpdateAccounting,
    },
    /// Replacement created but the original was kept, either because the
    /// guard blocked the delete or because the delete call itself failed.
    Retained {
        replacement_id: i64,
        accounting: UpdateAccounting,
    },
}

/// Retires one user.
///
/// Failures before the update phase (fetch, create) are fatal; from the
/// update phase on, failures feed the accounting and the workflow runs
/// to a terminal state.
pub async fn retire_user(
    store: &dyn RecordStore,
    users: &CollectionRef,
    transactions: &CollectionRef,
    user_id: i64,
    policy: &RetirementPolicy,
) -> Result<RetireOutcome, RetireError> {
    let raw = store.fetch_one(users, user_id).await?;
    let original: UserRecord = serde_json::from_value(raw)
        .map_err(|err| RetireError::Malformed(user_id, err.to_string()))?;

    if original.is_retired() {
        info!(user_id, "User already retired, skipping");
        return Ok(RetireOutcome::AlreadyRetired);
    }

    let replacement = store.create(users, &original.anonymized_replacement()).await?;
    let replacement_id = replacement
        .get("id")
        .and_then(Value::as_i64)
        .ok_or_else(|| {
            StoreError::UnexpectedFormat("created replacement carries no id".to_string())
        })?;

    let accounting =
        repoint_transactions(store, transactions, user_id, replacement_id).await?;

    if !accounting.permits_delete(policy.strict) {
        warn!(
            user_id,
            replacement_id,
            succeeded = accounting.succeeded,
            failed = accounting.failures(),
            "Partial transaction update, original user retained"
        );
        return Ok(RetireOutcome::Retained {
            replacement_id,
            accounting,
        });
    }

    match store.delete(users, user_id).await {
        Ok(()) => {
            info!(
                user_id,
                replacement_id,
                transactions_updated = accounting.succeeded,
                "User retired"
            );
            Ok(RetireOutcome::Deleted {
                replacement_id,
                accounting,
            })
        }
        Err(err) => {
            warn!(user_id, error = %err, "Delete of retired original failed, record retained");
            Ok(RetireOutcome::Retained {
                replacement_id,
                accounting,
            })
        }
    }
}

/// Re-points every transaction referencing `from` to `to`, sequentially,
/// accounting per item. Transactions that do not reference `from` or do
/// not parse are left alone.
async fn repoint_transactions(
    store: &dyn RecordStore,
    transactions: &CollectionRef,
    from: i64,
    to: i64,
) -> Result<UpdateAccounting, StoreError> {
    let mut accounting = UpdateAccounting::default();

    for raw in store.fetch_all(transactions).await? {
        let reference: crate::models::TransactionRef = match serde_json::from_value(raw) {
            Ok(reference) => reference,
            Err(err) => {
                warn!(error = %err, "Skipping malformed transaction record");
                continue;
            }
        };
        let Some(repointed) = reference.repointed_relation(from, to) else {
            continue;
        };

        let mut payload = Map::new();
        payload.insert(
            transaction::USER_RELATION_FIELD.to_string(),
            Value::from(repointed),
        );

        match store.update(transactions, reference.id, &payload).await {
            Ok(_) => accounting.succeeded += 1,
            Err(err) if err.is_authorization() => {
                warn!(transaction_id = reference.id, error = %err, "Transaction update unauthorized");
                accounting.authorization_failures += 1;
            }
            Err(err) => {
                warn!(transaction_id = reference.id, error = %err, "Transaction update failed");
                accounting.other_failures += 1;
            }
        }
    }

    Ok(accounting)
}

/// Result of one deletion-intent sweep.
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub examined: usize,
    pub retired: Vec<i64>,
    pub retained: Vec<i64>,
    pub skipped: usize,
    pub failed: usize,
}

/// Retires every user whose deletion intent is old enough.
///
/// Users already carrying the retired convention, users without a
/// deletion intent, and users whose intent timestamp is missing or
/// malformed are skipped. A destructive sweep never guesses at an age.
pub async fn sweep(
    store: &dyn RecordStore,
    users: &CollectionRef,
    transactions: &CollectionRef,
    policy: &RetirementPolicy,
    now: DateTime<Utc>,
) -> Result<SweepReport, RetireError> {
    let mut report = SweepReport::default();

    for raw in store.fetch_all(users).await? {
        report.examined += 1;
        let record: UserRecord = match serde_json::from_value(raw) {
            Ok(record) => record,
            Err(err) => {
                warn!(error = %err, "Skipping malformed user record in sweep");
                report.skipped += 1;
                continue;
            }
        };

        if record.is_retired() || !record.deletion_requested() {
            report.skipped += 1;
            continue;
        }
        if !intent_old_enough(&record, policy.min_intent_days, now) {
            report.skipped += 1;
            continue;
        }

        match retire_user(store, users, transactions, record.id, policy).await {
            Ok(RetireOutcome::Deleted { .. }) => report.retired.push(record.id),
            Ok(RetireOutcome::Retained { .. }) => report.retained.push(record.id),
            Ok(RetireOutcome::AlreadyRetired) => report.skipped += 1,
            Err(err) => {
                warn!(user_id = record.id, error = %err, "Sweep retirement failed");
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

fn intent_old_enough(record: &UserRecord, min_days: i64, now: DateTime<Utc>) -> bool {
    let Some(raw) = record.delete_requested_at.as_deref() else {
        warn!(user_id = record.id, "Deletion intent without timestamp, skipped by sweep");
        return false;
    };
    match dates::parse_record_timestamp(raw) {
        Ok(requested_at) => now - requested_at >= Duration::days(min_days),
        Err(err) => {
            warn!(user_id = record.id, value = raw, error = %err, "Unparseable deletion-intent timestamp, skipped by sweep");
            false
        }
    }
}
