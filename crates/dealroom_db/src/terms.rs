//! Term operations. Each method is a single atomic statement.

use crate::error::{DbError, Result};
use crate::types::{Term, TermSnapshot, TermSpec};
use crate::TermStore;
use dealroom_protocol::ApprovalStatus;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite};
use tracing::{debug, info};

impl TermStore {
    // ========================================================================
    // Initialization
    // ========================================================================

    /// Seed the game's fixed term set if it has no rows yet.
    ///
    /// Idempotent: returns `false` without writing when rows already exist.
    /// Two processes racing here insert the same rows; `OR IGNORE` makes the
    /// loser a no-op.
    pub async fn initialize(&self, specs: &[TermSpec]) -> Result<bool> {
        if specs.is_empty() {
            return Err(DbError::invalid_state("term set must not be empty"));
        }

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM deal_terms WHERE game = ?")
            .bind(self.game())
            .fetch_one(&self.pool)
            .await?;
        if existing > 0 {
            debug!(game = %self.game(), rows = existing, "Term set already initialized");
            return Ok(false);
        }

        let now = Self::now_millis();
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT OR IGNORE INTO deal_terms (game, name, position, value, unit, status, last_modified) ",
        );
        builder.push_values(specs.iter().enumerate(), |mut row, (position, spec)| {
            row.push_bind(self.game())
                .push_bind(&spec.name)
                .push_bind(position as i64)
                .push_bind(None::<f64>)
                .push_bind(&spec.unit)
                .push_bind(ApprovalStatus::Pending.as_str())
                .push_bind(now);
        });
        let result = builder.build().execute(&self.pool).await?;

        let seeded = result.rows_affected() > 0;
        if seeded {
            info!(game = %self.game(), terms = specs.len(), "Seeded term set");
        }
        Ok(seeded)
    }

    /// Compare the stored term names against the expected set.
    pub async fn verify_terms(&self, specs: &[TermSpec]) -> Result<()> {
        let snapshot = self.get_all().await?;
        let mut stored: Vec<&str> = snapshot.names().collect();
        let mut expected: Vec<&str> = specs.iter().map(|s| s.name.as_str()).collect();
        stored.sort_unstable();
        expected.sort_unstable();

        if stored != expected {
            return Err(DbError::TermSetMismatch {
                stored: stored.join(", "),
                expected: expected.join(", "),
            });
        }
        Ok(())
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Single consistent read of every term, in sheet order.
    pub async fn get_all(&self) -> Result<TermSnapshot> {
        let rows = sqlx::query(
            r#"
            SELECT name, value, unit, status, last_modified
            FROM deal_terms
            WHERE game = ?
            ORDER BY position ASC
            "#,
        )
        .bind(self.game())
        .fetch_all(&self.pool)
        .await?;

        let terms = rows.iter().map(row_to_term).collect::<Result<Vec<_>>>()?;
        Ok(TermSnapshot::new(terms))
    }

    /// True iff no term has a status other than approved.
    ///
    /// Always a fresh query: the counterparty may have written since the
    /// last read.
    pub async fn is_fully_approved(&self) -> Result<bool> {
        let not_approved: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM deal_terms WHERE game = ? AND status NOT IN ('APPROVED', 'OK')",
        )
        .bind(self.game())
        .fetch_one(&self.pool)
        .await?;
        Ok(not_approved == 0)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Write a proposer value. Resets the approval in the same statement so an
    /// approval can never survive a value change it did not see.
    pub async fn set_value(&self, name: &str, value: f64) -> Result<()> {
        if !value.is_finite() {
            return Err(DbError::InvalidValue {
                term: name.to_string(),
                value,
            });
        }

        let result = sqlx::query(
            r#"
            UPDATE deal_terms SET
                value = ?,
                status = 'PENDING',
                last_modified = ?
            WHERE game = ? AND name = ?
            "#,
        )
        .bind(value)
        .bind(Self::now_millis())
        .bind(self.game())
        .bind(name)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::unknown_term(name));
        }
        debug!(term = %name, value, "Term value written");
        Ok(())
    }

    /// Write a counterparty approval status.
    pub async fn set_status(&self, name: &str, status: ApprovalStatus) -> Result<()> {
        let result = sqlx::query("UPDATE deal_terms SET status = ? WHERE game = ? AND name = ?")
            .bind(status.as_str())
            .bind(self.game())
            .bind(name)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::unknown_term(name));
        }
        debug!(term = %name, status = %status, "Term status written");
        Ok(())
    }

    /// Clear every value and approval of the game. The term set itself stays.
    pub async fn reset(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE deal_terms SET
                value = NULL,
                status = 'PENDING',
                last_modified = ?
            WHERE game = ?
            "#,
        )
        .bind(Self::now_millis())
        .bind(self.game())
        .execute(&self.pool)
        .await?;

        info!(game = %self.game(), terms = result.rows_affected(), "Term set reset");
        Ok(result.rows_affected())
    }
}

fn row_to_term(row: &SqliteRow) -> Result<Term> {
    let status_str: String = row.try_get("status")?;
    let status = ApprovalStatus::parse(&status_str)
        .ok_or_else(|| DbError::invalid_state(format!("Unknown approval status: {}", status_str)))?;

    Ok(Term {
        name: row.try_get("name")?,
        value: row.try_get("value")?,
        unit: row.try_get("unit")?,
        status,
        last_modified: TermStore::millis_to_datetime(row.try_get("last_modified")?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::StoreConfig;

    fn specs() -> Vec<TermSpec> {
        vec![
            TermSpec::new("A", "$"),
            TermSpec::new("B", "%"),
            TermSpec::new("C", "x"),
        ]
    }

    async fn seeded_store() -> TermStore {
        let store = TermStore::open(&StoreConfig::sqlite_memory(), "test").await.unwrap();
        store.initialize(&specs()).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_initialize_seeds_unset_pending_terms() {
        let store = seeded_store().await;
        let snapshot = store.get_all().await.unwrap();

        assert_eq!(snapshot.names().collect::<Vec<_>>(), vec!["A", "B", "C"]);
        for term in &snapshot {
            assert_eq!(term.value, None);
            assert_eq!(term.status, ApprovalStatus::Pending);
        }
        assert_eq!(snapshot.get("B").unwrap().unit, "%");
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = seeded_store().await;
        store.set_value("A", 10.0).await.unwrap();

        let seeded_again = store.initialize(&specs()).await.unwrap();
        assert!(!seeded_again);
        assert_eq!(store.get_all().await.unwrap().get("A").unwrap().value, Some(10.0));
    }

    #[tokio::test]
    async fn test_set_value_resets_status() {
        let store = seeded_store().await;
        store.set_value("A", 10.0).await.unwrap();
        store.set_status("A", ApprovalStatus::Approved).await.unwrap();
        assert!(store.get_all().await.unwrap().get("A").unwrap().is_approved());

        store.set_value("A", 12.5).await.unwrap();

        let term = store.get_all().await.unwrap().get("A").cloned().unwrap();
        assert_eq!(term.value, Some(12.5));
        assert_eq!(term.status, ApprovalStatus::Pending);
    }

    #[tokio::test]
    async fn test_set_value_bumps_last_modified() {
        let store = seeded_store().await;
        let before = store.get_all().await.unwrap().get("A").unwrap().last_modified;
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        store.set_value("A", 1.0).await.unwrap();

        let after = store.get_all().await.unwrap().get("A").unwrap().last_modified;
        assert!(after > before);
    }

    #[tokio::test]
    async fn test_unknown_term_writes_fail() {
        let store = seeded_store().await;
        assert!(matches!(
            store.set_value("Z", 1.0).await,
            Err(DbError::UnknownTerm(name)) if name == "Z"
        ));
        assert!(matches!(
            store.set_status("Z", ApprovalStatus::Approved).await,
            Err(DbError::UnknownTerm(_))
        ));
    }

    #[tokio::test]
    async fn test_non_finite_value_rejected() {
        let store = seeded_store().await;
        assert!(matches!(
            store.set_value("A", f64::NAN).await,
            Err(DbError::InvalidValue { .. })
        ));
    }

    #[tokio::test]
    async fn test_full_approval_requires_every_term() {
        let store = seeded_store().await;
        assert!(!store.is_fully_approved().await.unwrap());

        for name in ["A", "B"] {
            store.set_status(name, ApprovalStatus::Approved).await.unwrap();
        }
        assert!(!store.is_fully_approved().await.unwrap());
        // No intervening writes: same answer.
        assert!(!store.is_fully_approved().await.unwrap());

        store.set_status("C", ApprovalStatus::Approved).await.unwrap();
        assert!(store.is_fully_approved().await.unwrap());
        assert!(store.is_fully_approved().await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_terms_detects_mismatch() {
        let store = seeded_store().await;
        store.verify_terms(&specs()).await.unwrap();

        let other = vec![TermSpec::new("A", "$"), TermSpec::new("D", "x")];
        let err = store.verify_terms(&other).await.unwrap_err();
        assert!(err.is_term_set_error());
    }

    #[tokio::test]
    async fn test_games_are_isolated() {
        let store = seeded_store().await;
        let other = store.for_game("other");
        other.initialize(&[TermSpec::new("A", "$")]).await.unwrap();

        other.set_value("A", 99.0).await.unwrap();
        other.set_status("A", ApprovalStatus::Approved).await.unwrap();

        assert!(other.is_fully_approved().await.unwrap());
        assert!(!store.is_fully_approved().await.unwrap());
        assert_eq!(store.get_all().await.unwrap().get("A").unwrap().value, None);
    }

    #[tokio::test]
    async fn test_reset_clears_values_and_approvals() {
        let store = seeded_store().await;
        store.set_value("A", 3.0).await.unwrap();
        store.set_status("B", ApprovalStatus::Approved).await.unwrap();

        assert_eq!(store.reset().await.unwrap(), 3);

        let snapshot = store.get_all().await.unwrap();
        assert!(snapshot.iter().all(|t| t.value.is_none() && !t.is_approved()));
    }

    #[tokio::test]
    async fn test_legacy_status_labels_are_read() {
        let store = seeded_store().await;
        sqlx::query("UPDATE deal_terms SET status = 'OK' WHERE game = ?")
            .bind(store.game())
            .execute(&store.pool)
            .await
            .unwrap();

        assert!(store.get_all().await.unwrap().all_approved());
        assert!(store.is_fully_approved().await.unwrap());
    }
}
