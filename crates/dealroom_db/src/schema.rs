//! Schema creation for the term store.

use crate::error::Result;
use crate::TermStore;
use tracing::debug;

impl TermStore {
    /// Ensure the terms table exists. Safe to run from both processes.
    pub(crate) async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"CREATE TABLE IF NOT EXISTS deal_terms (
                game TEXT NOT NULL,
                name TEXT NOT NULL,
                position INTEGER NOT NULL,
                value REAL,
                unit TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'PENDING',
                last_modified INTEGER NOT NULL,
                PRIMARY KEY (game, name)
            )"#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_deal_terms_status ON deal_terms(game, status)")
            .execute(&self.pool)
            .await?;

        debug!("Term store schema verified");
        Ok(())
    }
}
