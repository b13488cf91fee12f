use tracing::warn;

use crate::db::Database;
use crate::error::{Error, Result};

use super::remote::RemoteClient;
use super::repo;
use super::types::{MajorRecommendation, StudentProfile, Submission, SubmissionRow};

/// Submission storage front. When a remote API is configured every
/// operation is tried there first and silently falls back to the local
/// repository, so embedding hosts keep working offline.
#[derive(Clone)]
pub struct SubmissionService {
    db: Database,
    remote: Option<RemoteClient>,
}

fn combined(remote: Error, local: Error) -> Error {
    Error::RemoteUnreachable(format!("{remote}; local fallback also failed: {local}"))
}

impl SubmissionService {
    pub fn new(db: Database, remote: Option<RemoteClient>) -> Self {
        Self { db, remote }
    }

    /// Stores an already-built row, remote first. The row must decode as a
    /// typed submission; wire rows that do not are refused here, before
    /// either path runs, so a bad insert can never poison later reads.
    pub async fn store_row(&self, row: &SubmissionRow) -> Result<()> {
        row.clone().decode()?;
        if let Some(remote) = &self.remote {
            match remote.create(row).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "remote submissions api unavailable, storing locally");
                    return repo::insert_row(&self.db, row)
                        .await
                        .map_err(|local| combined(e, local));
                }
            }
        }
        repo::insert_row(&self.db, row).await
    }

    /// Builds and stores one completed assessment, returning the stored
    /// record.
    pub async fn record(
        &self,
        account_id: Option<String>,
        profile: &StudentProfile,
        recommendations: &[MajorRecommendation],
    ) -> Result<Submission> {
        let row = SubmissionRow::build(account_id, profile, recommendations)?;
        self.store_row(&row).await?;
        row.decode()
    }

    /// Wire-form rows, newest first.
    pub async fn list_rows(&self) -> Result<Vec<SubmissionRow>> {
        if let Some(remote) = &self.remote {
            match remote.list().await {
                Ok(rows) => return Ok(rows),
                Err(e) => {
                    warn!(error = %e, "remote submissions api unavailable, reading locally");
                    return repo::list_rows(&self.db).map_err(|local| combined(e, local));
                }
            }
        }
        repo::list_rows(&self.db)
    }

    /// Typed submissions, newest first.
    pub async fn list(&self) -> Result<Vec<Submission>> {
        self.list_rows()
            .await?
            .into_iter()
            .map(SubmissionRow::decode)
            .collect()
    }

    pub async fn clear_all(&self) -> Result<()> {
        if let Some(remote) = &self.remote {
            match remote.clear().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(error = %e, "remote submissions api unavailable, clearing locally");
                    return repo::clear_all(&self.db)
                        .await
                        .map_err(|local| combined(e, local));
                }
            }
        }
        repo::clear_all(&self.db).await
    }
}
