use rusqlite::params;

use crate::db::Database;
use crate::error::Result;

use super::types::{MajorRecommendation, StudentProfile, Submission, SubmissionRow};

const SUBMISSION_COLUMNS: &str = "id, account_id, created_at, student_name, email, phone, \
    school_name, address, academic_strengths, interests, soft_skills, work_preference, \
    env_preference, top_major, match_score";

const INSERT_SUBMISSION: &str = "INSERT INTO submissions \
    (id, account_id, created_at, student_name, email, phone, school_name, address, \
    academic_strengths, interests, soft_skills, work_preference, env_preference, \
    top_major, match_score) \
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)";

const DELETE_ALL: &str = "DELETE FROM submissions";

/// Inserts an already-built row. Shared by `record` and the HTTP create
/// handler, which receives rows in exactly this shape.
pub async fn insert_row(db: &Database, row: &SubmissionRow) -> Result<()> {
    db.write(|engine| {
        engine.execute(
            INSERT_SUBMISSION,
            params![
                row.id,
                row.account_id,
                row.created_at,
                row.student_name,
                row.email,
                row.phone,
                row.school_name,
                row.address,
                row.academic_strengths,
                row.interests,
                row.soft_skills,
                row.work_preference,
                row.env_preference,
                row.top_major,
                row.match_score
            ],
        )
    })
    .await?;
    Ok(())
}

/// Records one completed assessment with its top recommendation summary and
/// returns the stored record.
pub async fn record(
    db: &Database,
    account_id: Option<String>,
    profile: &StudentProfile,
    recommendations: &[MajorRecommendation],
) -> Result<Submission> {
    let row = SubmissionRow::build(account_id, profile, recommendations)?;
    insert_row(db, &row).await?;
    row.decode()
}

/// All stored rows in wire form, newest first.
pub fn list_rows(db: &Database) -> Result<Vec<SubmissionRow>> {
    let sql = format!("SELECT {SUBMISSION_COLUMNS} FROM submissions ORDER BY created_at DESC");
    db.query(&sql, [], |row| {
        Ok(SubmissionRow {
            id: row.get(0)?,
            account_id: row.get(1)?,
            created_at: row.get(2)?,
            student_name: row.get(3)?,
            email: row.get(4)?,
            phone: row.get(5)?,
            school_name: row.get(6)?,
            address: row.get(7)?,
            academic_strengths: row.get(8)?,
            interests: row.get(9)?,
            soft_skills: row.get(10)?,
            work_preference: row.get(11)?,
            env_preference: row.get(12)?,
            top_major: row.get(13)?,
            match_score: row.get(14)?,
        })
    })
}

/// All submissions as typed records, newest first.
pub fn list(db: &Database) -> Result<Vec<Submission>> {
    list_rows(db)?
        .into_iter()
        .map(SubmissionRow::decode)
        .collect()
}

/// Deletes every submission.
pub async fn clear_all(db: &Database) -> Result<()> {
    db.write(|engine| engine.execute(DELETE_ALL, [])).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryBlobStore, BROWSER_IMAGE_KEY};
    use crate::submissions::types::{sample_profile, sample_recommendation, DEFAULT_TOP_MAJOR};
    use std::sync::Arc;

    async fn ready_db() -> Database {
        let db = Database::new(Arc::new(MemoryBlobStore::new()), BROWSER_IMAGE_KEY);
        db.initialize().await.unwrap();
        db
    }

    #[tokio::test]
    async fn record_then_list_round_trips() {
        let db = ready_db().await;
        let profile = sample_profile();
        let recs = vec![sample_recommendation("Mechatronics", 92)];

        let stored = record(&db, Some("a1".into()), &profile, &recs)
            .await
            .unwrap();

        let listed = list(&db).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0], stored);
        assert_eq!(listed[0].profile, profile);
        assert_eq!(listed[0].top_major, "Mechatronics");
        assert_eq!(listed[0].match_score, 92);
    }

    #[tokio::test]
    async fn record_without_recommendations_uses_defaults() {
        let db = ready_db().await;
        let stored = record(&db, None, &sample_profile(), &[]).await.unwrap();
        assert_eq!(stored.top_major, DEFAULT_TOP_MAJOR);
        assert_eq!(stored.match_score, 0);
        assert!(stored.account_id.is_none());
    }

    #[tokio::test]
    async fn empty_list_fields_survive_storage() {
        let db = ready_db().await;
        let mut profile = sample_profile();
        profile.academic_strengths.clear();
        profile.interests.clear();
        profile.soft_skills.clear();

        record(&db, None, &profile, &[]).await.unwrap();
        let listed = list(&db).unwrap();
        assert_eq!(listed[0].profile, profile);
        assert!(listed[0].profile.interests.is_empty());
    }

    #[tokio::test]
    async fn list_is_newest_first() {
        let db = ready_db().await;
        // Explicit stamps so ordering does not hinge on insert timing.
        for (id, stamp) in [
            ("s1", "2026-03-01T08:00:00.000Z"),
            ("s2", "2026-03-02T08:00:00.000Z"),
            ("s3", "2026-03-01T12:30:00.000Z"),
        ] {
            let mut row = SubmissionRow::build(None, &sample_profile(), &[]).unwrap();
            row.id = id.into();
            row.created_at = stamp.into();
            insert_row(&db, &row).await.unwrap();
        }
        let ids: Vec<String> = list(&db).unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["s2".to_owned(), "s3".to_owned(), "s1".to_owned()]);
    }

    #[tokio::test]
    async fn clear_all_removes_everything() {
        let db = ready_db().await;
        record(&db, None, &sample_profile(), &[]).await.unwrap();
        record(&db, None, &sample_profile(), &[]).await.unwrap();
        assert_eq!(list(&db).unwrap().len(), 2);

        clear_all(&db).await.unwrap();
        assert!(list(&db).unwrap().is_empty());
    }

    #[tokio::test]
    async fn submissions_survive_restart() {
        let store = Arc::new(MemoryBlobStore::new());
        let db = Database::new(store.clone(), BROWSER_IMAGE_KEY);
        db.initialize().await.unwrap();
        record(&db, None, &sample_profile(), &[]).await.unwrap();
        drop(db);

        let reopened = Database::new(store, BROWSER_IMAGE_KEY);
        reopened.initialize().await.unwrap();
        assert_eq!(list(&reopened).unwrap().len(), 1);
    }
}
