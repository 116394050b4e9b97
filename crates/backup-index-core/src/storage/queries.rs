use super::models::*;
use super::sqlite::Database;
use chrono::{DateTime, Utc};
use rusqlite::{params, Result, Row, Transaction, TransactionBehavior};
use tracing::debug;

const RESOURCE_COLUMNS: &str = "id, filename, size, last_modified, add_date, last_synchronized, \
     in_progress, queued, times_failed, checksum, is_directory";

fn resource_from_row(row: &Row<'_>) -> Result<Resource> {
    Ok(Resource {
        id: row.get(0)?,
        filename: row.get(1)?,
        size: row.get(2)?,
        last_modified: row.get(3)?,
        add_date: row.get(4)?,
        last_synchronized: row.get(5)?,
        in_progress: row.get(6)?,
        queued: row.get(7)?,
        times_failed: row.get(8)?,
        checksum: row.get(9)?,
        is_directory: row.get(10)?,
    })
}

impl Database {
    // ── Lookup ───────────────────────────────────────────────────

    /// Insert a resource row, ignoring `resource.id`. Returns the new row id.
    pub fn insert_resource(&self, resource: &Resource) -> Result<i64> {
        self.connection().execute(
            "INSERT INTO resource \
             (filename, size, last_modified, add_date, last_synchronized, \
              in_progress, queued, times_failed, checksum, is_directory) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                resource.filename,
                resource.size,
                resource.last_modified,
                resource.add_date,
                resource.last_synchronized,
                resource.in_progress,
                resource.queued,
                resource.times_failed,
                resource.checksum,
                resource.is_directory,
            ],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    pub fn get_resource(&self, id: i64) -> Result<Option<Resource>> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resource WHERE id = ?1");
        match self
            .connection()
            .query_row(&sql, params![id], resource_from_row)
        {
            Ok(resource) => Ok(Some(resource)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn find_resource_by_name(&self, filename: &str) -> Result<Option<Resource>> {
        let sql = format!("SELECT {RESOURCE_COLUMNS} FROM resource WHERE filename = ?1");
        match self
            .connection()
            .query_row(&sql, params![filename], resource_from_row)
        {
            Ok(resource) => Ok(Some(resource)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn resource_exists(&self, id: i64) -> Result<bool> {
        self.connection().query_row(
            "SELECT EXISTS(SELECT 1 FROM resource WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )
    }

    // ── Paging ───────────────────────────────────────────────────

    pub fn count_resources(&self, filter: ResourceFilter) -> Result<usize> {
        let sql = format!("SELECT COUNT(*) FROM resource {}", filter.where_clause());
        let count: i64 = self.connection().query_row(&sql, [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// One page of `filter`, evaluated against the table as it is right now.
    pub fn fetch_resources(
        &self,
        filter: ResourceFilter,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<Resource>> {
        let sql = format!(
            "SELECT {RESOURCE_COLUMNS} FROM resource {} {} LIMIT ?1 OFFSET ?2",
            filter.where_clause(),
            filter.order_clause(),
        );
        let mut stmt = self.connection().prepare_cached(&sql)?;
        let resources = stmt
            .query_map(params![limit as i64, offset as i64], resource_from_row)?
            .collect::<Result<Vec<_>>>()?;
        Ok(resources)
    }

    // ── Status transitions ───────────────────────────────────────
    //
    // Each returns the number of rows touched; zero means the id is gone.

    pub fn mark_in_progress(&self, id: i64) -> Result<usize> {
        self.connection().execute(
            "UPDATE resource SET in_progress = 1 WHERE id = ?1",
            params![id],
        )
    }

    /// Set `in_progress` only if the row is queued and nobody else holds it.
    pub fn claim_resource(&self, id: i64) -> Result<usize> {
        self.connection().execute(
            "UPDATE resource SET in_progress = 1 \
             WHERE id = ?1 AND queued = 1 AND in_progress = 0",
            params![id],
        )
    }

    /// Release every claim. Only safe while no drainer is running.
    pub fn reset_in_progress(&self) -> Result<usize> {
        self.connection().execute(
            "UPDATE resource SET in_progress = 0 WHERE in_progress = 1",
            [],
        )
    }

    pub fn mark_synchronized(&self, id: i64, now: DateTime<Utc>) -> Result<usize> {
        self.connection().execute(
            "UPDATE resource SET in_progress = 0, queued = 0, times_failed = 0, \
             last_synchronized = ?1 WHERE id = ?2",
            params![now, id],
        )
    }

    /// Increment the failure counter and let `will_requeue` decide the new `queued`
    /// flag from the incremented count; directories stay out of the queue regardless.
    /// Read and write share one immediate transaction so concurrent reporters can't
    /// lose an increment.
    ///
    /// Returns `(times_failed, queued)` after the update, or `None` if the id is gone.
    pub fn record_failure<F>(&self, id: i64, will_requeue: F) -> Result<Option<(u32, bool)>>
    where
        F: FnOnce(u32) -> bool,
    {
        let tx = Transaction::new_unchecked(self.connection(), TransactionBehavior::Immediate)?;

        let (current, is_directory): (u32, bool) = match tx.query_row(
            "SELECT times_failed, is_directory FROM resource WHERE id = ?1",
            params![id],
            |row| Ok((row.get(0)?, row.get(1)?)),
        ) {
            Ok(row) => row,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(e),
        };

        let times_failed = current + 1;
        let queued = !is_directory && will_requeue(times_failed);
        tx.execute(
            "UPDATE resource SET times_failed = ?1, in_progress = 0, queued = ?2 WHERE id = ?3",
            params![times_failed, queued, id],
        )?;
        tx.commit()?;

        Ok(Some((times_failed, queued)))
    }

    /// Overwrite the filesystem-derived fields after a rescan.
    pub fn update_file_details(
        &self,
        id: i64,
        size: i64,
        last_modified: DateTime<Utc>,
        checksum: Option<&str>,
    ) -> Result<usize> {
        self.connection().execute(
            "UPDATE resource SET size = ?1, last_modified = ?2, checksum = ?3 WHERE id = ?4",
            params![size, last_modified, checksum, id],
        )
    }

    /// Put a changed file back in the queue with a clean failure count.
    pub fn requeue_resource(&self, id: i64) -> Result<usize> {
        self.connection().execute(
            "UPDATE resource SET queued = 1, times_failed = 0 \
             WHERE id = ?1 AND is_directory = 0",
            params![id],
        )
    }

    // ── Reporting ────────────────────────────────────────────────

    pub fn status_summary(&self) -> Result<StatusSummary> {
        let summary = self.connection().query_row(
            "SELECT COUNT(*), \
                 COALESCE(SUM(is_directory), 0), \
                 COALESCE(SUM(queued), 0), \
                 COALESCE(SUM(in_progress), 0), \
                 COALESCE(SUM(CASE WHEN is_directory = 0 AND queued = 0 AND in_progress = 0 \
                     AND times_failed = 0 AND last_synchronized IS NOT NULL THEN 1 ELSE 0 END), 0), \
                 COALESCE(SUM(CASE WHEN is_directory = 0 AND queued = 0 AND in_progress = 0 \
                     AND times_failed > 0 THEN 1 ELSE 0 END), 0) \
             FROM resource",
            [],
            |row| {
                Ok(StatusSummary {
                    total: row.get(0)?,
                    directories: row.get(1)?,
                    queued: row.get(2)?,
                    in_progress: row.get(3)?,
                    synced: row.get(4)?,
                    stalled: row.get(5)?,
                })
            },
        )?;
        debug!("Status summary: {:?}", summary);
        Ok(summary)
    }
}
