//! Offset-paged traversal of a filtered view of the catalog.
//!
//! The matching row count is taken once, when the iterator is built, and fixes the
//! number of pages at `ceil(count / chunk_size)`. Each page is then fetched lazily with
//! `LIMIT chunk_size OFFSET page * chunk_size` against the table as it is at fetch time.
//!
//! Paging a live filter this way is not stable. When rows leave the filter between
//! fetches (the pending listing loses every resource that is synced or stalled) later
//! offsets shift past rows that were never returned; when rows join it, rows can be
//! returned twice. The page count is not revised either, so trailing pages may come back
//! empty. Callers draining the queue should expect to need another pass.

use crate::error::{Error, Result};
use crate::storage::{Database, Resource, ResourceFilter};
use tracing::trace;

pub struct ChunkedGroups<'a> {
    db: &'a Database,
    filter: ResourceFilter,
    chunk_size: usize,
    total: usize,
    pages: usize,
    next_page: usize,
}

impl<'a> ChunkedGroups<'a> {
    pub fn new(db: &'a Database, filter: ResourceFilter, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(Error::InvalidChunkSize(chunk_size));
        }
        let count = db.count_resources(filter)?;
        let pages = count.div_ceil(chunk_size);
        trace!(
            "Chunked walk over {:?}: {} rows, {} pages of {}",
            filter,
            count,
            pages,
            chunk_size
        );
        Ok(Self {
            db,
            filter,
            chunk_size,
            total: count,
            pages,
            next_page: 0,
        })
    }

    /// Matching rows at construction; the page count is derived from it.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Page count fixed at construction.
    pub fn pages(&self) -> usize {
        self.pages
    }
}

impl Iterator for ChunkedGroups<'_> {
    type Item = Result<Vec<Resource>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_page >= self.pages {
            return None;
        }
        let offset = self.next_page * self.chunk_size;
        self.next_page += 1;
        Some(
            self.db
                .fetch_resources(self.filter, offset, self.chunk_size)
                .map_err(Error::from),
        )
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.pages - self.next_page;
        (remaining, Some(remaining))
    }
}

impl Database {
    pub fn groups(
        &self,
        filter: ResourceFilter,
        chunk_size: usize,
    ) -> Result<ChunkedGroups<'_>> {
        ChunkedGroups::new(self, filter, chunk_size)
    }

    /// All resources, ordered by filename.
    pub fn ordered_groups(&self, chunk_size: usize) -> Result<ChunkedGroups<'_>> {
        ChunkedGroups::new(self, ResourceFilter::All, chunk_size)
    }

    /// Resources waiting for a sync attempt.
    pub fn pending_sync_groups(&self, chunk_size: usize) -> Result<ChunkedGroups<'_>> {
        ChunkedGroups::new(self, ResourceFilter::Pending, chunk_size)
    }

    /// Resources that exhausted their retries.
    pub fn stalled_groups(&self, chunk_size: usize) -> Result<ChunkedGroups<'_>> {
        ChunkedGroups::new(self, ResourceFilter::Stalled, chunk_size)
    }
}
