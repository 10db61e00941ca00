//! State for one interactive view of a repository.

use crate::commit::Commit;
use crate::error::Error;
use crate::filter::{select, CommitFilter, SortOrder};
use crate::pipeline::Aggregate;

/// What one surface is showing: the working set, how it is filtered and
/// sorted, and the last error.
///
/// A failed load keeps the previous working set, marked stale.
#[derive(Debug, Default)]
pub struct Session {
    aggregate: Option<Aggregate>,
    error: Option<String>,
    stale: bool,

    /// Active filter
    pub filter: CommitFilter,

    /// Active ordering
    pub order: SortOrder,
}

impl Session {
    /// An empty session.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome of a load.
    pub fn apply(&mut self, result: Result<Aggregate, Error>) {
        match result {
            Ok(aggregate) => {
                self.aggregate = Some(aggregate);
                self.error = None;
                self.stale = false;
            }
            Err(Error::Superseded) => {}
            Err(error) => {
                self.error = Some(error.to_string());
                self.stale = self.aggregate.is_some();
            }
        }
    }

    /// The working set, if anything has loaded.
    pub fn aggregate(&self) -> Option<&Aggregate> {
        self.aggregate.as_ref()
    }

    /// Message from the last failed load.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True when the working set predates a failed load.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Filtered, sorted commits to show.
    pub fn visible(&self) -> Vec<&Commit> {
        match &self.aggregate {
            Some(aggregate) => select(&aggregate.commits, &self.filter, self.order),
            None => Vec::new(),
        }
    }
}
