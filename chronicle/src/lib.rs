//! # Commit Chronicle
//!
//! Collects the full commit history of a Github repository across every
//! branch, caches the aggregate, and derives views from it.
//!
//! ```no_run
//! # async fn example() -> Result<(), chronicle::Error> {
//! use chronicle::{views, Chronicle, ChronicleConfig, CommitFilter};
//!
//! let chronicle = Chronicle::from_config(ChronicleConfig::default());
//! let aggregate = chronicle.load("https://github.com/rust-lang/cargo").await?;
//!
//! let filter = CommitFilter::new().author("bors");
//! let days = views::timeline(filter.apply(&aggregate.commits));
//! println!("{} active days", days.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use octocat::GithubClient;

mod commit;
mod config;
pub mod csv;
mod error;
mod fetch;
mod filter;
mod pipeline;
mod reference;
mod session;
pub mod source;
pub mod views;

pub use commit::{ChangedFile, Commit};
pub use config::{Api, ChronicleConfig};
pub use error::{ConfigError, Error, FetchError};
pub use fetch::{FetchOptions, Fetcher};
pub use filter::{select, CommitFilter, SearchMode, SortOrder};
pub use pipeline::{Aggregate, Chronicle, Origin};
pub use reference::{InvalidReference, RepoRef};
pub use session::Session;
pub use source::{CommitSource, GraphQlSource, RestSource};

impl Chronicle {
    /// Build the cache, client and fetcher described by `config`.
    pub fn from_config(config: ChronicleConfig) -> Self {
        let client = GithubClient::new(&config.github);
        let source: Arc<dyn CommitSource> = match config.api {
            Api::Rest => Arc::new(RestSource::new(client)),
            Api::Graphql => Arc::new(GraphQlSource::new(client)),
        };

        Chronicle::new(
            config.cache.build(),
            Fetcher::new(source, config.fetch),
        )
    }
}
