//! Command line front end: load a repository's history and print a view of it.

use std::io::{self, Write};

use camino::Utf8PathBuf;
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};
use eyre::WrapErr as _;
use tracing_error::ErrorLayer;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;
use tracing_subscriber::EnvFilter;

use chronicle::{
    csv, views, Aggregate, Api, Chronicle, ChronicleConfig, Commit, CommitFilter, Origin,
    SearchMode, Session, SortOrder,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ApiArg {
    Rest,
    Graphql,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    /// One line per commit
    Table,
    /// CSV export
    Csv,
    /// Commits per day
    Timeline,
    /// Commits per author
    Authors,
    /// Contributor list
    Contributors,
    /// Headline numbers
    Summary,
}

/// Show the commit history of a Github repository across all of its branches.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Repository as owner/repo or a github.com URL
    #[arg(value_name = "REFERENCE")]
    reference: String,

    /// TOML configuration file
    #[arg(long, short, value_name = "PATH")]
    config: Option<Utf8PathBuf>,

    /// Github token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Github API to read history through
    #[arg(long, value_name = "API")]
    api: Option<ApiArg>,

    /// Skip fetching the files changed by each commit
    #[arg(long)]
    no_files: bool,

    /// Ignore cached data and fetch again
    #[arg(long)]
    refresh: bool,

    /// Only commits by this login or author name
    #[arg(long, value_name = "NAME")]
    author: Option<String>,

    /// Only commits from this branch
    #[arg(long, value_name = "BRANCH")]
    branch: Option<String>,

    /// Only commits whose message contains this text
    #[arg(long, value_name = "TEXT", conflicts_with = "search_files")]
    search: Option<String>,

    /// Only commits which changed a file whose name contains this text
    #[arg(long, value_name = "TEXT")]
    search_files: Option<String>,

    /// First day to include (YYYY-MM-DD, UTC)
    #[arg(long, value_name = "DATE")]
    since: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD, UTC)
    #[arg(long, value_name = "DATE")]
    until: Option<NaiveDate>,

    /// List oldest commits first
    #[arg(long)]
    oldest_first: bool,

    /// What to print
    #[arg(long, short, value_enum, default_value_t = Format::Table)]
    format: Format,
}

impl Args {
    fn config(&self) -> eyre::Result<ChronicleConfig> {
        let mut config = match &self.config {
            Some(path) => ChronicleConfig::from_file(path)?,
            None => ChronicleConfig::default(),
        };

        if let Some(token) = &self.token {
            config.github.token = Some(token.clone().into());
        }
        match self.api {
            Some(ApiArg::Rest) => config.api = Api::Rest,
            Some(ApiArg::Graphql) => config.api = Api::Graphql,
            None => {}
        }
        if self.no_files {
            config.fetch.files = false;
        }

        Ok(config)
    }

    fn filter(&self) -> CommitFilter {
        let mut filter = CommitFilter::new().between(self.since, self.until);
        if let Some(author) = &self.author {
            filter = filter.author(author);
        }
        if let Some(branch) = &self.branch {
            filter = filter.branch(branch);
        }
        if let Some(text) = &self.search {
            filter = filter.search(text, SearchMode::Message);
        }
        if let Some(text) = &self.search_files {
            filter = filter.search(text, SearchMode::Files);
        }
        filter
    }

    fn order(&self) -> SortOrder {
        if self.oldest_first {
            SortOrder::OldestFirst
        } else {
            SortOrder::NewestFirst
        }
    }
}

fn configure_tracing() -> eyre::Result<()> {
    let filter = EnvFilter::builder()
        .with_default_directive(tracing::level_filters::LevelFilter::WARN.into())
        .from_env()
        .wrap_err("parsing RUST_LOG")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn table_format() -> prettytable::format::TableFormat {
    use prettytable::format::{FormatBuilder, LinePosition, LineSeparator};

    FormatBuilder::new()
        .column_separator(' ')
        .separators(&[LinePosition::Title], LineSeparator::new('─', '─', '─', '─'))
        .padding(1, 1)
        .build()
}

fn commit_table(commits: &[&Commit]) -> prettytable::Table {
    use prettytable::row;

    let mut table: prettytable::Table = commits
        .iter()
        .map(|commit| {
            row![
                l -> &commit.sha[..commit.sha.len().min(7)],
                l -> commit.author_date.format("%Y-%m-%d %H:%M"),
                l -> commit.author(),
                l -> commit.branch.as_deref().unwrap_or_default(),
                l -> commit.subject(),
            ]
        })
        .collect();
    table.set_format(table_format());
    table.set_titles(row![
        lb -> "Commit",
        lb -> "Date",
        lb -> "Author",
        lb -> "Branch",
        lb -> "Message",
    ]);
    table
}

fn report(aggregate: &Aggregate, session: &Session, format: Format) -> eyre::Result<()> {
    let visible = session.visible();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match format {
        Format::Table => {
            commit_table(&visible).print(&mut out)?;
        }
        Format::Csv => csv::write_csv(&mut out, visible.iter().copied())?,
        Format::Timeline => {
            for (day, count) in views::timeline(visible.iter().copied()) {
                writeln!(out, "{day} {count:>5} {}", "#".repeat(count.min(60)))?;
            }
        }
        Format::Authors => {
            use prettytable::row;
            let mut table: prettytable::Table = views::authors(visible.iter().copied())
                .into_iter()
                .map(|(name, count)| row![l -> name, r -> count])
                .collect();
            table.set_format(table_format());
            table.set_titles(row![lb -> "Author", cb -> "Commits"]);
            table.print(&mut out)?;
        }
        Format::Contributors => {
            use prettytable::row;
            let mut table: prettytable::Table = views::contributors(visible.iter().copied())
                .into_iter()
                .map(|c| {
                    row![
                        l -> c.name,
                        l -> c.login.unwrap_or_default(),
                        r -> c.commits,
                        l -> c.profile_url.unwrap_or_default(),
                    ]
                })
                .collect();
            table.set_format(table_format());
            table.set_titles(row![lb -> "Name", lb -> "Login", cb -> "Commits", lb -> "Profile"]);
            table.print(&mut out)?;
        }
        Format::Summary => {
            let summary = views::Summary::of(visible.iter().copied());
            let origin = match aggregate.origin {
                Origin::Cache => "cache",
                Origin::Fetched => "github",
            };
            writeln!(out, "Repository:   {}", aggregate.repo.url())?;
            let captured = aggregate.captured.format("%Y-%m-%d %H:%M:%S UTC");
            writeln!(out, "Source:       {origin}, captured {captured}")?;
            writeln!(
                out,
                "Commits:      {} of {}",
                summary.commits,
                aggregate.commits.len()
            )?;
            writeln!(out, "Active days:  {}", summary.active_days)?;
            writeln!(out, "Contributors: {}", summary.contributors)?;
            if let (Some(first), Some(last)) = (summary.first, summary.last) {
                writeln!(out, "Span:         {} to {}", first.date_naive(), last.date_naive())?;
            }
        }
    }

    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let args = Args::parse();
    configure_tracing()?;

    let chronicle = Chronicle::from_config(args.config()?);
    let result = if args.refresh {
        chronicle.refresh(&args.reference).await
    } else {
        chronicle.load(&args.reference).await
    };

    let mut session = Session::new();
    session.filter = args.filter();
    session.order = args.order();
    session.apply(result);

    if let Some(error) = session.error() {
        eyre::bail!("{error}");
    }

    let Some(aggregate) = session.aggregate() else {
        eyre::bail!("nothing loaded for {}", args.reference);
    };

    tracing::debug!(origin = ?aggregate.origin, commits = aggregate.commits.len(), "loaded");
    report(aggregate, &session, args.format)
}
