//! CSV export of commits.
//!
//! The message and file columns are always quoted; other columns only when
//! they contain a delimiter, quote or line break.

use std::io::{self, Write};

use crate::commit::Commit;

/// Column headers, in order.
pub const HEADER: [&str; 6] = ["Commit", "Date", "Time", "Files Changed", "Author", "Branch"];

fn quoted(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn escaped(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        quoted(field)
    } else {
        field.to_owned()
    }
}

fn row(commit: &Commit) -> String {
    let files = commit.filenames().collect::<Vec<_>>().join(", ");
    [
        quoted(&commit.message),
        commit.author_date.format("%Y-%m-%d").to_string(),
        commit.author_date.format("%H:%M:%S").to_string(),
        quoted(&files),
        escaped(commit.author()),
        escaped(commit.branch.as_deref().unwrap_or_default()),
    ]
    .join(",")
}

/// Write a header and one row per commit.
pub fn write_csv<'c, W: Write>(
    mut writer: W,
    commits: impl IntoIterator<Item = &'c Commit>,
) -> io::Result<()> {
    writeln!(writer, "{}", HEADER.join(","))?;
    for commit in commits {
        writeln!(writer, "{}", row(commit))?;
    }
    writer.flush()
}

/// The CSV document as a string.
pub fn to_csv<'c>(commits: impl IntoIterator<Item = &'c Commit>) -> String {
    let mut buffer = Vec::new();
    if let Err(error) = write_csv(&mut buffer, commits) {
        tracing::error!(%error, "writing CSV to memory");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commit::ChangedFile;
    use crate::filter::tests::commit;

    fn file(name: &str) -> ChangedFile {
        ChangedFile {
            filename: name.to_owned(),
            status: None,
            additions: 0,
            deletions: 0,
        }
    }

    #[test]
    fn quotes_in_messages_are_doubled() {
        let mut commit = commit("1", "Ada", "2025-01-01T09:05:03Z");
        commit.message = "He said \"hi\"".into();

        let csv = to_csv([&commit]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Commit,Date,Time,Files Changed,Author,Branch"));
        assert_eq!(
            lines.next(),
            Some(r#""He said ""hi""",2025-01-01,09:05:03,"",Ada,main"#)
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn files_and_awkward_fields() {
        let mut commit = commit("1", "Lovelace, Ada", "2025-01-01T23:59:59Z");
        commit.files = vec![file("src/lib.rs"), file("README.md")];
        commit.branch = None;

        assert_eq!(
            row(&commit),
            r#""Commit 1",2025-01-01,23:59:59,"src/lib.rs, README.md","Lovelace, Ada","#
        );
    }

    #[test]
    fn multi_line_messages_stay_in_one_field() {
        let mut commit = commit("1", "Ada", "2025-01-01T00:00:00Z");
        commit.message = "Subject\n\nBody, with comma".into();
        assert!(row(&commit).starts_with("\"Subject\n\nBody, with comma\","));
    }
}
