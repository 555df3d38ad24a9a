//! `SQLite` schema migrations driven by a journal manifest.
//!
//! A migration set is an ordered list of SQL steps plus a journal manifest
//! (`meta/_journal.json`) that names each step by index and tag. The set
//! shipped with the crate is embedded at compile time from `migrations/`.
//!
//! Applied steps are recorded in the `__todokit_migrations` table. Each step
//! and its journal row commit in one transaction, so a crash mid-step leaves
//! the step unapplied rather than half-applied and marked done.
//!
//! # Usage
//!
//! ```rust,ignore
//! use todokit::storage::migrations::{MigrationRunner, MigrationSet};
//!
//! let set = MigrationSet::bundled()?;
//! let report = MigrationRunner::new(&set).run(&mut conn)?;
//! ```

use crate::{Error, Result};
use rusqlite::{Connection, params};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Name of the table recording applied steps.
pub const JOURNAL_TABLE: &str = "__todokit_migrations";

/// Separator between statements inside one migration file.
pub const STATEMENT_BREAKPOINT: &str = "--> statement-breakpoint";

const BUNDLED_JOURNAL: &str = include_str!("../../migrations/meta/_journal.json");
const BUNDLED_SQL: &[(&str, &str)] = &[
    (
        "0000_initial_schema",
        include_str!("../../migrations/0000_initial_schema.sql"),
    ),
    (
        "0001_add_todos_table",
        include_str!("../../migrations/0001_add_todos_table.sql"),
    ),
];

/// Journal manifest as written by the schema tooling.
#[derive(Debug, Deserialize)]
struct JournalManifest {
    #[serde(default)]
    dialect: Option<String>,
    entries: Vec<JournalEntry>,
}

/// One manifest entry.
#[derive(Debug, Deserialize)]
struct JournalEntry {
    idx: u32,
    #[serde(default)]
    when: i64,
    tag: String,
    #[serde(default)]
    breakpoints: bool,
}

/// A single migration step.
#[derive(Debug, Clone)]
pub struct Migration {
    /// Position in the journal (ascending, unique).
    pub idx: u32,
    /// Step name, e.g. `0001_add_todos_table`.
    pub tag: String,
    /// Authoring time (Unix epoch milliseconds).
    pub when: i64,
    /// Whether `sql` is split on [`STATEMENT_BREAKPOINT`].
    pub breakpoints: bool,
    /// The SQL text.
    pub sql: String,
}

impl Migration {
    /// Splits the SQL into statements to execute.
    #[must_use]
    pub fn statements(&self) -> Vec<&str> {
        if self.breakpoints {
            self.sql
                .split(STATEMENT_BREAKPOINT)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        } else {
            vec![self.sql.trim()]
        }
    }

    /// Hex SHA-256 of the SQL text, stored alongside the journal row.
    #[must_use]
    pub fn hash(&self) -> String {
        hex::encode(Sha256::digest(self.sql.as_bytes()))
    }

    fn error(&self, cause: impl ToString) -> Error {
        Error::Migration {
            idx: self.idx,
            tag: self.tag.clone(),
            cause: cause.to_string(),
        }
    }
}

/// An ordered, validated set of migrations.
#[derive(Debug, Clone)]
pub struct MigrationSet {
    migrations: Vec<Migration>,
}

impl MigrationSet {
    /// The migrations embedded in this crate.
    ///
    /// # Errors
    ///
    /// Returns an error if the embedded manifest does not match the embedded
    /// SQL files.
    pub fn bundled() -> Result<Self> {
        Self::from_journal(BUNDLED_JOURNAL, BUNDLED_SQL)
    }

    /// Builds a set from a journal manifest and SQL text keyed by tag.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Migration`] if the manifest cannot be parsed, an
    /// entry has no SQL, or indices are duplicated or out of order.
    pub fn from_journal(journal: &str, sql_by_tag: &[(&str, &str)]) -> Result<Self> {
        let manifest: JournalManifest =
            serde_json::from_str(journal).map_err(|e| Error::Migration {
                idx: 0,
                tag: "_journal".to_string(),
                cause: format!("unreadable journal manifest: {e}"),
            })?;

        if let Some(dialect) = manifest.dialect.as_deref() {
            if dialect != "sqlite" {
                return Err(Error::Migration {
                    idx: 0,
                    tag: "_journal".to_string(),
                    cause: format!("unsupported dialect: {dialect}"),
                });
            }
        }

        let sql: HashMap<&str, &str> = sql_by_tag.iter().copied().collect();
        let mut migrations = Vec::with_capacity(manifest.entries.len());
        let mut previous: Option<u32> = None;

        for entry in manifest.entries {
            if previous.is_some_and(|prev| entry.idx <= prev) {
                return Err(Error::Migration {
                    idx: entry.idx,
                    tag: entry.tag,
                    cause: "journal indices must be unique and ascending".to_string(),
                });
            }
            previous = Some(entry.idx);

            let Some(text) = sql.get(entry.tag.as_str()) else {
                return Err(Error::Migration {
                    idx: entry.idx,
                    tag: entry.tag,
                    cause: "no SQL found for journal entry".to_string(),
                });
            };

            migrations.push(Migration {
                idx: entry.idx,
                tag: entry.tag,
                when: entry.when,
                breakpoints: entry.breakpoints,
                sql: (*text).to_string(),
            });
        }

        Ok(Self { migrations })
    }

    /// The migrations in application order.
    #[must_use]
    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Highest journal index, if any.
    #[must_use]
    pub fn latest(&self) -> Option<u32> {
        self.migrations.last().map(|m| m.idx)
    }

    /// Returns true if the set contains no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.migrations.is_empty()
    }
}

/// Applied/pending state of one journal entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationStatus {
    /// Journal index.
    pub idx: u32,
    /// Step tag.
    pub tag: String,
    /// Whether the step is recorded in the journal table.
    pub applied: bool,
}

/// Outcome of a [`MigrationRunner::run`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Indices applied by this run.
    pub applied: Vec<u32>,
    /// Steps that were already recorded.
    pub skipped: usize,
    /// Already-applied steps whose SQL hash no longer matches.
    pub drifted: Vec<u32>,
}

/// Applies a [`MigrationSet`] to a connection.
pub struct MigrationRunner<'a> {
    set: &'a MigrationSet,
}

impl<'a> MigrationRunner<'a> {
    /// Creates a runner for a migration set.
    #[must_use]
    pub const fn new(set: &'a MigrationSet) -> Self {
        Self { set }
    }

    /// Applies all pending steps in ascending order.
    ///
    /// Stops at the first failing step; earlier steps stay committed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Migration`] if a step fails, or
    /// [`Error::OperationFailed`] if the journal table cannot be read.
    pub fn run(&self, conn: &mut Connection) -> Result<MigrationReport> {
        ensure_journal_table(conn)?;
        let applied = applied_hashes(conn)?;
        let mut report = MigrationReport::default();

        for migration in self.set.migrations() {
            if let Some(recorded) = applied.get(&migration.idx) {
                if *recorded != migration.hash() {
                    tracing::warn!(
                        idx = migration.idx,
                        tag = %migration.tag,
                        "Applied migration differs from its current SQL; not re-applying"
                    );
                    report.drifted.push(migration.idx);
                }
                report.skipped += 1;
                continue;
            }

            apply_migration(conn, migration)?;
            report.applied.push(migration.idx);
        }

        Ok(report)
    }

    /// Reports which journal entries are applied.
    ///
    /// # Errors
    ///
    /// Returns an error if the journal table cannot be read.
    pub fn status(&self, conn: &Connection) -> Result<Vec<MigrationStatus>> {
        let applied = if journal_table_exists(conn)? {
            applied_hashes(conn)?
        } else {
            HashMap::new()
        };

        Ok(self
            .set
            .migrations()
            .iter()
            .map(|m| MigrationStatus {
                idx: m.idx,
                tag: m.tag.clone(),
                applied: applied.contains_key(&m.idx),
            })
            .collect())
    }
}

fn ensure_journal_table(conn: &Connection) -> Result<()> {
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS {JOURNAL_TABLE} (
                idx INTEGER PRIMARY KEY,
                tag TEXT NOT NULL,
                hash TEXT NOT NULL,
                applied_at INTEGER NOT NULL
            )"
        ),
        [],
    )
    .map_err(|e| Error::operation("create_migrations_table", e))?;
    Ok(())
}

fn journal_table_exists(conn: &Connection) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
        params![JOURNAL_TABLE],
        |row| row.get(0),
    )
    .map_err(|e| Error::operation("check_migrations_table", e))
}

fn applied_hashes(conn: &Connection) -> Result<HashMap<u32, String>> {
    let mut stmt = conn
        .prepare(&format!("SELECT idx, hash FROM {JOURNAL_TABLE}"))
        .map_err(|e| Error::operation("prepare_applied_migrations", e))?;

    let rows = stmt
        .query_map([], |row| Ok((row.get::<_, u32>(0)?, row.get::<_, String>(1)?)))
        .map_err(|e| Error::operation("query_applied_migrations", e))?;

    rows.collect::<rusqlite::Result<HashMap<_, _>>>()
        .map_err(|e| Error::operation("read_applied_migrations", e))
}

/// Applies one step and records it, atomically.
fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<()> {
    let tx = conn.transaction().map_err(|e| migration.error(e))?;

    for statement in migration.statements() {
        tx.execute_batch(statement)
            .map_err(|e| migration.error(e))?;
    }

    tx.execute(
        &format!("INSERT INTO {JOURNAL_TABLE} (idx, tag, hash, applied_at) VALUES (?1, ?2, ?3, ?4)"),
        params![
            migration.idx,
            migration.tag,
            migration.hash(),
            chrono::Utc::now().timestamp_millis()
        ],
    )
    .map_err(|e| migration.error(e))?;

    tx.commit().map_err(|e| migration.error(e))?;

    tracing::info!(idx = migration.idx, tag = %migration.tag, "Applied migration");
    metrics::counter!("sqlite_migrations_applied_total").increment(1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const JOURNAL: &str = r#"{
        "dialect": "sqlite",
        "entries": [
            {"idx": 0, "when": 1, "tag": "0000_a", "breakpoints": true},
            {"idx": 1, "when": 2, "tag": "0001_b", "breakpoints": true}
        ]
    }"#;

    const SQL_A: &str = "CREATE TABLE a (id TEXT PRIMARY KEY);\n--> statement-breakpoint\nCREATE INDEX a_id ON a (id);";
    const SQL_B: &str = "CREATE TABLE b (id TEXT PRIMARY KEY);";

    fn table_exists(conn: &Connection, name: &str) -> bool {
        conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![name],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_bundled_set_is_consistent() {
        let set = MigrationSet::bundled().unwrap();
        assert_eq!(set.migrations().len(), 2);
        assert_eq!(set.latest(), Some(1));
        assert_eq!(set.migrations()[1].tag, "0001_add_todos_table");
    }

    #[test]
    fn test_statements_split_on_breakpoints() {
        let set = MigrationSet::from_journal(JOURNAL, &[("0000_a", SQL_A), ("0001_b", SQL_B)]).unwrap();
        let statements = set.migrations()[0].statements();
        assert_eq!(statements.len(), 2);
        assert!(statements[1].starts_with("CREATE INDEX"));
    }

    #[test]
    fn test_run_applies_in_order_then_skips() {
        let set = MigrationSet::from_journal(JOURNAL, &[("0000_a", SQL_A), ("0001_b", SQL_B)]).unwrap();
        let mut conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new(&set);

        let first = runner.run(&mut conn).unwrap();
        assert_eq!(first.applied, vec![0, 1]);
        assert_eq!(first.skipped, 0);
        assert!(table_exists(&conn, "a"));
        assert!(table_exists(&conn, "b"));

        let second = runner.run(&mut conn).unwrap();
        assert!(second.applied.is_empty());
        assert_eq!(second.skipped, 2);
    }

    #[test]
    fn test_failed_step_is_not_journaled() {
        let broken = "CREATE TABLE c (id TEXT);\n--> statement-breakpoint\nTHIS IS NOT SQL;";
        let set = MigrationSet::from_journal(JOURNAL, &[("0000_a", SQL_A), ("0001_b", broken)]).unwrap();
        let mut conn = Connection::open_in_memory().unwrap();
        let runner = MigrationRunner::new(&set);

        let err = runner.run(&mut conn).unwrap_err();
        assert!(matches!(err, Error::Migration { idx: 1, .. }));

        // Step 0 committed; step 1 rolled back entirely, including its first statement.
        assert!(table_exists(&conn, "a"));
        assert!(!table_exists(&conn, "c"));
        let status = runner.status(&conn).unwrap();
        assert!(status[0].applied);
        assert!(!status[1].applied);
    }

    #[test]
    fn test_drift_is_reported_not_reapplied() {
        let set = MigrationSet::from_journal(JOURNAL, &[("0000_a", SQL_A), ("0001_b", SQL_B)]).unwrap();
        let mut conn = Connection::open_in_memory().unwrap();
        MigrationRunner::new(&set).run(&mut conn).unwrap();

        let edited = "CREATE TABLE b (id TEXT PRIMARY KEY, extra TEXT);";
        let changed = MigrationSet::from_journal(JOURNAL, &[("0000_a", SQL_A), ("0001_b", edited)]).unwrap();
        let report = MigrationRunner::new(&changed).run(&mut conn).unwrap();
        assert_eq!(report.drifted, vec![1]);
        assert!(report.applied.is_empty());
    }

    #[test]
    fn test_missing_sql_is_rejected() {
        let err = MigrationSet::from_journal(JOURNAL, &[("0000_a", SQL_A)]).unwrap_err();
        assert!(matches!(err, Error::Migration { idx: 1, .. }));
    }

    #[test]
    fn test_out_of_order_journal_is_rejected() {
        let journal = r#"{"entries": [
            {"idx": 1, "tag": "0001_b"},
            {"idx": 0, "tag": "0000_a"}
        ]}"#;
        let err = MigrationSet::from_journal(journal, &[("0000_a", SQL_A), ("0001_b", SQL_B)]).unwrap_err();
        assert!(err.to_string().contains("ascending"));
    }

    #[test]
    fn test_unreadable_journal_is_rejected() {
        let err = MigrationSet::from_journal("{not json", &[]).unwrap_err();
        assert!(err.to_string().contains("unreadable journal manifest"));
    }

    #[test]
    fn test_status_before_any_run() {
        let set = MigrationSet::bundled().unwrap();
        let conn = Connection::open_in_memory().unwrap();
        let status = MigrationRunner::new(&set).status(&conn).unwrap();
        assert!(status.iter().all(|s| !s.applied));
    }
}
