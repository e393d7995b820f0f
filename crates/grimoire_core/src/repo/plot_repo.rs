//! Plot repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide upsert, delete and listing APIs over the grimoire hierarchy.
//! - Keep SQL details and ordering behavior inside the repository boundary.
//!
//! # Invariants
//! - Parents are created on first plot write and never garbage-collected.
//! - Every multi-statement write runs in one IMMEDIATE transaction.
//! - Listing is deterministic: `sort_order ASC, name ASC` at every level.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::plot::{Chapter, ChapterKey, Grimoire, Plot, PlotKey};
use log::{debug, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

const NOW_MS_SQL: &str = "(strftime('%s', 'now') * 1000)";

/// Result type used by plot repository operations.
pub type PlotRepoResult<T> = Result<T, PlotRepoError>;

/// Errors from plot repository operations.
#[derive(Debug)]
pub enum PlotRepoError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
    /// Persisted data does not match the write that produced it.
    InvalidData(String),
}

impl PlotRepoError {
    /// Returns whether the failed operation may succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Db(err) => err.is_transient(),
            _ => false,
        }
    }
}

impl Display for PlotRepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "plot repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "plot repository requires table `{table}`")
            }
            Self::InvalidData(message) => write!(f, "invalid plot data: {message}"),
        }
    }
}

impl Error for PlotRepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for PlotRepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for PlotRepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the grimoire → chapter → plot hierarchy.
pub trait PlotRepository {
    /// Creates missing parents, then inserts or overwrites one plot.
    fn upsert_plot(&self, key: &PlotKey, json_data: &str) -> PlotRepoResult<Plot>;
    /// Loads one plot by key.
    fn get_plot(&self, key: &PlotKey) -> PlotRepoResult<Option<Plot>>;
    /// Deletes one plot. Returns `false` when it does not exist.
    fn delete_plot(&self, key: &PlotKey) -> PlotRepoResult<bool>;
    /// Deletes one chapter and its plots. Returns `false` when absent.
    fn delete_chapter(&self, key: &ChapterKey) -> PlotRepoResult<bool>;
    /// Deletes one grimoire and everything beneath it. Returns `false` when absent.
    fn delete_grimoire(&self, name: &str) -> PlotRepoResult<bool>;
    /// Lists all grimoires with nested chapters and plots.
    fn list_grimoires(&self) -> PlotRepoResult<Vec<Grimoire>>;
    /// Loads one grimoire with nested chapters and plots.
    fn get_grimoire(&self, name: &str) -> PlotRepoResult<Option<Grimoire>>;
    /// Loads one chapter row; `plots` is left empty.
    fn get_chapter(&self, key: &ChapterKey) -> PlotRepoResult<Option<Chapter>>;
    /// Lists plots of one chapter in display order.
    fn list_plots_in_chapter(&self, key: &ChapterKey) -> PlotRepoResult<Vec<Plot>>;
}

/// SQLite-backed plot repository.
pub struct SqlitePlotRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqlitePlotRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> PlotRepoResult<Self> {
        ensure_plot_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl PlotRepository for SqlitePlotRepository<'_> {
    fn upsert_plot(&self, key: &PlotKey, json_data: &str) -> PlotRepoResult<Plot> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let created_grimoire = tx.execute(
            &format!(
                "INSERT OR IGNORE INTO grimoires (name, sort_order, created_at)
                 VALUES (
                    ?1,
                    (SELECT COALESCE(MAX(sort_order), -1) + 1 FROM grimoires),
                    {NOW_MS_SQL}
                 );"
            ),
            [key.grimoire.as_str()],
        )? > 0;

        let created_chapter = tx.execute(
            &format!(
                "INSERT OR IGNORE INTO chapters (grimoire_name, name, sort_order, created_at)
                 VALUES (
                    ?1,
                    ?2,
                    (SELECT COALESCE(MAX(sort_order), -1) + 1
                     FROM chapters
                     WHERE grimoire_name = ?1),
                    {NOW_MS_SQL}
                 );"
            ),
            params![key.grimoire, key.chapter],
        )? > 0;

        tx.execute(
            &format!(
                "INSERT INTO plots (grimoire_name, chapter_name, name, json_data, sort_order, created_at)
                 VALUES (
                    ?1,
                    ?2,
                    ?3,
                    ?4,
                    (SELECT COALESCE(MAX(sort_order), -1) + 1
                     FROM plots
                     WHERE grimoire_name = ?1 AND chapter_name = ?2),
                    {NOW_MS_SQL}
                 )
                 ON CONFLICT (grimoire_name, chapter_name, name) DO UPDATE SET
                    json_data = excluded.json_data,
                    created_at = excluded.created_at;"
            ),
            params![key.grimoire, key.chapter, key.plot, json_data],
        )?;

        let plot = load_plot(&tx, key)?.ok_or_else(|| {
            PlotRepoError::InvalidData("plot row missing after upsert".to_string())
        })?;
        tx.commit()?;

        debug!(
            "event=plot_upsert module=repo status=ok created_grimoire={} created_chapter={} payload_bytes={}",
            created_grimoire,
            created_chapter,
            json_data.len()
        );
        Ok(plot)
    }

    fn get_plot(&self, key: &PlotKey) -> PlotRepoResult<Option<Plot>> {
        load_plot(self.conn, key)
    }

    fn delete_plot(&self, key: &PlotKey) -> PlotRepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM plots
             WHERE grimoire_name = ?1
               AND chapter_name = ?2
               AND name = ?3;",
            params![key.grimoire, key.chapter, key.plot],
        )?;
        if changed > 0 {
            info!("event=plot_delete module=repo status=ok scope=plot");
        }
        Ok(changed > 0)
    }

    fn delete_chapter(&self, key: &ChapterKey) -> PlotRepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let removed_plots = tx.execute(
            "DELETE FROM plots WHERE grimoire_name = ?1 AND chapter_name = ?2;",
            params![key.grimoire, key.chapter],
        )?;
        let removed_chapters = tx.execute(
            "DELETE FROM chapters WHERE grimoire_name = ?1 AND name = ?2;",
            params![key.grimoire, key.chapter],
        )?;
        if removed_chapters == 0 {
            // Dropping the transaction rolls back; nothing was touched anyway.
            return Ok(false);
        }

        tx.commit()?;
        info!(
            "event=plot_delete module=repo status=ok scope=chapter removed_plots={}",
            removed_plots
        );
        Ok(true)
    }

    fn delete_grimoire(&self, name: &str) -> PlotRepoResult<bool> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let removed_plots =
            tx.execute("DELETE FROM plots WHERE grimoire_name = ?1;", [name])?;
        let removed_chapters =
            tx.execute("DELETE FROM chapters WHERE grimoire_name = ?1;", [name])?;
        let removed_grimoires = tx.execute("DELETE FROM grimoires WHERE name = ?1;", [name])?;
        if removed_grimoires == 0 {
            return Ok(false);
        }

        tx.commit()?;
        info!(
            "event=plot_delete module=repo status=ok scope=grimoire removed_chapters={} removed_plots={}",
            removed_chapters, removed_plots
        );
        Ok(true)
    }

    fn list_grimoires(&self) -> PlotRepoResult<Vec<Grimoire>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let grimoires = query_grimoires(&tx, None)?;
        let chapters = query_chapters(&tx, None)?;
        let plots = query_plots(&tx, PlotScope::All)?;
        tx.commit()?;
        Ok(assemble(grimoires, chapters, plots))
    }

    fn get_grimoire(&self, name: &str) -> PlotRepoResult<Option<Grimoire>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let grimoires = query_grimoires(&tx, Some(name))?;
        if grimoires.is_empty() {
            return Ok(None);
        }
        let chapters = query_chapters(&tx, Some(name))?;
        let plots = query_plots(&tx, PlotScope::Grimoire(name))?;
        tx.commit()?;
        Ok(assemble(grimoires, chapters, plots).into_iter().next())
    }

    fn get_chapter(&self, key: &ChapterKey) -> PlotRepoResult<Option<Chapter>> {
        let chapter = self
            .conn
            .query_row(
                "SELECT grimoire_name, name, created_at, sort_order
                 FROM chapters
                 WHERE grimoire_name = ?1 AND name = ?2;",
                params![key.grimoire, key.chapter],
                parse_chapter_row,
            )
            .optional()?;
        Ok(chapter)
    }

    fn list_plots_in_chapter(&self, key: &ChapterKey) -> PlotRepoResult<Vec<Plot>> {
        query_plots(self.conn, PlotScope::Chapter(key))
    }
}

#[derive(Debug, Clone, Copy)]
enum PlotScope<'a> {
    All,
    Grimoire(&'a str),
    Chapter(&'a ChapterKey),
}

fn load_plot(conn: &Connection, key: &PlotKey) -> PlotRepoResult<Option<Plot>> {
    let plot = conn
        .query_row(
            "SELECT grimoire_name, chapter_name, name, json_data, created_at, sort_order
             FROM plots
             WHERE grimoire_name = ?1
               AND chapter_name = ?2
               AND name = ?3;",
            params![key.grimoire, key.chapter, key.plot],
            parse_plot_row,
        )
        .optional()?;
    Ok(plot)
}

fn query_grimoires(conn: &Connection, name: Option<&str>) -> PlotRepoResult<Vec<Grimoire>> {
    let mut items = Vec::new();
    match name {
        Some(name) => {
            let mut stmt = conn.prepare(
                "SELECT name, created_at, sort_order
                 FROM grimoires
                 WHERE name = ?1;",
            )?;
            let mut rows = stmt.query([name])?;
            while let Some(row) = rows.next()? {
                items.push(parse_grimoire_row(row)?);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT name, created_at, sort_order
                 FROM grimoires
                 ORDER BY sort_order ASC, name ASC;",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                items.push(parse_grimoire_row(row)?);
            }
        }
    }
    Ok(items)
}

fn query_chapters(conn: &Connection, grimoire: Option<&str>) -> PlotRepoResult<Vec<Chapter>> {
    let mut items = Vec::new();
    match grimoire {
        Some(grimoire) => {
            let mut stmt = conn.prepare(
                "SELECT grimoire_name, name, created_at, sort_order
                 FROM chapters
                 WHERE grimoire_name = ?1
                 ORDER BY sort_order ASC, name ASC;",
            )?;
            let mut rows = stmt.query([grimoire])?;
            while let Some(row) = rows.next()? {
                items.push(parse_chapter_row(row)?);
            }
        }
        None => {
            let mut stmt = conn.prepare(
                "SELECT grimoire_name, name, created_at, sort_order
                 FROM chapters
                 ORDER BY grimoire_name ASC, sort_order ASC, name ASC;",
            )?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                items.push(parse_chapter_row(row)?);
            }
        }
    }
    Ok(items)
}

fn query_plots(conn: &Connection, scope: PlotScope<'_>) -> PlotRepoResult<Vec<Plot>> {
    const SELECT: &str = "SELECT grimoire_name, chapter_name, name, json_data, created_at, sort_order
                          FROM plots";
    let mut items = Vec::new();
    match scope {
        PlotScope::All => {
            let mut stmt = conn.prepare(&format!(
                "{SELECT} ORDER BY grimoire_name ASC, chapter_name ASC, sort_order ASC, name ASC;"
            ))?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                items.push(parse_plot_row(row)?);
            }
        }
        PlotScope::Grimoire(grimoire) => {
            let mut stmt = conn.prepare(&format!(
                "{SELECT} WHERE grimoire_name = ?1
                 ORDER BY chapter_name ASC, sort_order ASC, name ASC;"
            ))?;
            let mut rows = stmt.query([grimoire])?;
            while let Some(row) = rows.next()? {
                items.push(parse_plot_row(row)?);
            }
        }
        PlotScope::Chapter(key) => {
            let mut stmt = conn.prepare(&format!(
                "{SELECT} WHERE grimoire_name = ?1 AND chapter_name = ?2
                 ORDER BY sort_order ASC, name ASC;"
            ))?;
            let mut rows = stmt.query(params![key.grimoire, key.chapter])?;
            while let Some(row) = rows.next()? {
                items.push(parse_plot_row(row)?);
            }
        }
    }
    Ok(items)
}

/// Nests flat rows; input vectors are already in display order.
fn assemble(grimoires: Vec<Grimoire>, chapters: Vec<Chapter>, plots: Vec<Plot>) -> Vec<Grimoire> {
    let mut plots_by_chapter: HashMap<ChapterKey, Vec<Plot>> = HashMap::new();
    for plot in plots {
        plots_by_chapter
            .entry(ChapterKey::new(
                plot.grimoire_name.clone(),
                plot.chapter_name.clone(),
            ))
            .or_default()
            .push(plot);
    }

    let mut chapters_by_grimoire: HashMap<String, Vec<Chapter>> = HashMap::new();
    for mut chapter in chapters {
        chapter.plots = plots_by_chapter.remove(&chapter.key()).unwrap_or_default();
        chapters_by_grimoire
            .entry(chapter.grimoire_name.clone())
            .or_default()
            .push(chapter);
    }

    grimoires
        .into_iter()
        .map(|mut grimoire| {
            grimoire.chapters = chapters_by_grimoire
                .remove(&grimoire.name)
                .unwrap_or_default();
            grimoire
        })
        .collect()
}

fn parse_grimoire_row(row: &Row<'_>) -> rusqlite::Result<Grimoire> {
    Ok(Grimoire {
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        sort_order: row.get("sort_order")?,
        chapters: Vec::new(),
    })
}

fn parse_chapter_row(row: &Row<'_>) -> rusqlite::Result<Chapter> {
    Ok(Chapter {
        grimoire_name: row.get("grimoire_name")?,
        name: row.get("name")?,
        created_at: row.get("created_at")?,
        sort_order: row.get("sort_order")?,
        plots: Vec::new(),
    })
}

fn parse_plot_row(row: &Row<'_>) -> rusqlite::Result<Plot> {
    Ok(Plot {
        grimoire_name: row.get("grimoire_name")?,
        chapter_name: row.get("chapter_name")?,
        name: row.get("name")?,
        json_data: row.get("json_data")?,
        created_at: row.get("created_at")?,
        sort_order: row.get("sort_order")?,
    })
}

fn ensure_plot_connection_ready(conn: &Connection) -> PlotRepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(PlotRepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in ["grimoires", "chapters", "plots"] {
        if !table_exists(conn, table)? {
            return Err(PlotRepoError::MissingRequiredTable(table));
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> PlotRepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
