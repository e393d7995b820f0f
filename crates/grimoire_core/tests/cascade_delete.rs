use grimoire_core::db::open_db_in_memory;
use grimoire_core::{ChapterKey, PlotKey, PlotRepository, SqlitePlotRepository};
use rusqlite::Connection;

fn seeded() -> Connection {
    let conn = open_db_in_memory().unwrap();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();
    for (grimoire, chapter, plot) in [
        ("g1", "ch1", "p1"),
        ("g1", "ch1", "p2"),
        ("g1", "ch2", "p1"),
        ("g2", "ch1", "p1"),
    ] {
        repo.upsert_plot(&PlotKey::new(grimoire, chapter, plot), "{}")
            .unwrap();
    }
    conn
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn counts(conn: &Connection) -> (i64, i64, i64) {
    (
        count(conn, "grimoires"),
        count(conn, "chapters"),
        count(conn, "plots"),
    )
}

#[test]
fn deleting_a_plot_removes_only_that_plot() {
    let conn = seeded();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();

    assert!(repo.delete_plot(&PlotKey::new("g1", "ch1", "p1")).unwrap());

    assert_eq!(counts(&conn), (2, 3, 3));
    assert!(repo
        .get_plot(&PlotKey::new("g1", "ch1", "p1"))
        .unwrap()
        .is_none());
    assert!(repo
        .get_plot(&PlotKey::new("g1", "ch2", "p1"))
        .unwrap()
        .is_some());
    assert!(repo
        .get_plot(&PlotKey::new("g2", "ch1", "p1"))
        .unwrap()
        .is_some());
}

#[test]
fn deleting_a_chapter_removes_its_plots() {
    let conn = seeded();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();

    assert!(repo.delete_chapter(&ChapterKey::new("g1", "ch1")).unwrap());

    assert_eq!(counts(&conn), (2, 2, 2));
    assert!(repo
        .list_plots_in_chapter(&ChapterKey::new("g1", "ch1"))
        .unwrap()
        .is_empty());
    assert_eq!(
        repo.list_plots_in_chapter(&ChapterKey::new("g2", "ch1"))
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn deleting_a_grimoire_removes_everything_beneath_it() {
    let conn = seeded();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();

    assert!(repo.delete_grimoire("g1").unwrap());

    assert_eq!(counts(&conn), (1, 1, 1));
    let remaining = repo.list_grimoires().unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].name, "g2");
}

#[test]
fn deleting_missing_targets_reports_false_and_mutates_nothing() {
    let conn = seeded();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();
    let before = counts(&conn);

    assert!(!repo.delete_plot(&PlotKey::new("g1", "ch1", "nope")).unwrap());
    assert!(!repo.delete_plot(&PlotKey::new("g2", "ch2", "p1")).unwrap());
    assert!(!repo.delete_chapter(&ChapterKey::new("g1", "nope")).unwrap());
    assert!(!repo.delete_chapter(&ChapterKey::new("nope", "ch1")).unwrap());
    assert!(!repo.delete_grimoire("nope").unwrap());

    assert_eq!(counts(&conn), before);
}

#[test]
fn parents_survive_when_their_last_child_is_deleted() {
    let conn = seeded();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();

    assert!(repo.delete_plot(&PlotKey::new("g2", "ch1", "p1")).unwrap());
    assert!(repo.delete_chapter(&ChapterKey::new("g1", "ch2")).unwrap());

    let grimoires = repo.list_grimoires().unwrap();
    assert_eq!(grimoires.len(), 2);
    assert_eq!(grimoires[1].chapters.len(), 1);
    assert!(grimoires[1].chapters[0].plots.is_empty());
}

#[test]
fn recreating_after_delete_starts_fresh() {
    let conn = seeded();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();

    assert!(repo.delete_grimoire("g1").unwrap());
    let plot = repo
        .upsert_plot(&PlotKey::new("g1", "ch1", "p9"), "{}")
        .unwrap();

    assert_eq!(plot.sort_order, 0);
    let grimoire = repo.get_grimoire("g1").unwrap().unwrap();
    assert_eq!(grimoire.plot_count(), 1);
}
