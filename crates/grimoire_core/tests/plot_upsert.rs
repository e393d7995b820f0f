use grimoire_core::db::open_db_in_memory;
use grimoire_core::{
    with_plot_service, ChapterKey, PlotKey, PlotRepository, PlotService, PlotServiceError,
    SqlitePlotRepository,
};
use rusqlite::Connection;
use serde_json::{json, Value};

fn setup() -> Connection {
    open_db_in_memory().unwrap()
}

fn count(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {table};"), [], |row| {
        row.get(0)
    })
    .unwrap()
}

fn figure(title: &str) -> String {
    json!({
        "data": [{"type": "scatter", "x": [1, 2, 3], "y": [4, 5, 6], "mode": "lines"}],
        "layout": {"title": {"text": title}}
    })
    .to_string()
}

#[test]
fn first_push_creates_grimoire_chapter_and_plot() {
    let conn = setup();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();

    let plot = repo
        .upsert_plot(&PlotKey::new("g1", "ch1", "p1"), &figure("first"))
        .unwrap();

    assert_eq!(plot.grimoire_name, "g1");
    assert_eq!(plot.chapter_name, "ch1");
    assert_eq!(plot.name, "p1");
    assert_eq!(plot.sort_order, 0);
    assert!(plot.created_at > 0);
    assert_eq!(count(&conn, "grimoires"), 1);
    assert_eq!(count(&conn, "chapters"), 1);
    assert_eq!(count(&conn, "plots"), 1);
}

#[test]
fn second_push_with_same_key_overwrites_in_place() {
    let conn = setup();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();
    let key = PlotKey::new("g1", "ch1", "p1");

    let first = repo.upsert_plot(&key, &figure("first")).unwrap();
    let second = repo.upsert_plot(&key, &figure("second")).unwrap();

    let matching: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM plots
             WHERE grimoire_name = 'g1' AND chapter_name = 'ch1' AND name = 'p1';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(matching, 1);
    assert_eq!(second.sort_order, first.sort_order);
    assert!(second.created_at >= first.created_at);

    let stored = repo.get_plot(&key).unwrap().unwrap();
    let parsed: Value = serde_json::from_str(&stored.json_data).unwrap();
    assert_eq!(parsed["layout"]["title"]["text"], "second");
}

#[test]
fn payload_is_stored_verbatim() {
    let conn = setup();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();
    let original = figure("verbatim");

    repo.upsert_plot(&PlotKey::new("g", "c", "p"), &original)
        .unwrap();
    let garbage = repo
        .upsert_plot(&PlotKey::new("g", "c", "not-json"), "{{ definitely not json")
        .unwrap();

    let stored = repo.get_plot(&PlotKey::new("g", "c", "p")).unwrap().unwrap();
    assert_eq!(stored.json_data, original);
    assert_eq!(
        serde_json::from_str::<Value>(&stored.json_data).unwrap(),
        serde_json::from_str::<Value>(&original).unwrap()
    );
    assert_eq!(garbage.json_data, "{{ definitely not json");
}

#[test]
fn two_plots_in_one_chapter_are_listed_in_push_order() {
    let conn = setup();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();

    repo.upsert_plot(&PlotKey::new("g", "c", "zeta"), &figure("z"))
        .unwrap();
    repo.upsert_plot(&PlotKey::new("g", "c", "alpha"), &figure("a"))
        .unwrap();
    repo.upsert_plot(&PlotKey::new("g", "c", "zeta"), &figure("z2"))
        .unwrap();

    let plots = repo
        .list_plots_in_chapter(&ChapterKey::new("g", "c"))
        .unwrap();
    let names: Vec<&str> = plots.iter().map(|plot| plot.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha"]);
    assert_eq!(count(&conn, "chapters"), 1);
}

#[test]
fn chapters_and_plot_names_are_scoped_to_their_parent() {
    let conn = setup();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();

    repo.upsert_plot(&PlotKey::new("g", "train", "loss"), &figure("train"))
        .unwrap();
    repo.upsert_plot(&PlotKey::new("g", "eval", "loss"), &figure("eval"))
        .unwrap();
    repo.upsert_plot(&PlotKey::new("other", "train", "loss"), &figure("other"))
        .unwrap();

    assert_eq!(count(&conn, "grimoires"), 2);
    assert_eq!(count(&conn, "chapters"), 3);
    assert_eq!(count(&conn, "plots"), 3);

    let grimoires = repo.list_grimoires().unwrap();
    assert_eq!(grimoires.len(), 2);
    assert_eq!(grimoires[0].name, "g");
    let chapter_names: Vec<&str> = grimoires[0]
        .chapters
        .iter()
        .map(|chapter| chapter.name.as_str())
        .collect();
    assert_eq!(chapter_names, vec!["train", "eval"]);
    assert_eq!(grimoires[0].plot_count(), 2);
    assert_eq!(grimoires[1].name, "other");
    assert_eq!(grimoires[1].chapters[0].plots[0].name, "loss");
}

#[test]
fn get_grimoire_returns_nested_tree_or_none() {
    let conn = setup();
    let repo = SqlitePlotRepository::try_new(&conn).unwrap();
    repo.upsert_plot(&PlotKey::new("g", "c1", "p1"), &figure("1"))
        .unwrap();
    repo.upsert_plot(&PlotKey::new("g", "c2", "p2"), &figure("2"))
        .unwrap();
    repo.upsert_plot(&PlotKey::new("h", "c1", "p1"), &figure("3"))
        .unwrap();

    let grimoire = repo.get_grimoire("g").unwrap().unwrap();
    assert_eq!(grimoire.chapters.len(), 2);
    assert_eq!(grimoire.chapters[1].plots[0].name, "p2");
    assert!(repo.get_grimoire("missing").unwrap().is_none());
}

#[test]
fn service_rejects_empty_names_before_storage() {
    let conn = setup();
    let service = PlotService::new(SqlitePlotRepository::try_new(&conn).unwrap());

    let err = service
        .upsert_plot(&PlotKey::new("g", "", "p"), "{}")
        .unwrap_err();
    assert!(matches!(err, PlotServiceError::InvalidName(ref e) if e.field == "chapter_name"));
    assert!(!err.is_transient());
    assert_eq!(count(&conn, "grimoires"), 0);
}

#[test]
fn with_plot_service_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plots.db");
    let key = PlotKey::new("g1", "ch1", "p1");

    let plot = with_plot_service(&path, |service| service.upsert_plot(&key, "{}")).unwrap();
    assert_eq!(plot.name, "p1");

    let loaded = with_plot_service(&path, |service| service.get_plot(&key)).unwrap();
    assert_eq!(loaded, Some(plot));
}

#[test]
fn get_chapter_loads_only_that_chapter_with_its_plots() {
    let conn = setup();
    let service = PlotService::new(SqlitePlotRepository::try_new(&conn).unwrap());
    service
        .upsert_plot(&PlotKey::new("g", "c1", "first"), &figure("a"))
        .unwrap();
    service
        .upsert_plot(&PlotKey::new("g", "c1", "second"), &figure("b"))
        .unwrap();
    service
        .upsert_plot(&PlotKey::new("g", "c2", "other"), &figure("c"))
        .unwrap();

    let chapter = service
        .get_chapter(&ChapterKey::new("g", "c1"))
        .unwrap()
        .expect("chapter exists");
    assert_eq!(chapter.name, "c1");
    let names: Vec<_> = chapter.plots.iter().map(|plot| plot.name.as_str()).collect();
    assert_eq!(names, ["first", "second"]);

    assert!(service
        .get_chapter(&ChapterKey::new("g", "missing"))
        .unwrap()
        .is_none());
    assert!(service
        .get_chapter(&ChapterKey::new("nope", "c1"))
        .unwrap()
        .is_none());
}
