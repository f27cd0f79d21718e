use prodvec::catalog::Product;
use prodvec::db;
use rusqlite::Connection;

fn names(conn: &Connection, kind: &str) -> Vec<String> {
    conn.prepare("SELECT name FROM sqlite_master WHERE type = ?1 ORDER BY name")
        .unwrap()
        .query_map([kind], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

#[test]
fn open_database_creates_schema_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("catalog.db");
    let conn = db::open_database(&path).unwrap();
    assert!(path.exists(), "database file and parent dirs are created");

    let tables = names(&conn, "table");
    assert!(tables.contains(&"products".to_string()), "products table missing");
    assert!(
        tables.contains(&"product_attributes".to_string()),
        "product_attributes table missing"
    );
    assert!(tables.contains(&"schema_meta".to_string()), "schema_meta table missing");

    let indexes = names(&conn, "index");
    assert!(indexes.contains(&"idx_attributes_product_code".to_string()));

    assert_eq!(
        db::migrations::get_schema_version(&conn).unwrap(),
        db::migrations::CURRENT_SCHEMA_VERSION
    );

    let journal: String = conn
        .query_row("PRAGMA journal_mode", [], |r| r.get(0))
        .unwrap();
    assert_eq!(journal.to_lowercase(), "wal");
}

#[test]
fn reopening_keeps_catalog_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("catalog.db");
    {
        let conn = db::open_database(&path).unwrap();
        db::products::upsert_product(&conn, &Product::new("1", "SH-01", "Red Shoe")).unwrap();
        db::products::insert_attribute(&conn, "SH-01", "color", "red").unwrap();
    }

    let conn = db::open_database(&path).unwrap();
    let batch = db::products::load_batch(&conn, &[]).unwrap();
    assert_eq!(batch.products.len(), 1);
    assert_eq!(batch.attributes_for(&batch.products[0]).len(), 1);
}

#[test]
fn attributes_must_reference_known_products() {
    let conn = db::open_memory_database().unwrap();
    let result = db::products::insert_attribute(&conn, "MISSING", "color", "red");
    assert!(result.is_err(), "foreign key should reject unknown product code");
}

#[test]
fn product_codes_are_unique() {
    let conn = db::open_memory_database().unwrap();
    db::products::upsert_product(&conn, &Product::new("1", "SH-01", "Red Shoe")).unwrap();
    let duplicate = db::products::upsert_product(&conn, &Product::new("2", "SH-01", "Other Shoe"));
    assert!(duplicate.is_err(), "UNIQUE constraint on code");
}
