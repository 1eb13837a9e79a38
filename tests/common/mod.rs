//! Shared fixtures for integration tests

#![allow(dead_code)]

use rusqlite::Connection;
use tempfile::TempDir;

/// Rows stored in the demo database
pub const DEMO_ROWS: [(i64, &str, i64); 3] = [(1, "apple", 3), (2, "pear", 5), (3, "plum", 7)];

/// Build the demo database image: two 2048-byte pages, 4096 bytes total
pub fn demo_image() -> Vec<u8> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("demo.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "PRAGMA page_size = 2048;
         CREATE TABLE items (id INTEGER PRIMARY KEY, name TEXT NOT NULL, qty INTEGER NOT NULL);",
    )
    .unwrap();
    for (id, name, qty) in DEMO_ROWS {
        conn.execute(
            "INSERT INTO items (id, name, qty) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, name, qty],
        )
        .unwrap();
    }
    conn.close().unwrap();

    std::fs::read(&path).unwrap()
}

/// Database image with `count` rows in `numbers`, spanning many pages
pub fn numbers_image(count: i64) -> Vec<u8> {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("numbers.db");

    let mut conn = Connection::open(&path).unwrap();
    conn.execute_batch("CREATE TABLE numbers (n INTEGER PRIMARY KEY, label TEXT NOT NULL);")
        .unwrap();
    let tx = conn.transaction().unwrap();
    for n in 0..count {
        tx.execute(
            "INSERT INTO numbers (n, label) VALUES (?1, ?2)",
            rusqlite::params![n, format!("number-{n:06}")],
        )
        .unwrap();
    }
    tx.commit().unwrap();
    conn.close().unwrap();

    std::fs::read(&path).unwrap()
}

/// Rows of `items`, ordered by id
pub fn demo_rows(conn: &Connection) -> Vec<(i64, String, i64)> {
    let mut stmt = conn
        .prepare("SELECT id, name, qty FROM items ORDER BY id")
        .unwrap();
    stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap()
}

pub fn expected_rows() -> Vec<(i64, String, i64)> {
    DEMO_ROWS
        .iter()
        .map(|&(id, name, qty)| (id, name.to_string(), qty))
        .collect()
}
