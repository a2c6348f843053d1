#![allow(dead_code)]

use std::path::PathBuf;

use rusqlite::Connection;
use tempfile::TempDir;

const FIXTURE_SQL: &str = r"
CREATE TABLE phrases (
  id INTEGER PRIMARY KEY,
  line TEXT NOT NULL,
  category_id TEXT NOT NULL
);

INSERT INTO phrases (id, line, category_id) VALUES
  (1, 'Hello, %nick%!', '3'),
  (2, '<Hi|Hey> there{, friend}.', '3'),
  (3, 'Goodbye, %name%.', '5'),
  (4, '%mention%, you rang?', '6,7'),
  (5, '[ACT] yawns in %channel%', '8'),
  (6, '[upper]shutting down[/upper]. <Bye|Later>!', '9'),
  (7, 'Broken <line', '12');

CREATE TABLE quotes (
  id INTEGER PRIMARY KEY,
  line TEXT NOT NULL,
  type TEXT NOT NULL,
  speaker TEXT NOT NULL
);

INSERT INTO quotes (id, line, type, speaker) VALUES
  (1, 'Hawke.', 'nickname', 'Varric'),
  (2, 'Bianca would never.', 'quip', 'Varric'),
  (3, 'Hello there.', 'greeting', 'Varric'),
  (4, 'Greetings.', 'greeting', 'Cassandra'),
  (5, 'Ugh.', 'quip', 'Cassandra'),
  (6, 'Sunshine.', 'nickname', 'Varric'),
  (7, 'Seeker.', 'nickname', 'Varric');

CREATE TABLE fillers (
  id INTEGER PRIMARY KEY,
  line TEXT NOT NULL,
  category_id TEXT NOT NULL
);

INSERT INTO fillers (id, line, category_id) VALUES
  (1, '...', '1');
";

/// A throwaway SQLite file with the fixture tables. Keep the `TempDir`
/// alive for as long as the path is used.
pub fn phrase_db() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("phrases.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(FIXTURE_SQL).unwrap();
    (dir, path)
}

pub fn sorted(mut ids: Vec<phrase_engine::schema::phrase::PhraseId>) -> Vec<i64> {
    ids.sort();
    ids.into_iter().map(|id| id.0).collect()
}
