//! Server and playlist registries.
//!
//! Independent of phrase lookup: each registry owns its tables in the same
//! SQLite file and bootstraps them on open.

use std::path::{Path, PathBuf};

use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::storage::phrase_store::StoreError;

const CREATE_SERVERS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS servers (
  id TEXT PRIMARY KEY,
  name TEXT NOT NULL
);
";

const CREATE_PLAYLISTS_SQL: &str = r"
CREATE TABLE IF NOT EXISTS songs (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  url TEXT NOT NULL UNIQUE
);

CREATE TABLE IF NOT EXISTS playlists (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  name TEXT NOT NULL,
  owner_id TEXT NOT NULL,
  UNIQUE(name, owner_id)
);

CREATE TABLE IF NOT EXISTS playlist_songs (
  playlist_id INTEGER NOT NULL,
  song_id INTEGER NOT NULL,
  position INTEGER NOT NULL,
  PRIMARY KEY (playlist_id, position),
  FOREIGN KEY (playlist_id) REFERENCES playlists(id),
  FOREIGN KEY (song_id) REFERENCES songs(id)
);
";

fn open(path: &Path) -> Result<Connection, StoreError> {
    let conn = Connection::open(path).map_err(StoreError::Connection)?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(StoreError::Connection)?;
    Ok(conn)
}

fn query_err(statement: &'static str) -> impl FnOnce(rusqlite::Error) -> StoreError {
    move |source| StoreError::from_query(statement, source)
}

/// A chat server the bot is a member of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    pub name: String,
}

/// Servers the bot knows about.
#[derive(Debug, Clone)]
pub struct ServerRegistry {
    path: PathBuf,
}

impl ServerRegistry {
    /// Open the registry, creating its table if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        open(&path)?
            .execute_batch(CREATE_SERVERS_SQL)
            .map_err(query_err(CREATE_SERVERS_SQL))?;
        info!("Server registry ready at {}", path.display());
        Ok(Self { path })
    }

    /// Insert `server`, or rename it if the id is already known.
    pub fn add_server(&self, server: &Server) -> Result<(), StoreError> {
        const SQL: &str = "INSERT INTO servers (id, name) VALUES (?1, ?2)
                           ON CONFLICT(id) DO UPDATE SET name = excluded.name";
        open(&self.path)?
            .execute(SQL, params![server.id, server.name])
            .map_err(query_err(SQL))?;
        debug!("add_server(): {} ({})", server.name, server.id);
        Ok(())
    }

    /// Returns whether a server was removed.
    pub fn remove_server(&self, id: &str) -> Result<bool, StoreError> {
        const SQL: &str = "DELETE FROM servers WHERE id = ?1";
        let removed = open(&self.path)?
            .execute(SQL, params![id])
            .map_err(query_err(SQL))?;
        debug!("remove_server(): {} ({} rows)", id, removed);
        Ok(removed > 0)
    }

    pub fn servers(&self) -> Result<Vec<Server>, StoreError> {
        const SQL: &str = "SELECT id, name FROM servers ORDER BY name";
        let conn = open(&self.path)?;
        let mut stmt = conn.prepare(SQL).map_err(query_err(SQL))?;
        let servers = stmt
            .query_map([], |row| {
                Ok(Server {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(query_err(SQL))?;
        Ok(servers)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SongId(pub i64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlaylistId(pub i64);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub id: SongId,
    pub url: String,
}

/// Songs and per-user playlists. A playlist belongs to one owner across
/// every server.
#[derive(Debug, Clone)]
pub struct PlaylistRegistry {
    path: PathBuf,
}

impl PlaylistRegistry {
    /// Open the registry, creating its tables if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        open(&path)?
            .execute_batch(CREATE_PLAYLISTS_SQL)
            .map_err(query_err(CREATE_PLAYLISTS_SQL))?;
        info!("Playlist registry ready at {}", path.display());
        Ok(Self { path })
    }

    /// Adds a song by URL; an already known URL returns its existing id.
    pub fn add_song(&self, url: &str) -> Result<SongId, StoreError> {
        const INSERT: &str = "INSERT OR IGNORE INTO songs (url) VALUES (?1)";
        const SELECT: &str = "SELECT id FROM songs WHERE url = ?1";
        let conn = open(&self.path)?;
        conn.execute(INSERT, params![url]).map_err(query_err(INSERT))?;
        let id: i64 = conn
            .query_row(SELECT, params![url], |row| row.get(0))
            .map_err(query_err(SELECT))?;
        Ok(SongId(id))
    }

    /// Adds a playlist for `owner_id`; an existing name for that owner
    /// returns its existing id.
    pub fn add_playlist(&self, name: &str, owner_id: &str) -> Result<PlaylistId, StoreError> {
        const INSERT: &str = "INSERT OR IGNORE INTO playlists (name, owner_id) VALUES (?1, ?2)";
        const SELECT: &str = "SELECT id FROM playlists WHERE name = ?1 AND owner_id = ?2";
        let conn = open(&self.path)?;
        conn.execute(INSERT, params![name, owner_id])
            .map_err(query_err(INSERT))?;
        let id: i64 = conn
            .query_row(SELECT, params![name, owner_id], |row| row.get(0))
            .map_err(query_err(SELECT))?;
        debug!("add_playlist(): '{}' for {} -> {}", name, owner_id, id);
        Ok(PlaylistId(id))
    }

    /// Appends `song` to `playlist` and returns its position (0-based).
    pub fn add_playlist_song(&self, song: SongId, playlist: PlaylistId) -> Result<u32, StoreError> {
        const NEXT: &str =
            "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_songs WHERE playlist_id = ?1";
        const INSERT: &str =
            "INSERT INTO playlist_songs (playlist_id, song_id, position) VALUES (?1, ?2, ?3)";
        let mut conn = open(&self.path)?;
        let tx = conn.transaction().map_err(StoreError::Connection)?;
        let position: u32 = tx
            .query_row(NEXT, params![playlist.0], |row| row.get(0))
            .map_err(query_err(NEXT))?;
        tx.execute(INSERT, params![playlist.0, song.0, position])
            .map_err(query_err(INSERT))?;
        tx.commit().map_err(StoreError::Connection)?;
        Ok(position)
    }

    /// Songs of `playlist` in order; `None` if the playlist does not exist.
    pub fn playlist_songs(&self, playlist: PlaylistId) -> Result<Option<Vec<Song>>, StoreError> {
        const EXISTS: &str = "SELECT 1 FROM playlists WHERE id = ?1";
        const SONGS: &str = "SELECT s.id, s.url FROM playlist_songs p
                             JOIN songs s ON s.id = p.song_id
                             WHERE p.playlist_id = ?1 ORDER BY p.position";
        let conn = open(&self.path)?;
        let exists: Option<i64> = conn
            .query_row(EXISTS, params![playlist.0], |row| row.get(0))
            .optional()
            .map_err(query_err(EXISTS))?;
        if exists.is_none() {
            return Ok(None);
        }

        let mut stmt = conn.prepare(SONGS).map_err(query_err(SONGS))?;
        let songs = stmt
            .query_map(params![playlist.0], |row| {
                Ok(Song {
                    id: SongId(row.get(0)?),
                    url: row.get(1)?,
                })
            })
            .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
            .map_err(query_err(SONGS))?;
        Ok(Some(songs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_add_rename_remove() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ServerRegistry::open(dir.path().join("bot.sqlite3")).unwrap();

        let lounge = Server {
            id: "100".to_string(),
            name: "Lounge".to_string(),
        };
        registry.add_server(&lounge).unwrap();
        registry
            .add_server(&Server {
                id: "100".to_string(),
                name: "The Lounge".to_string(),
            })
            .unwrap();

        let servers = registry.servers().unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].name, "The Lounge");

        assert!(registry.remove_server("100").unwrap());
        assert!(!registry.remove_server("100").unwrap());
        assert!(registry.servers().unwrap().is_empty());
    }

    #[test]
    fn reopen_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bot.sqlite3");
        ServerRegistry::open(&path).unwrap();
        PlaylistRegistry::open(&path).unwrap();
        assert!(ServerRegistry::open(&path).is_ok());
        assert!(PlaylistRegistry::open(&path).is_ok());
    }

    #[test]
    fn playlist_flow() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PlaylistRegistry::open(dir.path().join("bot.sqlite3")).unwrap();

        let a = registry.add_song("https://example.com/a").unwrap();
        let b = registry.add_song("https://example.com/b").unwrap();
        assert_eq!(registry.add_song("https://example.com/a").unwrap(), a);

        let mine = registry.add_playlist("chill", "owner-1").unwrap();
        let theirs = registry.add_playlist("chill", "owner-2").unwrap();
        assert_ne!(mine, theirs);
        assert_eq!(registry.add_playlist("chill", "owner-1").unwrap(), mine);

        assert_eq!(registry.add_playlist_song(b, mine).unwrap(), 0);
        assert_eq!(registry.add_playlist_song(a, mine).unwrap(), 1);
        assert_eq!(registry.add_playlist_song(b, mine).unwrap(), 2);

        let songs = registry.playlist_songs(mine).unwrap().unwrap();
        let urls: Vec<_> = songs.iter().map(|s| s.url.as_str()).collect();
        assert_eq!(
            urls,
            vec!["https://example.com/b", "https://example.com/a", "https://example.com/b"]
        );
        assert_eq!(registry.playlist_songs(theirs).unwrap().unwrap().len(), 0);
        assert!(registry.playlist_songs(PlaylistId(999)).unwrap().is_none());
    }

    #[test]
    fn unknown_song_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PlaylistRegistry::open(dir.path().join("bot.sqlite3")).unwrap();
        let playlist = registry.add_playlist("mix", "owner").unwrap();
        let err = registry.add_playlist_song(SongId(42), playlist).unwrap_err();
        assert!(matches!(err, StoreError::Query { .. }));
    }
}
