mod error;
mod models;
mod object_id;

pub use error::{DbError, Result};
pub use models::{NewUser, Server, ServerFields, User, UserRecord};
pub use object_id::{ObjectId, ParseObjectIdError};

use chrono::{DateTime, Utc};
use std::path::Path;
use tokio_rusqlite::Connection;
use tokio_rusqlite::rusqlite::{self, OptionalExtension, Row, params};
use tracing::{debug, info};

const SERVER_COLUMNS: &str = "id, project_name, project_purpose, environment, vm_name, cpu, ram, \
  storage, total_cost, os_version, ip, hostname, username, password_hash, server_no, created_by, \
  remarks, delete_date, created_at, updated_at";

const USER_COLUMNS: &str = "id, username, email, password_hash, role, created_at, updated_at";

/// Shared handle to the inventory store.
///
/// Cloning is cheap; every clone talks to the same connection.
#[derive(Clone)]
pub struct Database {
  conn: Connection,
}

impl Database {
  /// Open or create a database at the given path.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = Connection::open(path).await.map_err(DbError::Sqlite)?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Create an in-memory database (useful for testing).
  pub async fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .await
      .map_err(DbError::Sqlite)?;
    let db = Self { conn };
    db.initialize().await?;
    Ok(db)
  }

  /// Initialize the `servers` and `users` collections.
  async fn initialize(&self) -> Result<()> {
    self.conn
            .call(|conn| {
                conn.pragma_update(None, "journal_mode", "WAL")?;

                conn.execute_batch(
                    r#"
                    CREATE TABLE IF NOT EXISTS servers (
                        id TEXT PRIMARY KEY,
                        project_name TEXT NOT NULL,
                        project_purpose TEXT NOT NULL,
                        environment TEXT NOT NULL,
                        vm_name TEXT NOT NULL,
                        cpu INTEGER NOT NULL,
                        ram INTEGER NOT NULL,
                        storage INTEGER NOT NULL,
                        total_cost REAL NOT NULL,
                        os_version TEXT NOT NULL,
                        ip TEXT NOT NULL,
                        hostname TEXT NOT NULL,
                        username TEXT NOT NULL,
                        password_hash TEXT NOT NULL,
                        server_no TEXT NOT NULL,
                        created_by TEXT NOT NULL,
                        remarks TEXT,
                        delete_date INTEGER,
                        created_at INTEGER NOT NULL,
                        updated_at INTEGER NOT NULL
                    );

                    CREATE TABLE IF NOT EXISTS users (
                        id TEXT PRIMARY KEY,
                        username TEXT NOT NULL UNIQUE,
                        email TEXT NOT NULL,
                        password_hash TEXT NOT NULL,
                        role TEXT,
                        created_at INTEGER NOT NULL,
                        updated_at INTEGER NOT NULL
                    );

                    -- Listing is always newest first
                    CREATE INDEX IF NOT EXISTS idx_servers_created ON servers(created_at);
                    "#,
                )?;
                Ok(())
            })
            .await?;

    info!("database initialized");
    Ok(())
  }

  // ========================================================================
  // Servers
  // ========================================================================

  /// Insert a server record, assigning it a fresh id. Both timestamps are `now`.
  pub async fn insert_server(&self, fields: ServerFields, now: DateTime<Utc>) -> Result<Server> {
    let now = truncate(now);
    let server = Server {
      id: ObjectId::new(),
      fields: ServerFields {
        delete_date: fields.delete_date.map(truncate),
        ..fields
      },
      created_at: now,
      updated_at: now,
    };

    let server = self
      .conn
      .call(move |conn| {
        let f = &server.fields;
        conn
          .prepare_cached(&format!(
            "INSERT INTO servers ({SERVER_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)"
          ))?
          .execute(params![
            server.id,
            f.project_name,
            f.purpose,
            f.environment,
            f.vm_name,
            f.cpu,
            f.ram,
            f.storage,
            f.total_cost,
            f.os_version,
            f.ip,
            f.hostname,
            f.username,
            f.password_hash,
            f.server_no,
            f.created_by,
            f.remarks,
            f.delete_date.map(|d| d.timestamp_micros()),
            server.created_at.timestamp_micros(),
            server.updated_at.timestamp_micros(),
          ])?;
        Ok(server)
      })
      .await?;

    debug!(%server.id, %server.fields.hostname, "inserted server");
    Ok(server)
  }

  /// One page of servers, newest first.
  pub async fn list_servers(&self, skip: u64, limit: u64) -> Result<Vec<Server>> {
    let servers = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&format!(
          "SELECT {SERVER_COLUMNS} FROM servers \
           ORDER BY created_at DESC, rowid DESC LIMIT ?1 OFFSET ?2"
        ))?;

        let servers = stmt
          .query_map(params![limit, skip], server_from_row)?
          .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(servers)
      })
      .await?;

    Ok(servers)
  }

  /// Total number of stored servers.
  pub async fn count_servers(&self) -> Result<u64> {
    let count = self
      .conn
      .call(|conn| {
        let count: i64 = conn
          .prepare_cached("SELECT COUNT(*) FROM servers")?
          .query_row([], |row| row.get(0))?;
        Ok(count)
      })
      .await?;

    Ok(count as u64)
  }

  /// Get a server by id.
  /// Returns None if not found.
  pub async fn get_server(&self, id: ObjectId) -> Result<Option<Server>> {
    let server = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(&format!("SELECT {SERVER_COLUMNS} FROM servers WHERE id = ?1"))?
          .query_row(params![id], server_from_row)
          .optional()
      })
      .await?;

    Ok(server)
  }

  /// Overwrite every caller-supplied field of a server and bump `updated_at`.
  /// `id` and `created_at` are kept. Nothing is written if the id is unknown.
  pub async fn replace_server(
    &self,
    id: ObjectId,
    fields: ServerFields,
    now: DateTime<Utc>,
  ) -> Result<Server> {
    let now = truncate(now);
    let server = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let updated = tx
          .prepare_cached(
            "UPDATE servers SET project_name = ?2, project_purpose = ?3, environment = ?4, \
             vm_name = ?5, cpu = ?6, ram = ?7, storage = ?8, total_cost = ?9, os_version = ?10, \
             ip = ?11, hostname = ?12, username = ?13, password_hash = ?14, server_no = ?15, \
             created_by = ?16, remarks = ?17, delete_date = ?18, updated_at = ?19 \
             WHERE id = ?1",
          )?
          .execute(params![
            id,
            fields.project_name,
            fields.purpose,
            fields.environment,
            fields.vm_name,
            fields.cpu,
            fields.ram,
            fields.storage,
            fields.total_cost,
            fields.os_version,
            fields.ip,
            fields.hostname,
            fields.username,
            fields.password_hash,
            fields.server_no,
            fields.created_by,
            fields.remarks,
            fields.delete_date.map(|d| d.timestamp_micros()),
            now.timestamp_micros(),
          ])?;

        if updated == 0 {
          return Ok(Err(DbError::ServerNotFound));
        }

        let server = tx
          .prepare_cached(&format!("SELECT {SERVER_COLUMNS} FROM servers WHERE id = ?1"))?
          .query_row(params![id], server_from_row)?;

        tx.commit()?;
        Ok(Ok(server))
      })
      .await??;

    debug!(%server.id, "replaced server");
    Ok(server)
  }

  /// Delete a server by id.
  pub async fn delete_server(&self, id: ObjectId) -> Result<()> {
    let result = self
      .conn
      .call(move |conn| {
        let deleted = conn
          .prepare_cached("DELETE FROM servers WHERE id = ?1")?
          .execute(params![id])?;

        if deleted == 0 {
          return Ok(Err(DbError::ServerNotFound));
        }

        Ok(Ok(()))
      })
      .await??;

    debug!(%id, "deleted server");
    Ok(result)
  }

  // ========================================================================
  // Users
  // ========================================================================

  /// Create a user.
  /// Returns an error if the username is already taken.
  pub async fn create_user(&self, new_user: NewUser, now: DateTime<Utc>) -> Result<UserRecord> {
    let now = truncate(now);
    let user = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .prepare_cached("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?1)")?
          .query_row(params![&new_user.username], |row| row.get(0))?;

        if exists {
          return Ok(Err(DbError::UsernameTaken));
        }

        let user = UserRecord {
          id: ObjectId::new(),
          username: new_user.username,
          email: new_user.email,
          password_hash: new_user.password_hash,
          role: new_user.role,
          created_at: now,
          updated_at: now,
        };

        tx.prepare_cached(&format!(
          "INSERT INTO users ({USER_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"
        ))?
        .execute(params![
          user.id,
          user.username,
          user.email,
          user.password_hash,
          user.role,
          user.created_at.timestamp_micros(),
          user.updated_at.timestamp_micros(),
        ])?;

        tx.commit()?;
        Ok(Ok(user))
      })
      .await??;

    debug!(%user.id, %user.username, "created user");
    Ok(user)
  }

  /// Find a user by username.
  /// Returns None if not found.
  pub async fn find_user_by_username(&self, username: String) -> Result<Option<UserRecord>> {
    let user = self
      .conn
      .call(move |conn| {
        conn
          .prepare_cached(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"))?
          .query_row(params![&username], user_from_row)
          .optional()
      })
      .await?;

    Ok(user)
  }
}

/// Timestamps are persisted with microsecond precision.
fn truncate(ts: DateTime<Utc>) -> DateTime<Utc> {
  DateTime::from_timestamp_micros(ts.timestamp_micros()).unwrap_or(ts)
}

fn timestamp(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
  let micros: i64 = row.get(idx)?;
  DateTime::from_timestamp_micros(micros).ok_or(rusqlite::Error::IntegralValueOutOfRange(idx, micros))
}

fn server_from_row(row: &Row<'_>) -> rusqlite::Result<Server> {
  let delete_date = match row.get::<_, Option<i64>>(17)? {
    Some(_) => Some(timestamp(row, 17)?),
    None => None,
  };

  Ok(Server {
    id: row.get(0)?,
    fields: ServerFields {
      project_name: row.get(1)?,
      purpose: row.get(2)?,
      environment: row.get(3)?,
      vm_name: row.get(4)?,
      cpu: row.get(5)?,
      ram: row.get(6)?,
      storage: row.get(7)?,
      total_cost: row.get(8)?,
      os_version: row.get(9)?,
      ip: row.get(10)?,
      hostname: row.get(11)?,
      username: row.get(12)?,
      password_hash: row.get(13)?,
      server_no: row.get(14)?,
      created_by: row.get(15)?,
      remarks: row.get(16)?,
      delete_date,
    },
    created_at: timestamp(row, 18)?,
    updated_at: timestamp(row, 19)?,
  })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<UserRecord> {
  Ok(UserRecord {
    id: row.get(0)?,
    username: row.get(1)?,
    email: row.get(2)?,
    password_hash: row.get(3)?,
    role: row.get(4)?,
    created_at: timestamp(row, 5)?,
    updated_at: timestamp(row, 6)?,
  })
}
