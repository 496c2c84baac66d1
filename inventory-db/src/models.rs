use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ObjectId;

/// Everything a caller supplies for a server record.
///
/// Create and update both carry the full set; there is no partial patch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerFields {
  pub project_name: String,
  #[serde(rename = "project_purpose")]
  pub purpose: String,
  pub environment: String,
  pub vm_name: String,
  pub cpu: i64,
  pub ram: i64,
  pub storage: i64,
  pub total_cost: f64,
  pub os_version: String,
  pub ip: String,
  pub hostname: String,
  /// Login username on the VM
  pub username: String,
  /// Argon2 PHC string of the VM login password, never serialized
  #[serde(skip_serializing)]
  pub password_hash: String,
  pub server_no: String,
  pub created_by: String,
  pub remarks: Option<String>,
  pub delete_date: Option<DateTime<Utc>>,
}

/// A stored server record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Server {
  pub id: ObjectId,
  #[serde(flatten)]
  pub fields: ServerFields,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// A stored user, including the password hash.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
  pub id: ObjectId,
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub role: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

/// Public view of a user, safe to hand to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
  pub id: ObjectId,
  pub username: String,
  pub email: String,
  pub role: Option<String>,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
  fn from(record: UserRecord) -> Self {
    Self {
      id: record.id,
      username: record.username,
      email: record.email,
      role: record.role,
      created_at: record.created_at,
      updated_at: record.updated_at,
    }
  }
}

/// Fields needed to insert a user.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email: String,
  pub password_hash: String,
  pub role: Option<String>,
}
