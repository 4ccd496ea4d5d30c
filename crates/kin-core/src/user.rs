//! Accounts and the ownership context threaded through every store call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;

/// The authenticated account a request acts on behalf of.
///
/// Every person and family-tree operation takes an `Owner` explicitly; there
/// is no ambient "current user".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Owner(UserId);

impl Owner {
  pub fn new(user_id: UserId) -> Self { Self(user_id) }

  pub fn user_id(self) -> UserId { self.0 }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub id:         UserId,
  pub username:   String,
  /// Contact address; empty when none was given.
  pub email:      String,
  pub created_at: DateTime<Utc>,
}

impl User {
  pub fn owner(&self) -> Owner { Owner::new(self.id) }
}

/// Input for registering an account.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
  pub username:      String,
  pub email:         String,
  /// An argon2 PHC string, never the plain password.
  pub password_hash: String,
}

impl NewUser {
  pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
    Self {
      username: username.into(),
      password_hash: password_hash.into(),
      ..Default::default()
    }
  }
}

/// A user together with the stored argon2 PHC string. Never serialised.
#[derive(Debug, Clone)]
pub struct Credentials {
  pub user:          User,
  pub password_hash: String,
}
