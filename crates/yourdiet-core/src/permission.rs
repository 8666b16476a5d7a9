//! The permission catalog: which actions each role may perform.
//!
//! Permission sets are static and ordered. Anything that is not a known role
//! gets no permissions at all.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// A named capability granted to a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
  ListDiet,
  CreateDiet,
  UpdateDiet,
  UploadFile,
}

impl Permission {
  pub fn as_str(self) -> &'static str {
    match self {
      Permission::ListDiet => "list_diet",
      Permission::CreateDiet => "create_diet",
      Permission::UpdateDiet => "update_diet",
      Permission::UploadFile => "upload_file",
    }
  }
}

impl fmt::Display for Permission {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// The role a user registers with. Immutable after registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
  Default,
  Nutritionist,
}

const DEFAULT_PERMISSIONS: &[Permission] = &[Permission::ListDiet];

const NUTRITIONIST_PERMISSIONS: &[Permission] = &[
  Permission::ListDiet,
  Permission::CreateDiet,
  Permission::UpdateDiet,
  Permission::UploadFile,
];

impl Role {
  /// The fixed permission set granted to this role.
  pub fn permissions(self) -> &'static [Permission] {
    match self {
      Role::Default => DEFAULT_PERMISSIONS,
      Role::Nutritionist => NUTRITIONIST_PERMISSIONS,
    }
  }

  pub fn as_str(self) -> &'static str {
    match self {
      Role::Default => "DEFAULT",
      Role::Nutritionist => "NUTRITIONIST",
    }
  }
}

impl fmt::Display for Role {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for Role {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "DEFAULT" => Ok(Role::Default),
      "NUTRITIONIST" => Ok(Role::Nutritionist),
      other => Err(Error::UnknownRole(other.to_owned())),
    }
  }
}

/// Permission set for a role given by name. Unknown roles fail closed.
pub fn permissions_for(role: &str) -> &'static [Permission] {
  role.parse::<Role>().map(Role::permissions).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn default_role_can_only_list() {
    assert_eq!(permissions_for("DEFAULT"), &[Permission::ListDiet]);
  }

  #[test]
  fn nutritionist_has_full_ordered_set() {
    assert_eq!(
      permissions_for("NUTRITIONIST"),
      &[
        Permission::ListDiet,
        Permission::CreateDiet,
        Permission::UpdateDiet,
        Permission::UploadFile,
      ]
    );
  }

  #[test]
  fn unknown_roles_get_nothing() {
    for role in ["", "ADMIN", "default", "nutritionist", "NUTRITIONIST "] {
      assert!(permissions_for(role).is_empty(), "role {role:?}");
    }
  }

  #[test]
  fn wire_names() {
    assert_eq!(
      serde_json::to_string(&Permission::CreateDiet).unwrap(),
      "\"create_diet\""
    );
    assert_eq!(
      serde_json::to_string(&Role::Nutritionist).unwrap(),
      "\"NUTRITIONIST\""
    );
    assert_eq!(Role::Default.to_string(), "DEFAULT");
  }
}
