use std::collections::BTreeSet;

use crate::contract::model::User;
use crate::domain::repo::UserRecord;
use crate::infra::storage::entity::Model as UserEntity;

pub fn join_roles(roles: &BTreeSet<String>) -> String {
    roles.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

pub fn split_roles(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_owned)
        .collect()
}

impl From<UserEntity> for UserRecord {
    fn from(e: UserEntity) -> Self {
        let user = User {
            id: e.id,
            roles: split_roles(&e.roles),
            username: e.username,
            email: e.email,
            created_at: e.created_at,
            updated_at: e.updated_at,
            deleted_at: e.deleted_at,
        };
        Self {
            user,
            password_hash: e.password_hash,
        }
    }
}

impl From<UserEntity> for User {
    fn from(e: UserEntity) -> Self {
        UserRecord::from(e).user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_survive_storage_form() {
        let roles = BTreeSet::from(["user".to_string(), "admin".to_string()]);
        let raw = join_roles(&roles);
        assert_eq!(raw, "admin,user");
        assert_eq!(split_roles(&raw), roles);
        assert!(split_roles("").is_empty());
        assert_eq!(split_roles(" admin ,,").len(), 1);
    }
}
