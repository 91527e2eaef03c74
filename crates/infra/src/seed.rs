//! Startup seeding: sample location lookups and the bootstrap administrator.

use chrono::{DateTime, Utc};
use thiserror::Error;

use backoffice_auth::{PasswordError, Permissions, hash_password};
use backoffice_identity::{City, Country, Role, RoleInput, State, User, UserInput};

use crate::config::SeedAdmin;
use crate::error::StoreError;
use crate::store::BackofficeStore;

pub const ADMIN_ROLE_NAME: &str = "Administrator";

#[derive(Debug, Error)]
pub enum SeedError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),
}

/// Locations shipped with the in-memory store (mirrors the migration seed).
pub fn sample_locations() -> (Vec<Country>, Vec<State>, Vec<City>) {
    let countries = vec![
        Country { id: 1, name: "India".into() },
        Country { id: 2, name: "United States".into() },
        Country { id: 3, name: "United Kingdom".into() },
    ];
    let states = vec![
        State { id: 1, country_id: 1, name: "Gujarat".into() },
        State { id: 2, country_id: 1, name: "Maharashtra".into() },
        State { id: 3, country_id: 2, name: "California".into() },
        State { id: 4, country_id: 2, name: "New York".into() },
        State { id: 5, country_id: 3, name: "England".into() },
    ];
    let cities = vec![
        City { id: 1, state_id: 1, name: "Ahmedabad".into() },
        City { id: 2, state_id: 1, name: "Surat".into() },
        City { id: 3, state_id: 2, name: "Mumbai".into() },
        City { id: 4, state_id: 2, name: "Pune".into() },
        City { id: 5, state_id: 3, name: "San Francisco".into() },
        City { id: 6, state_id: 3, name: "Los Angeles".into() },
        City { id: 7, state_id: 4, name: "New York City".into() },
        City { id: 8, state_id: 5, name: "London".into() },
        City { id: 9, state_id: 5, name: "Manchester".into() },
    ];
    (countries, states, cities)
}

/// Ensure an all-permissions role and an administrator holding it exist.
///
/// Existing records are left untouched, so reruns are no-ops.
pub async fn seed_admin(
    store: &dyn BackofficeStore,
    admin: &SeedAdmin,
    now: DateTime<Utc>,
) -> Result<(), SeedError> {
    let role = match store.role_by_name(ADMIN_ROLE_NAME).await? {
        Some(role) => role,
        None => {
            let input = RoleInput {
                name: ADMIN_ROLE_NAME.into(),
                description: "Full access to every back-office area".into(),
                is_active: true,
                permissions: Permissions::all(),
            };
            let role = Role::create(&input, now);
            store.insert_role(&role).await?;
            tracing::info!(role_id = %role.id, "seeded administrator role");
            role
        }
    };

    if store.user_by_email(&admin.email).await?.is_some() {
        return Ok(());
    }

    let input = UserInput {
        full_name: "System Administrator".into(),
        email: admin.email.clone(),
        phone_number: None,
        date_of_birth: None,
        country_id: None,
        state_id: None,
        city_id: None,
        profile_image_url: None,
        is_active: true,
        password: None,
        role_ids: vec![role.id],
    };
    let user = User::create(&input, hash_password(&admin.password)?, now);
    store.insert_user(&user).await?;
    tracing::info!(user_id = %user.id, email = %user.email, "seeded administrator account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, RoleStore, UserStore};

    #[tokio::test]
    async fn seeding_twice_creates_one_admin() {
        let store = InMemoryStore::new();
        let admin = SeedAdmin {
            email: "root@example.com".into(),
            password: "Adm1n@pass".into(),
        };
        seed_admin(&store, &admin, Utc::now()).await.unwrap();
        seed_admin(&store, &admin, Utc::now()).await.unwrap();

        let user = store.user_by_email("root@example.com").await.unwrap().unwrap();
        let roles = store.roles_by_ids(&user.role_ids).await.unwrap();
        assert_eq!(roles.len(), 1);
        assert_eq!(roles[0].permissions, Permissions::all());
        assert!(backoffice_auth::verify_password("Adm1n@pass", &user.password_hash));
    }
}
