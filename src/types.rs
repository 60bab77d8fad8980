use std::fmt;

use serde::{Deserialize, Serialize};

/// Items returned per page by the list endpoints.
pub const PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[repr(transparent)]
pub struct AdminID(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[repr(transparent)]
pub struct VehicleID(pub u64);

/// Login identifier of an administrator (their email address).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[repr(transparent)]
pub struct Identifier(pub String);

/// PHC-encoded argon2 hash, salt and cost parameters included.
#[derive(Clone, PartialEq, Eq, Deserialize, Serialize)]
#[repr(transparent)]
pub struct HashedPassword(pub String);

impl fmt::Debug for HashedPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("HashedPassword(..)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub enum Role {
    Adm,
    Editor,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Adm => "Adm",
            Role::Editor => "Editor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: AdminID,
    pub identifier: Identifier,
    pub hashed_password: HashedPassword,
    pub role: Role,
}

/// A credential that has not been stored yet; the store assigns the id.
#[derive(Debug, Clone)]
pub struct NewCredential {
    pub identifier: Identifier,
    pub hashed_password: HashedPassword,
    pub role: Role,
}

/// Identity extracted from a validated token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub subject: Identifier,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Vehicle {
    pub id: VehicleID,
    pub name: String,
    pub brand: String,
    pub year: i32,
}

/// Vehicle fields as submitted by clients, before an id exists.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct VehicleDetails {
    pub name: String,
    pub brand: String,
    pub year: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VehicleFilter {
    pub name: Option<String>,
    pub brand: Option<String>,
}

impl VehicleFilter {
    /// Case-insensitive substring match on every filter that is set.
    pub fn matches(&self, vehicle: &Vehicle) -> bool {
        fn contains(haystack: &str, needle: &Option<String>) -> bool {
            match needle {
                Some(needle) if !needle.is_empty() => haystack
                    .to_lowercase()
                    .contains(&needle.to_lowercase()),
                _ => true,
            }
        }

        contains(&vehicle.name, &self.name) && contains(&vehicle.brand, &self.brand)
    }
}

/// 1-based page selector. Without a page, lists are returned whole.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Pagination {
    pub page: Option<u32>,
}

impl Pagination {
    pub fn page(page: u32) -> Self {
        Self { page: Some(page) }
    }

    /// Returns `(skip, take)`, or `None` when every item should be returned.
    /// Pages below 1 are treated as the first page.
    pub fn bounds(&self) -> Option<(usize, usize)> {
        self.page
            .map(|page| ((page.max(1) as usize - 1) * PAGE_SIZE, PAGE_SIZE))
    }

    pub fn apply<T>(&self, items: impl Iterator<Item = T>) -> Vec<T> {
        match self.bounds() {
            Some((skip, take)) => items.skip(skip).take(take).collect(),
            None => items.collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    #[serde(rename = "Email")]
    pub(crate) email: String,
    #[serde(rename = "Perfil")]
    pub(crate) profile: Role,
    #[serde(rename = "http://schemas.microsoft.com/ws/2008/06/identity/claims/role")]
    pub(crate) role: Role,
    pub(crate) iat: u64,
    pub(crate) exp: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vehicle(name: &str, brand: &str) -> Vehicle {
        Vehicle {
            id: VehicleID(1),
            name: name.into(),
            brand: brand.into(),
            year: 2020,
        }
    }

    #[test]
    fn pagination_skips_whole_pages() {
        let items: Vec<u32> = (0..25).collect();

        assert_eq!(Pagination::page(1).apply(items.iter().copied()), (0..10).collect::<Vec<_>>());
        assert_eq!(Pagination::page(3).apply(items.iter().copied()), (20..25).collect::<Vec<_>>());
        assert!(Pagination::page(4).apply(items.iter().copied()).is_empty());
        assert_eq!(Pagination::default().apply(items.iter().copied()).len(), 25);
    }

    #[test]
    fn page_zero_is_first_page() {
        assert_eq!(Pagination::page(0).bounds(), Some((0, PAGE_SIZE)));
    }

    #[test]
    fn vehicle_filter_ignores_case() {
        let filter = VehicleFilter {
            name: Some("UNO".into()),
            brand: None,
        };

        assert!(filter.matches(&vehicle("Fiat Uno", "Fiat")));
        assert!(!filter.matches(&vehicle("Gol", "Volkswagen")));
        assert!(VehicleFilter::default().matches(&vehicle("Gol", "Volkswagen")));
    }

    #[test]
    fn role_serializes_by_name() {
        assert_eq!(serde_json::to_string(&Role::Adm).unwrap(), "\"Adm\"");
        assert_eq!(
            serde_json::from_str::<Role>("\"Editor\"").unwrap(),
            Role::Editor
        );
    }
}
