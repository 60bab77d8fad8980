//! Process-local storage backends. Contents are lost on restart.

use std::{collections::BTreeMap, error::Error};

use async_trait::async_trait;

use crate::{
    auth::CredentialStore,
    fleet::VehicleStore,
    types::{
        AdminID, CredentialRecord, Identifier, NewCredential, Pagination, Vehicle,
        VehicleDetails, VehicleFilter, VehicleID,
    },
};

#[derive(Default)]
pub struct InMemoryCredentialStore {
    next_id: u64,
    storage: BTreeMap<AdminID, CredentialRecord>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn find_credential_by_identifier(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<CredentialRecord>, Box<dyn Error + Send + Sync>> {
        Ok(self
            .storage
            .values()
            .find(|record| record.identifier == *identifier)
            .cloned())
    }

    async fn find_credential_by_id(
        &self,
        id: AdminID,
    ) -> Result<Option<CredentialRecord>, Box<dyn Error + Send + Sync>> {
        Ok(self.storage.get(&id).cloned())
    }

    async fn list_credentials(
        &self,
        pagination: Pagination,
    ) -> Result<Vec<CredentialRecord>, Box<dyn Error + Send + Sync>> {
        Ok(pagination.apply(self.storage.values().cloned()))
    }

    async fn persist(
        &mut self,
        credential: NewCredential,
    ) -> Result<CredentialRecord, Box<dyn Error + Send + Sync>> {
        self.next_id += 1;
        let record = CredentialRecord {
            id: AdminID(self.next_id),
            identifier: credential.identifier,
            hashed_password: credential.hashed_password,
            role: credential.role,
        };
        self.storage.insert(record.id, record.clone());
        Ok(record)
    }
}

#[derive(Default)]
pub struct InMemoryVehicleStore {
    next_id: u64,
    storage: BTreeMap<VehicleID, Vehicle>,
}

impl InMemoryVehicleStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VehicleStore for InMemoryVehicleStore {
    async fn list_vehicles(
        &self,
        filter: &VehicleFilter,
        pagination: Pagination,
    ) -> Result<Vec<Vehicle>, Box<dyn Error + Send + Sync>> {
        Ok(pagination.apply(
            self.storage
                .values()
                .filter(|vehicle| filter.matches(vehicle))
                .cloned(),
        ))
    }

    async fn find_vehicle(
        &self,
        id: VehicleID,
    ) -> Result<Option<Vehicle>, Box<dyn Error + Send + Sync>> {
        Ok(self.storage.get(&id).cloned())
    }

    async fn insert_vehicle(
        &mut self,
        details: VehicleDetails,
    ) -> Result<Vehicle, Box<dyn Error + Send + Sync>> {
        self.next_id += 1;
        let vehicle = Vehicle {
            id: VehicleID(self.next_id),
            name: details.name,
            brand: details.brand,
            year: details.year,
        };
        self.storage.insert(vehicle.id, vehicle.clone());
        Ok(vehicle)
    }

    async fn update_vehicle(
        &mut self,
        vehicle: Vehicle,
    ) -> Result<Option<Vehicle>, Box<dyn Error + Send + Sync>> {
        match self.storage.get_mut(&vehicle.id) {
            Some(stored) => {
                *stored = vehicle.clone();
                Ok(Some(vehicle))
            }
            None => Ok(None),
        }
    }

    async fn delete_vehicle(
        &mut self,
        id: VehicleID,
    ) -> Result<bool, Box<dyn Error + Send + Sync>> {
        Ok(self.storage.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HashedPassword, Role};

    #[tokio::test]
    async fn credential_ids_are_assigned_in_order() {
        let mut store = InMemoryCredentialStore::new();

        for email in ["a@test.com", "b@test.com"] {
            store
                .persist(NewCredential {
                    identifier: Identifier(email.into()),
                    hashed_password: HashedPassword("$argon2id$...".into()),
                    role: Role::Editor,
                })
                .await
                .unwrap();
        }

        let found = store
            .find_credential_by_identifier(&Identifier("b@test.com".into()))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, AdminID(2));
        assert!(store
            .find_credential_by_identifier(&Identifier("c@test.com".into()))
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn vehicles_can_be_updated_and_deleted() {
        let mut store = InMemoryVehicleStore::new();
        let mut vehicle = store
            .insert_vehicle(VehicleDetails {
                name: "Uno".into(),
                brand: "Fiat".into(),
                year: 2010,
            })
            .await
            .unwrap();

        vehicle.year = 2012;
        assert_eq!(
            store.update_vehicle(vehicle.clone()).await.unwrap(),
            Some(vehicle.clone())
        );
        assert_eq!(store.find_vehicle(vehicle.id).await.unwrap().unwrap().year, 2012);

        assert!(store.delete_vehicle(vehicle.id).await.unwrap());
        assert!(!store.delete_vehicle(vehicle.id).await.unwrap());
        assert!(store.update_vehicle(vehicle).await.unwrap().is_none());
    }
}
