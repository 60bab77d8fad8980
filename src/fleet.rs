use std::{error::Error, sync::Arc};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::{
    error::ApiError,
    types::{Pagination, Vehicle, VehicleDetails, VehicleFilter, VehicleID},
};

/// Oldest model year accepted for a vehicle.
pub const MIN_VEHICLE_YEAR: i32 = 1950;

#[async_trait]
pub trait VehicleStore: Send + Sync + 'static {
    async fn list_vehicles(
        &self,
        filter: &VehicleFilter,
        pagination: Pagination,
    ) -> Result<Vec<Vehicle>, Box<dyn Error + Send + Sync>>;

    async fn find_vehicle(
        &self,
        id: VehicleID,
    ) -> Result<Option<Vehicle>, Box<dyn Error + Send + Sync>>;

    /// Store a new vehicle and return it with its assigned id.
    async fn insert_vehicle(
        &mut self,
        details: VehicleDetails,
    ) -> Result<Vehicle, Box<dyn Error + Send + Sync>>;

    /// Replace a stored vehicle. Returns `None` if no vehicle has that id.
    async fn update_vehicle(
        &mut self,
        vehicle: Vehicle,
    ) -> Result<Option<Vehicle>, Box<dyn Error + Send + Sync>>;

    /// Returns false if no vehicle had that id.
    async fn delete_vehicle(&mut self, id: VehicleID)
        -> Result<bool, Box<dyn Error + Send + Sync>>;
}

/// Collect every problem with the submitted details, in field order.
pub fn validate_vehicle(details: &VehicleDetails) -> Result<(), ApiError> {
    let mut messages = Vec::new();

    if details.name.trim().is_empty() {
        messages.push("vehicle name must not be blank".to_string());
    }
    if details.brand.trim().is_empty() {
        messages.push("vehicle brand must not be blank".to_string());
    }
    if details.year < MIN_VEHICLE_YEAR {
        messages.push(format!(
            "vehicle year must be {MIN_VEHICLE_YEAR} or later"
        ));
    }

    if messages.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(messages))
    }
}

#[derive(Clone)]
pub struct Fleet {
    store: Arc<Mutex<dyn VehicleStore>>,
}

impl Fleet {
    pub fn new(store: Arc<Mutex<dyn VehicleStore>>) -> Self {
        Self { store }
    }

    pub async fn list(
        &self,
        filter: &VehicleFilter,
        pagination: Pagination,
    ) -> Result<Vec<Vehicle>, ApiError> {
        Ok(self
            .store
            .lock()
            .await
            .list_vehicles(filter, pagination)
            .await?)
    }

    pub async fn get(&self, id: VehicleID) -> Result<Vehicle, ApiError> {
        self.store
            .lock()
            .await
            .find_vehicle(id)
            .await?
            .ok_or(ApiError::NotFound)
    }

    pub async fn create(&self, details: VehicleDetails) -> Result<Vehicle, ApiError> {
        validate_vehicle(&details)?;

        let vehicle = self.store.lock().await.insert_vehicle(details).await?;
        tracing::info!(id = vehicle.id.0, name = %vehicle.name, "vehicle created");

        Ok(vehicle)
    }

    /// Unknown ids are reported before validation problems.
    pub async fn update(
        &self,
        id: VehicleID,
        details: VehicleDetails,
    ) -> Result<Vehicle, ApiError> {
        let mut store = self.store.lock().await;

        if store.find_vehicle(id).await?.is_none() {
            return Err(ApiError::NotFound);
        }
        validate_vehicle(&details)?;

        store
            .update_vehicle(Vehicle {
                id,
                name: details.name,
                brand: details.brand,
                year: details.year,
            })
            .await?
            .ok_or(ApiError::NotFound)
    }

    pub async fn delete(&self, id: VehicleID) -> Result<(), ApiError> {
        if self.store.lock().await.delete_vehicle(id).await? {
            tracing::info!(id = id.0, "vehicle deleted");
            Ok(())
        } else {
            Err(ApiError::NotFound)
        }
    }
}
