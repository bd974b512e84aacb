use std::collections::HashMap;

use crate::api::fleet_dto::FleetDto;
use crate::domain::assignment::assignment::Assignment;
use crate::domain::resource::driver::Driver;
use crate::domain::resource::resource_trait::ResourceKind;
use crate::domain::resource::vehicle::Vehicle;
use crate::domain::utils::id::{DriverId, VehicleId};
use crate::error::{Error, Result};

/// Read-only view of the fleet: vehicles and drivers in catalog order.
///
/// Catalog order matters: alternate resources are picked first-fit in this order.
#[derive(Debug, Clone, Default)]
pub struct ResourceCatalog {
    vehicles: Vec<Vehicle>,
    drivers: Vec<Driver>,

    vehicle_index: HashMap<VehicleId, usize>,
    driver_index: HashMap<DriverId, usize>,
}

impl ResourceCatalog {
    pub fn new(vehicles: Vec<Vehicle>, drivers: Vec<Driver>) -> Result<Self> {
        let mut vehicle_index = HashMap::with_capacity(vehicles.len());
        for (position, vehicle) in vehicles.iter().enumerate() {
            if vehicle_index.insert(vehicle.id.clone(), position).is_some() {
                return Err(Error::DuplicateResource { kind: ResourceKind::Vehicle, id: vehicle.id.to_string() });
            }
        }

        let mut driver_index = HashMap::with_capacity(drivers.len());
        for (position, driver) in drivers.iter().enumerate() {
            if driver_index.insert(driver.id.clone(), position).is_some() {
                return Err(Error::DuplicateResource { kind: ResourceKind::Driver, id: driver.id.to_string() });
            }
        }

        Ok(ResourceCatalog { vehicles, drivers, vehicle_index, driver_index })
    }

    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn drivers(&self) -> &[Driver] {
        &self.drivers
    }

    pub fn vehicle(&self, id: &VehicleId) -> Option<&Vehicle> {
        self.vehicle_index.get(id).map(|position| &self.vehicles[*position])
    }

    pub fn driver(&self, id: &DriverId) -> Option<&Driver> {
        self.driver_index.get(id).map(|position| &self.drivers[*position])
    }

    /// Rejects candidates with placeholder or unknown resource ids.
    ///
    /// Must run before conflict detection; an unknown id is a caller bug, not a conflict.
    pub fn validate_candidate(&self, candidate: &Assignment) -> Result<()> {
        if candidate.vehicle_id.is_placeholder() {
            return Err(Error::MissingResource(ResourceKind::Vehicle));
        }
        if candidate.driver_id.is_placeholder() {
            return Err(Error::MissingResource(ResourceKind::Driver));
        }
        if self.vehicle(&candidate.vehicle_id).is_none() {
            return Err(Error::UnknownResource { kind: ResourceKind::Vehicle, id: candidate.vehicle_id.to_string() });
        }
        if self.driver(&candidate.driver_id).is_none() {
            return Err(Error::UnknownResource { kind: ResourceKind::Driver, id: candidate.driver_id.to_string() });
        }
        Ok(())
    }
}

impl TryFrom<FleetDto> for ResourceCatalog {
    type Error = Error;

    fn try_from(dto: FleetDto) -> Result<Self> {
        let vehicles = dto.vehicles.into_iter().map(Vehicle::try_from).collect::<std::result::Result<Vec<_>, _>>()?;
        let drivers = dto.drivers.into_iter().map(Driver::try_from).collect::<std::result::Result<Vec<_>, _>>()?;

        log::debug!("Resource catalog built with {} vehicles and {} drivers.", vehicles.len(), drivers.len());
        ResourceCatalog::new(vehicles, drivers)
    }
}
