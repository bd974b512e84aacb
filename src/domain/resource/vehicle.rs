use crate::api::fleet_dto::VehicleDto;
use crate::domain::resource::resource_trait::{Availability, Resource};
use crate::domain::utils::id::VehicleId;
use crate::error::ConversionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vehicle {
    pub id: VehicleId,

    /// Free-form type label as maintained by the fleet (e.g. "van", "sedan").
    pub vehicle_type: String,

    /// Number of passenger seats.
    pub capacity: u32,

    pub availability: Availability,
}

impl Vehicle {
    pub fn new(id: impl Into<String>, vehicle_type: impl Into<String>, capacity: u32, availability: Availability) -> Self {
        Vehicle { id: VehicleId::new(id), vehicle_type: vehicle_type.into(), capacity, availability }
    }

    pub fn can_seat(&self, passenger_count: u32) -> bool {
        self.capacity >= passenger_count
    }
}

impl Resource for Vehicle {
    fn availability(&self) -> Availability {
        self.availability
    }
}

impl TryFrom<VehicleDto> for Vehicle {
    type Error = ConversionError;

    fn try_from(dto: VehicleDto) -> Result<Self, Self::Error> {
        let availability = match dto.availability {
            Some(value) => value.parse()?,
            None => Availability::Available,
        };

        Ok(Vehicle { id: VehicleId::new(dto.id), vehicle_type: dto.vehicle_type, capacity: dto.capacity, availability })
    }
}
