use std::collections::BTreeSet;

use crate::api::fleet_dto::DriverDto;
use crate::domain::resource::resource_trait::{Availability, Resource};
use crate::domain::utils::id::DriverId;
use crate::error::ConversionError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Driver {
    pub id: DriverId,
    pub skills: BTreeSet<String>,
    pub availability: Availability,
}

impl Driver {
    pub fn new<I, S>(id: impl Into<String>, skills: I, availability: Availability) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Driver { id: DriverId::new(id), skills: skills.into_iter().map(Into::into).collect(), availability }
    }

    pub fn has_skill(&self, skill: &str) -> bool {
        self.skills.contains(skill)
    }
}

impl Resource for Driver {
    fn availability(&self) -> Availability {
        self.availability
    }
}

impl TryFrom<DriverDto> for Driver {
    type Error = ConversionError;

    fn try_from(dto: DriverDto) -> Result<Self, Self::Error> {
        let availability = match dto.availability {
            Some(value) => value.parse()?,
            None => Availability::Available,
        };

        Ok(Driver { id: DriverId::new(dto.id), skills: dto.skills.into_iter().collect(), availability })
    }
}
