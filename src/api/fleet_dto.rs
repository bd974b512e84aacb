use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct FleetDto {
    pub vehicles: Vec<VehicleDto>,
    pub drivers: Vec<DriverDto>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct VehicleDto {
    pub id: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub capacity: u32,
    pub availability: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DriverDto {
    pub id: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub availability: Option<String>,
}
