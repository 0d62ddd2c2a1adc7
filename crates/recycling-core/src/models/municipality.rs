//! 市政与区域实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

use super::enums::ZoneType;

/// 市政联系方式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactInfo {
    pub email: String,
    pub phone: String,
    pub address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// 市政
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Municipality {
    pub id: i64,
    pub name: String,
    /// 市政编码，全局唯一
    pub code: String,
    pub region: String,
    pub population: i64,
    /// 面积（平方公里）
    pub area: f64,
    pub contact_info: Json<ContactInfo>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMunicipality {
    pub name: String,
    pub code: String,
    pub region: String,
    pub population: i64,
    pub area: f64,
    pub contact_info: ContactInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityChanges {
    pub name: Option<String>,
    pub region: Option<String>,
    pub population: Option<i64>,
    pub area: Option<f64>,
    pub contact_info: Option<ContactInfo>,
    pub is_active: Option<bool>,
}

/// 区域边界（经纬度包围盒）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Boundaries {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Boundaries {
    pub fn is_valid(&self) -> bool {
        self.north >= self.south
            && (-90.0..=90.0).contains(&self.north)
            && (-90.0..=90.0).contains(&self.south)
            && (-180.0..=180.0).contains(&self.east)
            && (-180.0..=180.0).contains(&self.west)
    }
}

/// 市政下的服务区域
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: i64,
    pub municipality_id: i64,
    pub name: String,
    pub boundaries: Json<Boundaries>,
    pub population: i64,
    pub zone_type: ZoneType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewZone {
    pub municipality_id: i64,
    pub name: String,
    pub boundaries: Boundaries,
    pub population: i64,
    pub zone_type: ZoneType,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneChanges {
    pub name: Option<String>,
    pub boundaries: Option<Boundaries>,
    pub population: Option<i64>,
    pub zone_type: Option<ZoneType>,
}
