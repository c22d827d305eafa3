// lmctl - CLI for the LogicMonitor REST API
// Copyright (C) 2026 The lmctl contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Typed views over the list items the REST API returns, and the table rows
//! each one flattens into.

use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use tabled::Tabled;

pub const PROP_MANUFACTURER: &str = "auto.endpoint.manufacturer";
pub const PROP_SYSINFO: &str = "system.sysinfo";
pub const PROP_DESCRIPTION: &str = "auto.entphysical.descr";

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Property {
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub value: String,
}

/// Name to value lookup built once per property list. When a name repeats,
/// the first entry wins.
#[derive(Debug, Clone, Default)]
pub struct PropertyMap(HashMap<String, String>);

impl PropertyMap {
    pub fn from_properties(properties: &[Property]) -> Self {
        let mut map = HashMap::with_capacity(properties.len());
        for prop in properties {
            map.entry(prop.name.clone())
                .or_insert_with(|| prop.value.clone());
        }
        Self(map)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub display_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub auto_properties: Vec<Property>,
    #[serde(default, deserialize_with = "nullable")]
    pub system_properties: Vec<Property>,
}

impl Device {
    pub fn to_row(&self) -> DeviceRow {
        let auto = PropertyMap::from_properties(&self.auto_properties);
        let system = PropertyMap::from_properties(&self.system_properties);
        DeviceRow {
            id: self.id,
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            manufacturer: auto.get(PROP_MANUFACTURER).map(str::to_string),
            sysinfo: system.get(PROP_SYSINFO).map(str::to_string),
            description: auto.get(PROP_DESCRIPTION).map(str::to_string),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Graph {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDataSource {
    pub id: Option<i64>,
    pub data_source_id: Option<i64>,
    pub data_source_name: Option<String>,
    pub device_name: Option<String>,
    pub device_display_name: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub graphs: Vec<Graph>,
}

impl DeviceDataSource {
    pub fn to_row(&self) -> DataSourceRow {
        DataSourceRow {
            id: self.id,
            data_source_id: self.data_source_id,
            data_source_name: self.data_source_name.clone(),
            device_name: self.device_name.clone(),
            device_display_name: self.device_display_name.clone(),
            graphs: self.graphs.iter().map(|g| g.id).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInstance {
    pub device_data_source_id: Option<i64>,
    pub name: Option<String>,
    pub device_display_name: Option<String>,
    pub id: Option<i64>,
    pub data_source_id: Option<i64>,
}

impl DataSourceInstance {
    pub fn to_row(&self) -> InstanceRow {
        InstanceRow {
            device_data_source_id: self.device_data_source_id,
            name: self.name.clone(),
            device_display_name: self.device_display_name.clone(),
            id: self.id,
            data_source_id: self.data_source_id,
        }
    }
}

// ── Table rows ──────────────────────────────────────────────────────

fn display_option<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn display_ids(ids: &[i64]) -> String {
    let joined = ids
        .iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{joined}]")
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct DeviceRow {
    #[tabled(rename = "Device ID")]
    pub id: i64,
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "Display Name")]
    pub display_name: String,
    #[tabled(rename = "Manufacturer", display_with = "display_option")]
    pub manufacturer: Option<String>,
    #[tabled(rename = "Sysinfo", display_with = "display_option")]
    pub sysinfo: Option<String>,
    #[tabled(rename = "Description", display_with = "display_option")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct DataSourceRow {
    #[tabled(rename = "ID", display_with = "display_option")]
    pub id: Option<i64>,
    #[tabled(rename = "Data Source ID", display_with = "display_option")]
    pub data_source_id: Option<i64>,
    #[tabled(rename = "Data Source Name", display_with = "display_option")]
    pub data_source_name: Option<String>,
    #[tabled(rename = "Device Name", display_with = "display_option")]
    pub device_name: Option<String>,
    #[tabled(rename = "Device Display Name", display_with = "display_option")]
    pub device_display_name: Option<String>,
    #[tabled(rename = "Graphs", display_with = "display_ids")]
    pub graphs: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Tabled)]
pub struct InstanceRow {
    #[tabled(rename = "Device DataSource ID", display_with = "display_option")]
    pub device_data_source_id: Option<i64>,
    #[tabled(rename = "Name", display_with = "display_option")]
    pub name: Option<String>,
    #[tabled(rename = "DeviceDisplayName", display_with = "display_option")]
    pub device_display_name: Option<String>,
    #[tabled(rename = "DataSource Instances ID", display_with = "display_option")]
    pub id: Option<i64>,
    #[tabled(rename = "DataSource ID", display_with = "display_option")]
    pub data_source_id: Option<i64>,
}
