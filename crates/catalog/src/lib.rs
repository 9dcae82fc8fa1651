//! Dataset model and the map component's dataset surface.
//!
//! The embedded map is reached only through [`MapSession`]; this crate also
//! ships an in-process implementation used by the demo and by tests.

use foundation::{DatasetId, Rgb, palette_color};
use serde::{Deserialize, Serialize};

mod provider;

pub use provider::*;

/// Content used to create or replace a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetPayload {
    pub id: DatasetId,
    pub label: String,
    /// Opaque body (CSV text, GeoJSON, row arrays...). Never inspected here.
    pub data: serde_json::Value,
}

impl DatasetPayload {
    pub fn new(
        id: impl Into<DatasetId>,
        label: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            data,
        }
    }
}

/// A dataset as listed by the map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: DatasetId,
    pub label: String,
    pub color: Rgb,
}

/// A dataset together with its full data body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetWithData {
    #[serde(flatten)]
    pub dataset: Dataset,
    pub data: serde_json::Value,
}

impl DatasetWithData {
    pub fn id(&self) -> &DatasetId {
        &self.dataset.id
    }

    /// Human-readable dump for inspection views. Not a stable format.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Partial update applied by [`MapSession::update_dataset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatasetUpdate {
    pub label: Option<String>,
    pub color: Option<Rgb>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MapError {
    #[error("dataset {0} already exists")]
    DuplicateId(DatasetId),
    #[error("dataset {0} not found")]
    NotFound(DatasetId),
    #[error("map provider rejected the API key")]
    Unauthorized,
    #[error("cannot mount map into {0:?}")]
    Mount(String),
}

/// One live map instance.
///
/// `list_datasets` returns datasets in provider order; implementations must
/// document what that order is.
pub trait MapSession: Send {
    /// Mount target the map renders into.
    fn container(&self) -> &str;
    fn list_datasets(&self) -> Vec<Dataset>;
    fn add_dataset(&mut self, payload: DatasetPayload) -> Result<Dataset, MapError>;
    fn update_dataset(&mut self, id: &DatasetId, update: DatasetUpdate)
    -> Result<Dataset, MapError>;
    fn replace_dataset(
        &mut self,
        old_id: &DatasetId,
        payload: DatasetPayload,
    ) -> Result<Dataset, MapError>;
    fn remove_dataset(&mut self, id: &DatasetId) -> Result<(), MapError>;
    fn read_dataset_with_data(&self, id: &DatasetId) -> Result<DatasetWithData, MapError>;
}

/// Content-addressed id for payloads that arrive without one.
pub fn id_for_data(data: &serde_json::Value) -> DatasetId {
    let bytes = data.to_string();
    DatasetId::new(blake3::hash(bytes.as_bytes()).to_hex().to_string())
}

/// In-process map session.
///
/// Datasets are listed in insertion order; a replaced dataset keeps its slot
/// and its color.
#[derive(Debug, Default)]
pub struct InMemoryMapSession {
    container: String,
    entries: Vec<DatasetWithData>,
}

impl InMemoryMapSession {
    pub fn new(container: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            entries: Vec::new(),
        }
    }

    fn position(&self, id: &DatasetId) -> Option<usize> {
        self.entries.iter().position(|e| e.id() == id)
    }
}

impl MapSession for InMemoryMapSession {
    fn container(&self) -> &str {
        &self.container
    }

    fn list_datasets(&self) -> Vec<Dataset> {
        self.entries.iter().map(|e| e.dataset.clone()).collect()
    }

    fn add_dataset(&mut self, payload: DatasetPayload) -> Result<Dataset, MapError> {
        if self.position(&payload.id).is_some() {
            return Err(MapError::DuplicateId(payload.id));
        }
        let dataset = Dataset {
            color: palette_color(payload.id.as_str()),
            id: payload.id,
            label: payload.label,
        };
        self.entries.push(DatasetWithData {
            dataset: dataset.clone(),
            data: payload.data,
        });
        Ok(dataset)
    }

    fn update_dataset(
        &mut self,
        id: &DatasetId,
        update: DatasetUpdate,
    ) -> Result<Dataset, MapError> {
        let idx = self
            .position(id)
            .ok_or_else(|| MapError::NotFound(id.clone()))?;
        let entry = &mut self.entries[idx];
        if let Some(label) = update.label {
            entry.dataset.label = label;
        }
        if let Some(color) = update.color {
            entry.dataset.color = color;
        }
        Ok(entry.dataset.clone())
    }

    fn replace_dataset(
        &mut self,
        old_id: &DatasetId,
        payload: DatasetPayload,
    ) -> Result<Dataset, MapError> {
        let idx = self
            .position(old_id)
            .ok_or_else(|| MapError::NotFound(old_id.clone()))?;
        if &payload.id != old_id && self.position(&payload.id).is_some() {
            return Err(MapError::DuplicateId(payload.id));
        }
        let entry = &mut self.entries[idx];
        entry.dataset.id = payload.id;
        entry.dataset.label = payload.label;
        entry.data = payload.data;
        Ok(entry.dataset.clone())
    }

    fn remove_dataset(&mut self, id: &DatasetId) -> Result<(), MapError> {
        let idx = self
            .position(id)
            .ok_or_else(|| MapError::NotFound(id.clone()))?;
        self.entries.remove(idx);
        Ok(())
    }

    fn read_dataset_with_data(&self, id: &DatasetId) -> Result<DatasetWithData, MapError> {
        self.position(id)
            .map(|idx| self.entries[idx].clone())
            .ok_or_else(|| MapError::NotFound(id.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn payload(id: &str, data: serde_json::Value) -> DatasetPayload {
        DatasetPayload::new(id, format!("{id} label"), data)
    }

    #[test]
    fn add_rejects_duplicate_ids() {
        let mut map = InMemoryMapSession::new("map");
        map.add_dataset(payload("a", json!("x,y\n1,2"))).unwrap();
        let err = map.add_dataset(payload("a", json!("other"))).unwrap_err();
        assert_eq!(err, MapError::DuplicateId(DatasetId::new("a")));
        assert_eq!(map.list_datasets().len(), 1);
    }

    #[test]
    fn list_is_insertion_ordered() {
        let mut map = InMemoryMapSession::new("map");
        map.add_dataset(payload("z", json!(1))).unwrap();
        map.add_dataset(payload("a", json!(2))).unwrap();
        let ids: Vec<_> = map
            .list_datasets()
            .into_iter()
            .map(|d| d.id.to_string())
            .collect();
        assert_eq!(ids, vec!["z".to_string(), "a".to_string()]);
    }

    #[test]
    fn update_touches_only_given_fields() {
        let mut map = InMemoryMapSession::new("map");
        let added = map.add_dataset(payload("a", json!(1))).unwrap();
        let updated = map
            .update_dataset(
                &DatasetId::new("a"),
                DatasetUpdate {
                    label: Some("renamed".to_string()),
                    color: None,
                },
            )
            .unwrap();
        assert_eq!(updated.label, "renamed");
        assert_eq!(updated.color, added.color);
        assert_eq!(updated.id, added.id);
    }

    #[test]
    fn replace_keeps_slot_and_color() {
        let mut map = InMemoryMapSession::new("map");
        map.add_dataset(payload("first", json!(0))).unwrap();
        let old = map.add_dataset(payload("a", json!(1))).unwrap();
        map.add_dataset(payload("last", json!(2))).unwrap();

        let replaced = map
            .replace_dataset(&DatasetId::new("a"), payload("b", json!("new")))
            .unwrap();
        assert_eq!(replaced.id, DatasetId::new("b"));
        assert_eq!(replaced.color, old.color);

        let listed = map.list_datasets();
        assert_eq!(listed[1].id, DatasetId::new("b"));
        let full = map.read_dataset_with_data(&DatasetId::new("b")).unwrap();
        assert_eq!(full.data, json!("new"));
        assert!(map.read_dataset_with_data(&DatasetId::new("a")).is_err());
    }

    #[test]
    fn replace_missing_or_colliding_is_an_error() {
        let mut map = InMemoryMapSession::new("map");
        map.add_dataset(payload("a", json!(1))).unwrap();
        map.add_dataset(payload("b", json!(2))).unwrap();
        assert_eq!(
            map.replace_dataset(&DatasetId::new("nope"), payload("c", json!(3))),
            Err(MapError::NotFound(DatasetId::new("nope")))
        );
        assert_eq!(
            map.replace_dataset(&DatasetId::new("a"), payload("b", json!(3))),
            Err(MapError::DuplicateId(DatasetId::new("b")))
        );
    }

    #[test]
    fn remove_and_read_missing() {
        let mut map = InMemoryMapSession::new("map");
        map.add_dataset(payload("a", json!(1))).unwrap();
        map.remove_dataset(&DatasetId::new("a")).unwrap();
        assert!(map.list_datasets().is_empty());
        assert_eq!(
            map.remove_dataset(&DatasetId::new("a")),
            Err(MapError::NotFound(DatasetId::new("a")))
        );
    }

    #[test]
    fn pretty_json_flattens_dataset_fields() {
        let mut map = InMemoryMapSession::new("map");
        map.add_dataset(payload("a", json!({"rows": [1, 2]}))).unwrap();
        let full = map.read_dataset_with_data(&DatasetId::new("a")).unwrap();
        let v: serde_json::Value =
            serde_json::from_str(&full.to_pretty_json().unwrap()).unwrap();
        assert_eq!(v["id"], json!("a"));
        assert_eq!(v["label"], json!("a label"));
        assert_eq!(v["data"]["rows"], json!([1, 2]));
        assert!(v["color"].is_array());
    }

    #[test]
    fn content_ids_are_stable() {
        let a = id_for_data(&json!("x,y\n1,2"));
        assert_eq!(a, id_for_data(&json!("x,y\n1,2")));
        assert_ne!(a, id_for_data(&json!("x,y\n1,3")));
        assert_eq!(a.as_str().len(), 64);
    }
}
