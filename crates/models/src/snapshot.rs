use serde::{Deserialize, Serialize};

use common::utils::bytes::format_bytes;

use crate::errors::ModelError;
use crate::record::{BusinessRecord, RecordId};

/// The whole ordered list of records, stored remotely as one JSON array.
///
/// Decoding assigns derived ids to records that lack one, so ids are always
/// usable for addressing even before a legacy document is rewritten.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Vec<BusinessRecord>", into = "Vec<BusinessRecord>")]
pub struct Snapshot {
    records: Vec<BusinessRecord>,
}

impl From<Vec<BusinessRecord>> for Snapshot {
    fn from(mut records: Vec<BusinessRecord>) -> Self {
        for (position, rec) in records.iter_mut().enumerate() {
            if rec.id.is_nil() {
                rec.id = RecordId::derived(position, &rec.name, rec.timestamp.as_ref());
            }
        }
        Self { records }
    }
}

impl From<Snapshot> for Vec<BusinessRecord> {
    fn from(s: Snapshot) -> Self { s.records }
}

impl Snapshot {
    pub fn empty() -> Self { Self::default() }

    pub fn from_json(raw: &str) -> Result<Self, ModelError> {
        serde_json::from_str(raw).map_err(|e| ModelError::Malformed(e.to_string()))
    }

    /// Pretty JSON (2-space indent), the form written to the remote document.
    pub fn to_json_pretty(&self) -> Result<String, ModelError> {
        serde_json::to_string_pretty(&self.records).map_err(|e| ModelError::Malformed(e.to_string()))
    }

    /// Compact JSON, the form kept in the local cache.
    pub fn to_json(&self) -> Result<String, ModelError> {
        serde_json::to_string(&self.records).map_err(|e| ModelError::Malformed(e.to_string()))
    }

    pub fn records(&self) -> &[BusinessRecord] { &self.records }

    pub fn len(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    pub fn iter(&self) -> std::slice::Iter<'_, BusinessRecord> { self.records.iter() }

    pub fn get(&self, id: RecordId) -> Option<&BusinessRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    pub fn get_mut(&mut self, id: RecordId) -> Option<&mut BusinessRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    pub fn position(&self, id: RecordId) -> Option<usize> {
        self.records.iter().position(|r| r.id == id)
    }

    pub fn push(&mut self, record: BusinessRecord) { self.records.push(record) }

    pub fn remove(&mut self, id: RecordId) -> Option<BusinessRecord> {
        let idx = self.position(id)?;
        Some(self.records.remove(idx))
    }

    pub fn clear(&mut self) { self.records.clear() }

    pub fn records_mut(&mut self) -> std::slice::IterMut<'_, BusinessRecord> {
        self.records.iter_mut()
    }

    /// Size of the compact encoding in bytes.
    pub fn encoded_size(&self) -> usize {
        self.to_json().map(|s| s.len()).unwrap_or_default()
    }

    /// Human-readable size of the stored document, e.g. `1.2 KB`.
    pub fn storage_usage(&self) -> String {
        format_bytes(self.encoded_size() as u64, 2)
    }
}

impl<'a> IntoIterator for &'a Snapshot {
    type Item = &'a BusinessRecord;
    type IntoIter = std::slice::Iter<'a, BusinessRecord>;

    fn into_iter(self) -> Self::IntoIter { self.records.iter() }
}
