use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::Category;
use crate::errors::ModelError;
use crate::rating::{Rating, RatingChange, RatingSummary};

/// Stable identifier of a record, independent of its position in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self { Self(Uuid::new_v4()) }

    /// Placeholder for records decoded without an id.
    pub fn nil() -> Self { Self(Uuid::nil()) }

    pub fn is_nil(&self) -> bool { self.0.is_nil() }

    /// Deterministic id for a legacy record, so every reader of the same
    /// document derives the same id until it is written back.
    pub fn derived(position: usize, name: &str, timestamp: Option<&DateTime<Utc>>) -> Self {
        let stamp = timestamp.map(|t| t.to_rfc3339()).unwrap_or_default();
        let seed = format!("{position}\u{1f}{name}\u{1f}{stamp}");
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, seed.as_bytes()))
    }
}

impl Default for RecordId {
    fn default() -> Self { Self::new() }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RecordId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| ModelError::Validation(format!("invalid record id '{s}': {e}")))
    }
}

/// One submitted business name.
///
/// `author_id` and `timestamp` are optional only to tolerate documents
/// written before they existed; `repair` fills them in.
///
/// Decoding never rejects a record over one odd field: `null`, empty or
/// unparseable values read as missing, and out-of-range votes are dropped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusinessRecord {
    #[serde(default = "RecordId::nil", deserialize_with = "lenient::id")]
    pub id: RecordId,
    #[serde(default, deserialize_with = "lenient::text")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient::category")]
    pub category: Category,
    #[serde(default, deserialize_with = "lenient::author", skip_serializing_if = "Option::is_none")]
    pub author_id: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp", skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient::ratings")]
    pub ratings: BTreeMap<String, Rating>,
}

/// Field decoders for documents written by older or looser clients.
mod lenient {
    use std::collections::BTreeMap;

    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    use super::RecordId;
    use crate::category::Category;
    use crate::rating::Rating;

    pub fn id<'de, D: Deserializer<'de>>(d: D) -> Result<RecordId, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s.parse().unwrap_or_else(|_| RecordId::nil()),
            _ => RecordId::nil(),
        })
    }

    pub fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => s,
            Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn category<'de, D: Deserializer<'de>>(d: D) -> Result<Category, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => Category::from(s),
            _ => Category::default(),
        })
    }

    pub fn author<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) if !s.trim().is_empty() => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// RFC 3339 strings or epoch milliseconds; anything else reads as missing.
    pub fn timestamp<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(match Value::deserialize(d)? {
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim()).ok().map(|t| t.with_timezone(&Utc)),
            Value::Number(n) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
            _ => None,
        })
    }

    pub fn ratings<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, Rating>, D::Error> {
        let Value::Object(entries) = Value::deserialize(d)? else {
            return Ok(BTreeMap::new());
        };
        Ok(entries
            .into_iter()
            .filter_map(|(user, vote)| {
                let value = vote.as_u64().and_then(|v| u8::try_from(v).ok())?;
                Rating::new(value).ok().map(|r| (user, r))
            })
            .collect())
    }
}

impl BusinessRecord {
    /// Build a new record owned by `author_id`. The name is trimmed and must
    /// not be empty; the category must be a recognized one.
    pub fn new(name: &str, category: Category, author_id: &str) -> Result<Self, ModelError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ModelError::Validation("business name must not be empty".into()));
        }
        if !category.is_recognized() {
            return Err(ModelError::Validation(format!("unknown category '{category}'")));
        }
        if author_id.trim().is_empty() {
            return Err(ModelError::Validation("author id must not be empty".into()));
        }
        Ok(Self {
            id: RecordId::new(),
            name: name.to_string(),
            category,
            author_id: Some(author_id.to_string()),
            timestamp: Some(Utc::now()),
            ratings: BTreeMap::new(),
        })
    }

    pub fn is_author(&self, user_id: &str) -> bool {
        self.author_id.as_deref() == Some(user_id)
    }

    pub fn rating_of(&self, user_id: &str) -> Option<Rating> {
        self.ratings.get(user_id).copied()
    }

    pub fn rating_summary(&self) -> RatingSummary {
        RatingSummary::from_ratings(&self.ratings)
    }

    /// Toggle `user_id`'s vote: the same rating twice removes it, a different
    /// rating replaces it.
    pub fn toggle_rating(&mut self, user_id: &str, rating: Rating) -> RatingChange {
        match self.ratings.get(user_id).copied() {
            Some(previous) if previous == rating => {
                self.ratings.remove(user_id);
                RatingChange::Removed(previous)
            }
            Some(previous) => {
                self.ratings.insert(user_id.to_string(), rating);
                RatingChange::Replaced { previous, current: rating }
            }
            None => {
                self.ratings.insert(user_id.to_string(), rating);
                RatingChange::Set(rating)
            }
        }
    }

    pub fn is_legacy(&self) -> bool {
        self.author_id.is_none() || self.timestamp.is_none()
    }

    /// Claim an ownerless record for `caller_id` and backfill a missing
    /// timestamp. Returns whether anything was filled.
    pub fn repair(&mut self, caller_id: &str, now: DateTime<Utc>) -> bool {
        let touched = self.is_legacy();
        if self.author_id.is_none() {
            self.author_id = Some(caller_id.to_string());
        }
        if self.timestamp.is_none() {
            self.timestamp = Some(now);
        }
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rating(v: u8) -> Rating { Rating::new(v).unwrap() }

    #[test]
    fn new_record_shape() {
        let rec = BusinessRecord::new("  Lettuce Turnip the Beet ", Category::Punny, "user_1").unwrap();
        assert_eq!(rec.name, "Lettuce Turnip the Beet");
        assert!(rec.ratings.is_empty());
        assert!(rec.timestamp.is_some());
        assert!(rec.is_author("user_1"));
        assert!(!rec.is_legacy());
        assert!(!rec.id.is_nil());
    }

    #[test]
    fn new_record_validation() {
        assert!(BusinessRecord::new("   ", Category::Punny, "u").is_err());
        assert!(BusinessRecord::new("Name", Category::Other("x".into()), "u").is_err());
        assert!(BusinessRecord::new("Name", Category::Serious, "").is_err());
    }

    #[test]
    fn toggle_twice_unrates() {
        let mut rec = BusinessRecord::new("Acme", Category::Serious, "a").unwrap();
        assert_eq!(rec.toggle_rating("u", rating(4)), RatingChange::Set(rating(4)));
        assert_eq!(rec.toggle_rating("u", rating(4)), RatingChange::Removed(rating(4)));
        assert_eq!(rec.rating_of("u"), None);
    }

    #[test]
    fn toggle_different_replaces() {
        let mut rec = BusinessRecord::new("Acme", Category::Serious, "a").unwrap();
        rec.toggle_rating("u", rating(2));
        let change = rec.toggle_rating("u", rating(5));
        assert_eq!(change, RatingChange::Replaced { previous: rating(2), current: rating(5) });
        assert_eq!(rec.ratings.len(), 1);
        assert_eq!(rec.rating_of("u"), Some(rating(5)));
    }

    #[test]
    fn legacy_record_decodes_and_repairs() {
        let mut rec: BusinessRecord =
            serde_json::from_str(r#"{"name":"Old Shop","category":"serious"}"#).unwrap();
        assert!(rec.id.is_nil());
        assert!(rec.is_legacy());
        assert!(rec.ratings.is_empty());

        let now = Utc::now();
        assert!(rec.repair("me", now));
        assert!(rec.is_author("me"));
        assert_eq!(rec.timestamp, Some(now));
        assert!(!rec.repair("someone-else", now));
        assert!(rec.is_author("me"));
    }

    #[test]
    fn wire_shape_is_camel_case() {
        let rec = BusinessRecord::new("Acme", Category::Punny, "user_9").unwrap();
        let v = serde_json::to_value(&rec).unwrap();
        assert_eq!(v["authorId"], "user_9");
        assert_eq!(v["category"], "punny");
        assert!(v["ratings"].as_object().unwrap().is_empty());
        assert!(v["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn derived_ids_are_stable() {
        let a = RecordId::derived(0, "x", None);
        assert_eq!(a, RecordId::derived(0, "x", None));
        assert_ne!(a, RecordId::derived(1, "x", None));
        assert!("not-a-uuid".parse::<RecordId>().is_err());
        assert_eq!(a.to_string().parse::<RecordId>(), Ok(a));
    }

    fn decode(raw: &str) -> BusinessRecord {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn null_and_empty_fields_read_as_missing() {
        let rec = decode(r#"{"id":null,"name":null,"category":null,"authorId":"","timestamp":null,"ratings":null}"#);
        assert!(rec.id.is_nil());
        assert_eq!(rec.name, "");
        assert_eq!(rec.category, Category::default());
        assert_eq!(rec.author_id, None);
        assert_eq!(rec.timestamp, None);
        assert!(rec.ratings.is_empty());
    }

    #[test]
    fn unparseable_timestamps_read_as_missing() {
        for raw in [r#""""#, r#""3/1/2024, 10:00:00 AM""#, "true"] {
            let rec = decode(&format!(r#"{{"name":"Old","category":"punny","timestamp":{raw}}}"#));
            assert_eq!(rec.timestamp, None, "timestamp {raw}");
            assert!(rec.is_legacy());
        }
        let iso = decode(r#"{"name":"Old","timestamp":"2024-03-01T10:00:00.000Z"}"#);
        assert_eq!(iso.timestamp.map(|t| t.to_rfc3339()).as_deref(), Some("2024-03-01T10:00:00+00:00"));
        let millis = decode(r#"{"name":"Old","timestamp":1709287200000}"#);
        assert_eq!(millis.timestamp, iso.timestamp);
    }

    #[test]
    fn out_of_range_votes_are_dropped() {
        let rec = decode(r#"{"name":"Old","category":"punny","ratings":{"u":9,"v":0,"w":"4","x":3,"y":-1}}"#);
        assert_eq!(rec.ratings.len(), 1);
        assert_eq!(rec.rating_of("x"), Some(rating(3)));
        assert_eq!(rec.rating_summary().average, Some(3.0));
    }

    #[test]
    fn bare_rating_values_are_range_checked() {
        assert!(serde_json::from_str::<Rating>("9").is_err());
        assert!(serde_json::from_str::<Rating>("0").is_err());
        assert_eq!(serde_json::from_str::<Rating>("5").unwrap(), rating(5));
        assert_eq!(serde_json::to_string(&rating(2)).unwrap(), "2");
    }
}
