use chrono::{DateTime, Utc};

use models::{BusinessRecord, Category, Rating, RatingChange, RecordId, Snapshot};

use crate::errors::ServiceError;

/// Whether a command's result has to reach the remote document.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistIntent {
    /// Write this snapshot (the state right after the command).
    Write(Snapshot),
    /// Nothing changed.
    Skip,
}

/// Result of a command plus what to do about persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    pub value: T,
    pub intent: PersistIntent,
}

impl<T> Outcome<T> {
    pub fn needs_write(&self) -> bool {
        matches!(self.intent, PersistIntent::Write(_))
    }
}

/// Owner of the current snapshot. Commands run synchronously to completion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Registry {
    snapshot: Snapshot,
}

impl Registry {
    pub fn new(snapshot: Snapshot) -> Self { Self { snapshot } }

    pub fn snapshot(&self) -> &Snapshot { &self.snapshot }

    fn write<T>(&self, value: T) -> Outcome<T> {
        Outcome { value, intent: PersistIntent::Write(self.snapshot.clone()) }
    }

    fn skip<T>(value: T) -> Outcome<T> {
        Outcome { value, intent: PersistIntent::Skip }
    }

    /// Append a new record owned by `author_id`.
    pub fn create(&mut self, name: &str, category: Category, author_id: &str) -> Result<Outcome<BusinessRecord>, ServiceError> {
        let record = BusinessRecord::new(name, category, author_id)?;
        self.snapshot.push(record.clone());
        Ok(self.write(record))
    }

    /// Toggle `user_id`'s rating of record `id`. Unknown ids are a no-op.
    pub fn rate(&mut self, id: RecordId, user_id: &str, rating: u8) -> Result<Outcome<Option<RatingChange>>, ServiceError> {
        let rating = Rating::new(rating)?;
        let Some(record) = self.snapshot.get_mut(id) else {
            return Ok(Self::skip(None));
        };
        let change = record.toggle_rating(user_id, rating);
        Ok(self.write(Some(change)))
    }

    /// Remove record `id` if `requester_id` is its author; otherwise no-op.
    pub fn delete(&mut self, id: RecordId, requester_id: &str) -> Outcome<Option<BusinessRecord>> {
        let owned = self.snapshot.get(id).is_some_and(|r| r.is_author(requester_id));
        if !owned {
            return Self::skip(None);
        }
        let removed = self.snapshot.remove(id);
        self.write(removed)
    }

    /// Drop every record. Returns how many were removed.
    pub fn clear_all(&mut self) -> Outcome<usize> {
        let removed = self.snapshot.len();
        self.snapshot.clear();
        self.write(removed)
    }

    /// Claim ownerless records for `caller_id` and backfill timestamps.
    /// Returns the number of records touched; always asks for a write so that
    /// derived ids and defaulted ratings reach the remote document too.
    pub fn fix_legacy(&mut self, caller_id: &str, now: DateTime<Utc>) -> Outcome<usize> {
        let fixed = self.snapshot.records_mut().map(|r| r.repair(caller_id, now)).filter(|&touched| touched).count();
        self.write(fixed)
    }

    /// Swap in a pulled snapshot. Returns whether it differed.
    pub fn replace(&mut self, snapshot: Snapshot) -> bool {
        if self.snapshot == snapshot {
            return false;
        }
        self.snapshot = snapshot;
        true
    }

    /// Resolve a full id or a unique prefix of at least 4 characters.
    pub fn resolve(&self, needle: &str) -> Result<RecordId, ServiceError> {
        let needle = needle.trim().to_ascii_lowercase();
        if let Ok(id) = needle.parse::<RecordId>() {
            return Ok(id);
        }
        if needle.len() < 4 {
            return Err(ServiceError::Validation("id prefix must have at least 4 characters".into()));
        }
        let mut matches = self.snapshot.iter().filter(|r| r.id.to_string().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some(r), None) => Ok(r.id),
            (None, _) => Err(ServiceError::Validation(format!("no record matches '{needle}'"))),
            (Some(_), Some(_)) => Err(ServiceError::Validation(format!("'{needle}' matches more than one record"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(names: &[(&str, &str)]) -> (Registry, Vec<RecordId>) {
        let mut reg = Registry::default();
        let ids = names
            .iter()
            .map(|(name, author)| reg.create(name, Category::Punny, author).unwrap().value.id)
            .collect();
        (reg, ids)
    }

    #[test]
    fn create_validates_and_writes() {
        let mut reg = Registry::default();
        let out = reg.create("Thai Tanic", Category::Punny, "u1").unwrap();
        assert!(out.needs_write());
        assert_eq!(out.value.name, "Thai Tanic");
        assert!(out.value.ratings.is_empty());
        assert!(out.value.timestamp.is_some());
        assert_eq!(out.intent, PersistIntent::Write(reg.snapshot().clone()));

        assert!(matches!(reg.create("", Category::Punny, "u1"), Err(ServiceError::Validation(_))));
        assert!(matches!(
            reg.create("X", Category::Other("weird".into()), "u1"),
            Err(ServiceError::Validation(_))
        ));
        assert_eq!(reg.snapshot().len(), 1);
    }

    #[test]
    fn rate_toggles_and_overwrites() {
        let (mut reg, ids) = registry_with(&[("A", "u1")]);
        reg.rate(ids[0], "u2", 3).unwrap();
        reg.rate(ids[0], "u2", 3).unwrap();
        assert!(reg.snapshot().get(ids[0]).unwrap().ratings.is_empty());

        reg.rate(ids[0], "u2", 1).unwrap();
        let out = reg.rate(ids[0], "u2", 4).unwrap();
        assert!(matches!(out.value, Some(RatingChange::Replaced { .. })));
        let rec = reg.snapshot().get(ids[0]).unwrap();
        assert_eq!(rec.ratings.len(), 1);
        assert_eq!(rec.rating_of("u2").map(Rating::value), Some(4));
    }

    #[test]
    fn rate_unknown_id_is_noop_and_bad_rating_rejected() {
        let (mut reg, ids) = registry_with(&[("A", "u1")]);
        let out = reg.rate(RecordId::new(), "u2", 3).unwrap();
        assert_eq!(out, Outcome { value: None, intent: PersistIntent::Skip });
        assert!(matches!(reg.rate(ids[0], "u2", 9), Err(ServiceError::Validation(_))));
    }

    #[test]
    fn delete_requires_author() {
        let (mut reg, ids) = registry_with(&[("A", "u1"), ("B", "u2")]);
        let out = reg.delete(ids[0], "u2");
        assert!(!out.needs_write());
        assert_eq!(reg.snapshot().len(), 2);

        let out = reg.delete(ids[0], "u1");
        assert_eq!(out.value.map(|r| r.name), Some("A".to_string()));
        // the other record keeps its id after the list shifts
        assert_eq!(reg.snapshot().get(ids[1]).map(|r| r.name.as_str()), Some("B"));
    }

    #[test]
    fn clear_all_empties() {
        let (mut reg, _) = registry_with(&[("A", "u1"), ("B", "u2")]);
        let out = reg.clear_all();
        assert_eq!(out.value, 2);
        assert!(reg.snapshot().is_empty());
        assert_eq!(out.intent, PersistIntent::Write(Snapshot::empty()));
    }

    #[test]
    fn fix_legacy_claims_and_is_idempotent() {
        let legacy = Snapshot::from_json(
            r#"[{"name":"Old","category":"serious"},{"name":"New","category":"punny","authorId":"u9","timestamp":"2024-03-01T10:00:00.000Z","ratings":{}}]"#,
        )
        .unwrap();
        let mut reg = Registry::new(legacy);
        let now = Utc::now();

        let out = reg.fix_legacy("me", now);
        assert_eq!(out.value, 1);
        assert!(out.needs_write());
        let old = &reg.snapshot().records()[0];
        assert!(old.is_author("me"));
        assert_eq!(old.timestamp, Some(now));
        assert!(reg.snapshot().records()[1].is_author("u9"));

        assert_eq!(reg.fix_legacy("someone", now).value, 0);
    }

    #[test]
    fn replace_reports_changes() {
        let (mut reg, _) = registry_with(&[("A", "u1")]);
        let same = reg.snapshot().clone();
        assert!(!reg.replace(same));
        assert!(reg.replace(Snapshot::empty()));
        assert!(reg.snapshot().is_empty());
    }

    #[test]
    fn resolve_by_prefix() {
        let (reg, ids) = registry_with(&[("A", "u1")]);
        let full = ids[0].to_string();
        assert_eq!(reg.resolve(&full).unwrap(), ids[0]);
        assert_eq!(reg.resolve(&full[..8]).unwrap(), ids[0]);
        assert!(reg.resolve("ab").is_err());
        assert!(reg.resolve("zzzzzz").is_err());
    }
}
