use std::sync::Arc;

use tracing::warn;

use super::{FilterState, Place};

/// Canonical ordered set of places fetched from the backend.
/// Held behind an `Arc` so a render pass always sees one complete snapshot.
#[derive(Clone, Default)]
pub struct PlaceCollection {
    places: Arc<Vec<Place>>,
}

impl PlaceCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything with a freshly fetched list.
    /// Records with out-of-range coordinates are dropped.
    /// Returns the number of dropped records.
    pub fn replace_all(&mut self, places: Vec<Place>) -> usize {
        let total = places.len();
        let valid: Vec<Place> = places
            .into_iter()
            .filter(|p| {
                let ok = p.coordinate().is_valid();
                if !ok {
                    warn!(id = %p.id, lat = p.latitude, lon = p.longitude, "dropping place with invalid coordinate");
                }
                ok
            })
            .collect();
        let dropped = total - valid.len();
        self.places = Arc::new(valid);
        dropped
    }

    /// Swap in a refetched copy of one place, keeping its position.
    /// Unknown ids are appended. Returns false if the record was rejected.
    pub fn replace_one(&mut self, place: Place) -> bool {
        if !place.coordinate().is_valid() {
            warn!(id = %place.id, "refetched place has invalid coordinate, keeping old copy");
            return false;
        }
        let places = Arc::make_mut(&mut self.places);
        match places.iter_mut().find(|p| p.id == place.id) {
            Some(slot) => *slot = place,
            None => places.push(place),
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<&Place> {
        self.places.iter().find(|p| p.id == id)
    }

    /// Cheap handle on the current contents
    pub fn snapshot(&self) -> Arc<Vec<Place>> {
        Arc::clone(&self.places)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Place> {
        self.places.iter()
    }

    /// Stable filter: keeps insertion order, never sorts
    pub fn filtered<'a>(&'a self, filter: &FilterState) -> Vec<&'a Place> {
        let filter = filter.prepare();
        self.places.iter().filter(|p| filter.matches(p)).collect()
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::tests::place;
    use crate::place::CategoryFilter;

    #[test]
    fn test_replace_all_drops_invalid() {
        let mut c = PlaceCollection::new();
        let dropped = c.replace_all(vec![
            place("1", "Cafe", 10.0, 10.0),
            place("2", "Cafe", 91.0, 10.0),
            place("3", "Park", 0.0, 181.0),
            place("4", "Park", -90.0, -180.0),
        ]);
        assert_eq!(dropped, 2);
        let ids: Vec<_> = c.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["1", "4"]);
    }

    #[test]
    fn test_replace_one_keeps_position() {
        let mut c = PlaceCollection::new();
        c.replace_all(vec![place("1", "Cafe", 1.0, 1.0), place("2", "Park", 2.0, 2.0)]);
        let mut updated = place("1", "Cafe", 1.0, 1.0);
        updated.upvotes = 7;
        assert!(c.replace_one(updated));
        assert_eq!(c.iter().next().map(|p| p.upvotes), Some(7));
        assert_eq!(c.len(), 2);

        assert!(c.replace_one(place("3", "Bar", 3.0, 3.0)));
        assert_eq!(c.iter().last().map(|p| p.id.as_str()), Some("3"));

        assert!(!c.replace_one(place("2", "Park", 200.0, 2.0)));
        assert_eq!(c.get("2").map(|p| p.latitude), Some(2.0));
    }

    #[test]
    fn test_snapshot_is_not_affected_by_later_writes() {
        let mut c = PlaceCollection::new();
        c.replace_all(vec![place("1", "Cafe", 1.0, 1.0)]);
        let before = c.snapshot();
        let mut updated = place("1", "Cafe", 1.0, 1.0);
        updated.downvotes = 3;
        c.replace_one(updated);
        assert_eq!(before[0].downvotes, 0);
        assert_eq!(c.get("1").map(|p| p.downvotes), Some(3));
    }

    #[test]
    fn test_filtered_is_stable() {
        let mut c = PlaceCollection::new();
        c.replace_all(vec![
            place("b", "Cafe", 1.0, 1.0),
            place("a", "Park", 1.0, 1.0),
            place("c", "Cafe", 1.0, 1.0),
        ]);
        let f = FilterState {
            category: CategoryFilter::only("Cafe"),
            ..FilterState::default()
        };
        let ids: Vec<_> = c.filtered(&f).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
    }
}
