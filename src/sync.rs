//! Keeps the map markers, the sidebar list and the detail panel showing
//! the same filtered subset of the place collection.

use crate::place::{FilterState, Place, PlaceCollection};

/// Shown in the list panel when no place passes the filters
pub const EMPTY_MESSAGE: &str = "No places match the current filters";

/// Map layer holding one marker per shown place
pub trait MarkerLayer {
    /// Remove every existing marker, then draw one per place in order
    fn redraw(&mut self, places: &[&Place]);
}

/// Sidebar list of place cards
pub trait ListView {
    fn show(&mut self, places: &[&Place]);
    fn show_empty(&mut self, message: &str);
}

/// Panel showing one place in full
pub trait DetailView {
    fn open_id(&self) -> Option<&str>;
    fn close(&mut self);
}

/// What to do with an open detail panel whose place was filtered out
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StaleDetail {
    #[default]
    Close,
    KeepOpen,
}

/// Result of one refresh pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Refresh {
    /// Ids rendered to both markers and list, in order
    pub shown: Vec<String>,
    pub detail_closed: bool,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ViewSynchronizer {
    stale_detail: StaleDetail,
}

impl ViewSynchronizer {
    pub fn new(stale_detail: StaleDetail) -> Self {
        Self { stale_detail }
    }

    pub fn refresh(
        &self,
        collection: &PlaceCollection,
        filter: &FilterState,
        markers: &mut impl MarkerLayer,
        list: &mut impl ListView,
        detail: &mut impl DetailView,
    ) -> Refresh {
        let filtered = collection.filtered(filter);

        markers.redraw(&filtered);
        if filtered.is_empty() {
            list.show_empty(EMPTY_MESSAGE);
        } else {
            list.show(&filtered);
        }

        let stale = detail
            .open_id()
            .is_some_and(|id| !filtered.iter().any(|p| p.id == id));
        let detail_closed = stale && self.stale_detail == StaleDetail::Close;
        if detail_closed {
            detail.close();
        }

        Refresh {
            shown: filtered.iter().map(|p| p.id.clone()).collect(),
            detail_closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::tests::place;
    use crate::place::{BoundingBox, CategoryFilter};

    #[derive(Default)]
    struct Markers {
        ids: Vec<String>,
        redraws: usize,
    }

    impl MarkerLayer for Markers {
        fn redraw(&mut self, places: &[&Place]) {
            self.ids.clear();
            self.ids.extend(places.iter().map(|p| p.id.clone()));
            self.redraws += 1;
        }
    }

    #[derive(Default)]
    struct List {
        ids: Vec<String>,
        empty: Option<String>,
    }

    impl ListView for List {
        fn show(&mut self, places: &[&Place]) {
            self.empty = None;
            self.ids = places.iter().map(|p| p.id.clone()).collect();
        }

        fn show_empty(&mut self, message: &str) {
            self.ids.clear();
            self.empty = Some(message.to_string());
        }
    }

    #[derive(Default)]
    struct Detail {
        open: Option<String>,
    }

    impl DetailView for Detail {
        fn open_id(&self) -> Option<&str> {
            self.open.as_deref()
        }

        fn close(&mut self) {
            self.open = None;
        }
    }

    fn collection() -> PlaceCollection {
        let mut c = PlaceCollection::new();
        c.replace_all(vec![place("1", "Cafe", 10.0, 10.0), place("2", "Park", 50.0, 50.0)]);
        c
    }

    fn run(c: &PlaceCollection, f: &FilterState, detail: &mut Detail) -> (Markers, List, Refresh) {
        let mut markers = Markers::default();
        let mut list = List::default();
        let r = ViewSynchronizer::default().refresh(c, f, &mut markers, &mut list, detail);
        (markers, list, r)
    }

    fn unit_box() -> Option<BoundingBox> {
        BoundingBox::new(0.0, 20.0, 0.0, 20.0)
    }

    #[test]
    fn test_category_only() {
        let f = FilterState {
            category: CategoryFilter::only("Cafe"),
            ..FilterState::default()
        };
        let (markers, list, r) = run(&collection(), &f, &mut Detail::default());
        assert_eq!(r.shown, ["1"]);
        assert_eq!(markers.ids, list.ids);
    }

    #[test]
    fn test_bounds_only() {
        let f = FilterState {
            bounds: unit_box(),
            ..FilterState::default()
        };
        let (markers, list, r) = run(&collection(), &f, &mut Detail::default());
        assert_eq!(r.shown, ["1"]);
        assert_eq!(markers.ids, list.ids);
    }

    #[test]
    fn test_no_match_renders_empty_state() {
        let f = FilterState {
            category: CategoryFilter::only("Park"),
            bounds: unit_box(),
            ..FilterState::default()
        };
        let (markers, list, r) = run(&collection(), &f, &mut Detail::default());
        assert!(r.shown.is_empty());
        assert!(markers.ids.is_empty());
        assert_eq!(markers.redraws, 1);
        assert!(list.ids.is_empty());
        assert_eq!(list.empty.as_deref(), Some(EMPTY_MESSAGE));
    }

    #[test]
    fn test_markers_and_list_agree_for_every_filter() {
        let mut c = PlaceCollection::new();
        c.replace_all(
            (0..40)
                .map(|i| {
                    let cat = crate::place::CATEGORIES[i % 4];
                    place(&i.to_string(), cat, (i as f64) * 2.0 - 40.0, (i as f64) * 4.0 - 80.0)
                })
                .collect(),
        );
        let boxes = [None, unit_box(), BoundingBox::new(-40.0, 0.0, -80.0, 0.0)];
        let mut category = CategoryFilter::All;
        for _ in 0..=crate::place::CATEGORIES.len() {
            for bounds in boxes {
                let f = FilterState {
                    category: category.clone(),
                    bounds,
                    query: String::new(),
                };
                let (markers, list, r) = run(&c, &f, &mut Detail::default());
                assert_eq!(markers.ids, list.ids);
                assert_eq!(markers.ids, r.shown);
            }
            category = category.next();
        }
    }

    #[test]
    fn test_refresh_is_idempotent() {
        let c = collection();
        let f = FilterState {
            bounds: unit_box(),
            ..FilterState::default()
        };
        let mut markers = Markers::default();
        let mut list = List::default();
        let mut detail = Detail::default();
        let sync = ViewSynchronizer::default();
        let first = sync.refresh(&c, &f, &mut markers, &mut list, &mut detail);
        let ids_after_first = markers.ids.clone();
        let second = sync.refresh(&c, &f, &mut markers, &mut list, &mut detail);
        assert_eq!(first, second);
        assert_eq!(markers.ids, ids_after_first);
    }

    #[test]
    fn test_stale_detail_closes() {
        let f = FilterState {
            category: CategoryFilter::only("Cafe"),
            ..FilterState::default()
        };
        let mut detail = Detail {
            open: Some("2".to_string()),
        };
        let (_, _, r) = run(&collection(), &f, &mut detail);
        assert!(r.detail_closed);
        assert_eq!(detail.open, None);

        let mut detail = Detail {
            open: Some("1".to_string()),
        };
        let (_, _, r) = run(&collection(), &f, &mut detail);
        assert!(!r.detail_closed);
        assert_eq!(detail.open.as_deref(), Some("1"));
    }

    #[test]
    fn test_stale_detail_can_stay_open() {
        let f = FilterState {
            category: CategoryFilter::only("Cafe"),
            ..FilterState::default()
        };
        let mut detail = Detail {
            open: Some("2".to_string()),
        };
        let sync = ViewSynchronizer::new(StaleDetail::KeepOpen);
        let r = sync.refresh(
            &collection(),
            &f,
            &mut Markers::default(),
            &mut List::default(),
            &mut detail,
        );
        assert!(!r.detail_closed);
        assert_eq!(detail.open.as_deref(), Some("2"));
    }
}
