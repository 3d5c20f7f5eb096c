use super::{Coordinate, Place, CATEGORIES};

/// Geographic rectangle in degrees.
/// Boxes crossing the antimeridian (west > east) are not handled.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl BoundingBox {
    /// Returns `None` when south > north
    pub fn new(south: f64, north: f64, west: f64, east: f64) -> Option<Self> {
        if south <= north {
            Some(Self { south, north, west, east })
        } else {
            None
        }
    }

    /// Inclusive containment on all four edges
    #[inline(always)]
    pub fn contains(&self, c: Coordinate) -> bool {
        self.south <= c.lat && c.lat <= self.north && self.west <= c.lon && c.lon <= self.east
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new((self.south + self.north) * 0.5, (self.west + self.east) * 0.5)
    }
}

/// Active category selection; `All` is the wildcard
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(String),
}

impl CategoryFilter {
    pub fn only(label: &str) -> Self {
        CategoryFilter::Only(label.to_string())
    }

    /// Case-sensitive exact match on the category label
    #[inline(always)]
    pub fn matches(&self, place: &Place) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(label) => place.category == *label,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            CategoryFilter::All => "All",
            CategoryFilter::Only(label) => label,
        }
    }

    /// Cycle All -> first category -> ... -> last category -> All
    pub fn next(&self) -> Self {
        self.step(1)
    }

    pub fn prev(&self) -> Self {
        self.step(CATEGORIES.len())
    }

    fn step(&self, by: usize) -> Self {
        // Slot 0 is All, slots 1..=n are the fixed categories
        let slots = CATEGORIES.len() + 1;
        let current = match self {
            CategoryFilter::All => 0,
            CategoryFilter::Only(label) => CATEGORIES
                .iter()
                .position(|c| c == label)
                .map(|i| i + 1)
                .unwrap_or(0),
        };
        match (current + by) % slots {
            0 => CategoryFilter::All,
            i => CategoryFilter::only(CATEGORIES[i - 1]),
        }
    }
}

/// Everything that restricts which places are shown.
/// All predicates are combined conjunctively.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FilterState {
    pub category: CategoryFilter,
    pub bounds: Option<BoundingBox>,
    /// Free-text filter over name, description and address
    pub query: String,
}

impl FilterState {
    pub fn matches(&self, place: &Place) -> bool {
        self.prepare().matches(place)
    }

    /// Normalise the query once for a pass over many places
    pub fn prepare(&self) -> PreparedFilter<'_> {
        let query = self.query.trim();
        PreparedFilter {
            state: self,
            needle: (!query.is_empty()).then(|| query.to_lowercase()),
        }
    }

    /// True when nothing restricts the result set
    pub fn is_unfiltered(&self) -> bool {
        self.category == CategoryFilter::All && self.bounds.is_none() && self.query.trim().is_empty()
    }
}

/// A `FilterState` with its text query already lowercased
pub struct PreparedFilter<'a> {
    state: &'a FilterState,
    needle: Option<String>,
}

impl PreparedFilter<'_> {
    pub fn matches(&self, place: &Place) -> bool {
        self.state.category.matches(place)
            && self.state.bounds.map_or(true, |b| b.contains(place.coordinate()))
            && self.matches_query(place)
    }

    fn matches_query(&self, place: &Place) -> bool {
        let Some(needle) = self.needle.as_deref() else {
            return true;
        };
        [&place.name, &place.description, &place.address]
            .into_iter()
            .any(|field| contains_folded(field, needle))
    }
}

/// Case-insensitive `contains` against an already lowercased needle.
/// ASCII haystacks are compared in place; others are lowercased first.
fn contains_folded(haystack: &str, needle: &str) -> bool {
    if haystack.is_ascii() {
        let needle = needle.as_bytes();
        return needle.len() <= haystack.len()
            && haystack
                .as_bytes()
                .windows(needle.len())
                .any(|w| w.eq_ignore_ascii_case(needle));
    }
    haystack.to_lowercase().contains(needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::tests::place;

    fn unit_box() -> BoundingBox {
        BoundingBox::new(0.0, 20.0, 0.0, 20.0).unwrap()
    }

    #[test]
    fn test_contains_inclusive_edges() {
        let b = unit_box();
        assert!(b.contains(Coordinate::new(0.0, 0.0)));
        assert!(b.contains(Coordinate::new(20.0, 20.0)));
        assert!(b.contains(Coordinate::new(10.0, 10.0)));
    }

    #[test]
    fn test_contains_rejects_each_side() {
        let b = unit_box();
        assert!(!b.contains(Coordinate::new(-0.001, 10.0)));
        assert!(!b.contains(Coordinate::new(20.001, 10.0)));
        assert!(!b.contains(Coordinate::new(10.0, -0.001)));
        assert!(!b.contains(Coordinate::new(10.0, 20.001)));
    }

    #[test]
    fn test_box_requires_south_le_north() {
        assert!(BoundingBox::new(10.0, 5.0, 0.0, 1.0).is_none());
        assert!(BoundingBox::new(5.0, 5.0, 0.0, 1.0).is_some());
    }

    #[test]
    fn test_no_antimeridian_wrap() {
        // west > east is taken literally, so nothing matches
        let b = BoundingBox::new(-10.0, 10.0, 170.0, -170.0).unwrap();
        assert!(!b.contains(Coordinate::new(0.0, 175.0)));
        assert!(!b.contains(Coordinate::new(0.0, -175.0)));
    }

    #[test]
    fn test_all_matches_everything() {
        for cat in CATEGORIES.iter().chain(["weird", ""].iter()) {
            assert!(CategoryFilter::All.matches(&place("1", cat, 0.0, 0.0)));
        }
    }

    #[test]
    fn test_category_is_case_sensitive() {
        let p = place("1", "Cafe", 0.0, 0.0);
        assert!(CategoryFilter::only("Cafe").matches(&p));
        assert!(!CategoryFilter::only("cafe").matches(&p));
        assert!(!CategoryFilter::only("Park").matches(&p));
    }

    #[test]
    fn test_category_cycle() {
        let mut f = CategoryFilter::All;
        for _ in 0..=CATEGORIES.len() {
            f = f.next();
        }
        assert_eq!(f, CategoryFilter::All);
        assert_eq!(CategoryFilter::All.next(), CategoryFilter::only("Cafe"));
        assert_eq!(CategoryFilter::All.prev(), CategoryFilter::only("Other"));
        assert_eq!(CategoryFilter::only("Cafe").prev(), CategoryFilter::All);
    }

    #[test]
    fn test_filters_combine() {
        let cafe = place("1", "Cafe", 10.0, 10.0);
        let park = place("2", "Park", 50.0, 50.0);

        let f = FilterState {
            category: CategoryFilter::only("Park"),
            bounds: Some(unit_box()),
            query: String::new(),
        };
        assert!(!f.matches(&cafe));
        assert!(!f.matches(&park));

        let f = FilterState { category: CategoryFilter::All, ..f };
        assert!(f.matches(&cafe));
        assert!(!f.matches(&park));
    }

    #[test]
    fn test_query_is_case_insensitive() {
        let mut p = place("1", "Cafe", 0.0, 0.0);
        p.address = "12 Harbour Road".to_string();
        let f = FilterState {
            query: "harbour".to_string(),
            ..FilterState::default()
        };
        assert!(f.matches(&p));
        let f = FilterState {
            query: "station".to_string(),
            ..FilterState::default()
        };
        assert!(!f.matches(&p));
        assert!(FilterState::default().is_unfiltered());
    }

    #[test]
    fn test_prepared_query_folds_case_once() {
        let mut p = place("1", "Cafe", 0.0, 0.0);
        p.name = "Café Über".to_string();
        p.description = "Best SOURDOUGH in town".to_string();
        let f = FilterState {
            query: "  Sourdough ".to_string(),
            ..FilterState::default()
        };
        let prepared = f.prepare();
        assert_eq!(prepared.needle.as_deref(), Some("sourdough"));
        assert!(prepared.matches(&p));

        let f = FilterState {
            query: "ÜBER".to_string(),
            ..FilterState::default()
        };
        assert!(f.prepare().matches(&p));
    }

    #[test]
    fn test_contains_folded() {
        assert!(contains_folded("12 Harbour Road", "harbour"));
        assert!(contains_folded("abc", "abc"));
        assert!(!contains_folded("ab", "abc"));
        assert!(!contains_folded("Harbour", "über"));
        assert!(contains_folded("Straße ÖL", "öl"));
    }
}
