use crate::map::spatial::SpatialGrid;
use crate::map::Viewport;
use crate::place::Place;
use crate::sync::MarkerLayer;

/// Grid cell size for marker hit testing, in degrees
const CELL_DEGREES: f64 = 0.5;

/// Marker colour class derived from moderation flags
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MarkerStyle {
    Verified,
    Unverified,
    Hidden,
}

impl MarkerStyle {
    pub fn for_place(place: &Place) -> Self {
        if place.hidden {
            MarkerStyle::Hidden
        } else if place.verified {
            MarkerStyle::Verified
        } else {
            MarkerStyle::Unverified
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    pub id: String,
    pub name: String,
    pub lon: f64,
    pub lat: f64,
    pub style: MarkerStyle,
}

/// Place markers currently on the map, indexed for click lookup
pub struct MarkerSet {
    grid: SpatialGrid<Marker>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self {
            grid: SpatialGrid::new(CELL_DEGREES),
        }
    }

    /// Markers in draw order
    pub fn iter(&self) -> impl Iterator<Item = &Marker> {
        self.grid.iter()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.iter().map(|m| m.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Marker under braille pixel (px, py), within `tolerance_px` pixels
    pub fn hit(&self, viewport: &Viewport, px: i32, py: i32, tolerance_px: i32) -> Option<&Marker> {
        let (lon, lat) = viewport.unproject(px, py);
        let radius = viewport.degrees_per_pixel() * tolerance_px as f64;
        let candidate = self.grid.nearest(lon, lat, radius * 4.0)?;
        // Confirm in screen space, Mercator stretches latitude
        let (mx, my) = viewport.project(candidate.lon, candidate.lat);
        let within = (mx - px).abs() <= tolerance_px && (my - py).abs() <= tolerance_px;
        within.then_some(candidate)
    }
}

impl Default for MarkerSet {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkerLayer for MarkerSet {
    fn redraw(&mut self, places: &[&Place]) {
        self.grid.clear();
        for place in places {
            self.grid.insert(
                place.longitude,
                place.latitude,
                Marker {
                    id: place.id.clone(),
                    name: place.name.clone(),
                    lon: place.longitude,
                    lat: place.latitude,
                    style: MarkerStyle::for_place(place),
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::tests::place;

    #[test]
    fn test_redraw_discards_stale_markers() {
        let mut set = MarkerSet::new();
        let a = place("a", "Cafe", 1.0, 1.0);
        let b = place("b", "Park", 2.0, 2.0);
        set.redraw(&[&a, &b]);
        assert_eq!(set.ids(), ["a", "b"]);
        set.redraw(&[&b]);
        assert_eq!(set.ids(), ["b"]);
        set.redraw(&[]);
        assert!(set.is_empty());
    }

    #[test]
    fn test_style_from_flags() {
        let mut p = place("a", "Cafe", 1.0, 1.0);
        assert_eq!(MarkerStyle::for_place(&p), MarkerStyle::Unverified);
        p.verified = true;
        assert_eq!(MarkerStyle::for_place(&p), MarkerStyle::Verified);
        p.hidden = true;
        assert_eq!(MarkerStyle::for_place(&p), MarkerStyle::Hidden);
    }

    #[test]
    fn test_hit_testing() {
        let mut set = MarkerSet::new();
        let a = place("a", "Cafe", 0.0, 0.0);
        let b = place("b", "Cafe", 0.0, 90.0);
        set.redraw(&[&a, &b]);
        let vp = Viewport::new(0.0, 0.0, 1.0, 40, 40);
        // a projects to (20, 20), b to (30, 20)
        assert_eq!(set.hit(&vp, 21, 19, 4).map(|m| m.id.as_str()), Some("a"));
        assert_eq!(set.hit(&vp, 29, 20, 4).map(|m| m.id.as_str()), Some("b"));
        assert_eq!(set.hit(&vp, 25, 35, 4), None);
    }
}
