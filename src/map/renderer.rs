use crate::braille::BrailleCanvas;
use crate::map::geometry::{draw_line, draw_thick_line};
use crate::map::markers::{MarkerSet, MarkerStyle};
use crate::map::projection::{zoom_for_level, Viewport};
use crate::place::Coordinate;

/// A geographic line (sequence of lon/lat coordinates)
pub type LineString = Vec<(f64, f64)>;

/// Level of detail for map data
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lod {
    Low,    // 110m - world view
    Medium, // 50m - continental
    High,   // 10m - regional
}

impl Lod {
    /// Select LOD based on zoom level
    pub fn from_zoom(zoom: f64) -> Self {
        if zoom < 2.0 {
            Lod::Low
        } else if zoom < 8.0 {
            Lod::Medium
        } else {
            Lod::High
        }
    }
}

/// Polygon outline returned by reverse geocoding
#[derive(Clone, Debug, PartialEq)]
pub struct Boundary {
    pub name: String,
    pub rings: Vec<LineString>,
}

/// Display settings for map layers
#[derive(Clone)]
pub struct DisplaySettings {
    pub show_borders: bool,
    pub show_labels: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_borders: true,
            show_labels: true,
        }
    }
}

/// Marker glyph placed on a character cell
#[derive(Clone, Debug, PartialEq)]
pub struct Glyph {
    pub x: u16,
    pub y: u16,
    pub kind: GlyphKind,
}

#[derive(Clone, Debug, PartialEq)]
pub enum GlyphKind {
    Place { style: MarkerStyle, selected: bool },
    Label(String),
    User,
    Search,
}

/// Things drawn on top of the basemap for one frame
#[derive(Default)]
pub struct Overlays<'a> {
    pub boundary: Option<&'a Boundary>,
    pub user: Option<Coordinate>,
    pub search: Option<Coordinate>,
    pub selected: Option<&'a str>,
}

/// Rendered map, one canvas per colour plus glyphs
pub struct MapLayers {
    pub coastlines: BrailleCanvas,
    pub borders: BrailleCanvas,
    pub boundary: BrailleCanvas,
    pub glyphs: Vec<Glyph>,
}

/// Place names appear from this slippy-map level on
const LABEL_LEVEL: u8 = 12;

/// Map renderer with multi-resolution basemap data
pub struct MapRenderer {
    pub coastlines_low: Vec<LineString>,
    pub coastlines_medium: Vec<LineString>,
    pub coastlines_high: Vec<LineString>,
    pub borders_medium: Vec<LineString>,
    pub borders_high: Vec<LineString>,
    pub settings: DisplaySettings,
}

impl MapRenderer {
    pub fn new() -> Self {
        Self {
            coastlines_low: Vec::new(),
            coastlines_medium: Vec::new(),
            coastlines_high: Vec::new(),
            borders_medium: Vec::new(),
            borders_high: Vec::new(),
            settings: DisplaySettings::default(),
        }
    }

    /// Get coastlines for the given LOD, falling back to coarser data
    fn get_coastlines(&self, lod: Lod) -> &Vec<LineString> {
        match lod {
            Lod::High if !self.coastlines_high.is_empty() => &self.coastlines_high,
            Lod::High | Lod::Medium if !self.coastlines_medium.is_empty() => &self.coastlines_medium,
            _ => &self.coastlines_low,
        }
    }

    /// Get borders for the given LOD
    fn get_borders(&self, lod: Lod) -> &Vec<LineString> {
        match lod {
            Lod::High if !self.borders_high.is_empty() => &self.borders_high,
            _ => &self.borders_medium,
        }
    }

    /// Render basemap, overlays and markers for a `width` x `height` character area
    pub fn render(
        &self,
        width: usize,
        height: usize,
        viewport: &Viewport,
        markers: &MarkerSet,
        overlays: &Overlays,
    ) -> MapLayers {
        let lod = Lod::from_zoom(viewport.zoom);
        let mut layers = MapLayers {
            coastlines: BrailleCanvas::new(width, height),
            borders: BrailleCanvas::new(width, height),
            boundary: BrailleCanvas::new(width, height),
            glyphs: Vec::new(),
        };

        for line in self.get_coastlines(lod) {
            draw_linestring(&mut layers.coastlines, line, viewport, false);
        }

        if self.settings.show_borders {
            for line in self.get_borders(lod) {
                draw_linestring(&mut layers.borders, line, viewport, false);
            }
        }

        if let Some(boundary) = overlays.boundary {
            for ring in &boundary.rings {
                draw_linestring(&mut layers.boundary, ring, viewport, true);
            }
        }

        let show_labels = self.settings.show_labels && viewport.zoom >= zoom_for_level(LABEL_LEVEL);
        for marker in markers.iter() {
            let Some((x, y)) = to_cell(viewport, marker.lon, marker.lat, width, height) else {
                continue;
            };
            let selected = overlays.selected == Some(marker.id.as_str());
            layers.glyphs.push(Glyph {
                x,
                y,
                kind: GlyphKind::Place {
                    style: marker.style,
                    selected,
                },
            });
            if show_labels || selected {
                if let Some(label_x) = x.checked_add(2) {
                    layers.glyphs.push(Glyph {
                        x: label_x,
                        y,
                        kind: GlyphKind::Label(marker.name.clone()),
                    });
                }
            }
        }

        if let Some(c) = overlays.search {
            if let Some((x, y)) = to_cell(viewport, c.lon, c.lat, width, height) {
                layers.glyphs.push(Glyph { x, y, kind: GlyphKind::Search });
            }
        }

        if let Some(c) = overlays.user {
            if let Some((x, y)) = to_cell(viewport, c.lon, c.lat, width, height) {
                layers.glyphs.push(Glyph { x, y, kind: GlyphKind::User });
            }
        }

        layers
    }

    /// Add coastline data at a specific LOD
    pub fn add_coastline(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::Low => self.coastlines_low.push(line),
            Lod::Medium => self.coastlines_medium.push(line),
            Lod::High => self.coastlines_high.push(line),
        }
    }

    /// Add border data at a specific LOD
    pub fn add_border(&mut self, line: LineString, lod: Lod) {
        match lod {
            Lod::High => self.borders_high.push(line),
            Lod::Low | Lod::Medium => self.borders_medium.push(line),
        }
    }

    /// Check if any data is loaded
    pub fn has_data(&self) -> bool {
        !self.coastlines_low.is_empty()
            || !self.coastlines_medium.is_empty()
            || !self.coastlines_high.is_empty()
    }

    /// Toggle place name labels
    pub fn toggle_labels(&mut self) {
        self.settings.show_labels = !self.settings.show_labels;
    }

    /// Toggle borders
    pub fn toggle_borders(&mut self) {
        self.settings.show_borders = !self.settings.show_borders;
    }
}

impl Default for MapRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Project to a character cell inside a `width` x `height` area
fn to_cell(viewport: &Viewport, lon: f64, lat: f64, width: usize, height: usize) -> Option<(u16, u16)> {
    let (px, py) = viewport.project(lon, lat);
    if px < 0 || py < 0 {
        return None;
    }
    let (cx, cy) = ((px / 2) as usize, (py / 4) as usize);
    if cx >= width || cy >= height {
        return None;
    }
    Some((cx as u16, cy as u16))
}

/// Draw a linestring with viewport culling
fn draw_linestring(canvas: &mut BrailleCanvas, line: &LineString, viewport: &Viewport, thick: bool) {
    if line.len() < 2 {
        return;
    }

    let mut prev: Option<(i32, i32)> = None;

    for &(lon, lat) in line {
        let (px, py) = viewport.project(lon, lat);

        if let Some((prev_x, prev_y)) = prev {
            // Skip segments that wrap around the antimeridian
            let dist = ((px - prev_x).abs() + (py - prev_y).abs()) as usize;
            if dist < viewport.width && viewport.line_might_be_visible((prev_x, prev_y), (px, py)) {
                if thick {
                    draw_thick_line(canvas, prev_x, prev_y, px, py);
                } else {
                    draw_line(canvas, prev_x, prev_y, px, py);
                }
            }
        }

        prev = Some((px, py));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::tests::place;
    use crate::sync::MarkerLayer;

    fn viewport() -> Viewport {
        // 20x10 characters = 40x40 braille pixels
        Viewport::new(0.0, 0.0, 1.0, 40, 40)
    }

    #[test]
    fn test_markers_become_glyphs() {
        let mut markers = MarkerSet::new();
        let a = place("a", "Cafe", 0.0, 0.0);
        let mut b = place("b", "Park", 0.0, 90.0);
        b.verified = true;
        markers.redraw(&[&a, &b]);

        let renderer = MapRenderer::new();
        let overlays = Overlays {
            selected: Some("b"),
            ..Overlays::default()
        };
        let layers = renderer.render(20, 10, &viewport(), &markers, &overlays);
        let places: Vec<_> = layers
            .glyphs
            .iter()
            .filter_map(|g| match &g.kind {
                GlyphKind::Place { style, selected } => Some((g.x, g.y, *style, *selected)),
                _ => None,
            })
            .collect();
        assert_eq!(
            places,
            vec![
                (10, 5, MarkerStyle::Unverified, false),
                (15, 5, MarkerStyle::Verified, true),
            ]
        );
        // Labels only for the selected marker at world zoom
        let labels = layers
            .glyphs
            .iter()
            .filter(|g| matches!(g.kind, GlyphKind::Label(_)))
            .count();
        assert_eq!(labels, 1);
    }

    #[test]
    fn test_offscreen_markers_are_skipped() {
        let mut markers = MarkerSet::new();
        let far = place("far", "Cafe", 0.0, 170.0);
        markers.redraw(&[&far]);
        let vp = Viewport::new(0.0, 0.0, 8.0, 40, 40);
        let layers = MapRenderer::new().render(20, 10, &vp, &markers, &Overlays::default());
        assert!(layers.glyphs.is_empty());
    }

    #[test]
    fn test_boundary_is_drawn() {
        let boundary = Boundary {
            name: "Square".to_string(),
            rings: vec![vec![(-45.0, -20.0), (45.0, -20.0), (45.0, 20.0), (-45.0, 20.0), (-45.0, -20.0)]],
        };
        let overlays = Overlays {
            boundary: Some(&boundary),
            ..Overlays::default()
        };
        let layers = MapRenderer::new().render(20, 10, &viewport(), &MarkerSet::new(), &overlays);
        assert!(layers.boundary.inked().count() > 0);
        assert_eq!(layers.coastlines.inked().count(), 0);
    }

    #[test]
    fn test_border_toggle_keeps_coastlines() {
        let mut renderer = MapRenderer::new();
        renderer.add_coastline(vec![(-90.0, 0.0), (90.0, 0.0)], Lod::Low);
        renderer.add_border(vec![(0.0, -40.0), (0.0, 40.0)], Lod::Medium);
        let markers = MarkerSet::new();

        let layers = renderer.render(20, 10, &viewport(), &markers, &Overlays::default());
        assert!(layers.coastlines.inked().count() > 0);
        assert!(layers.borders.inked().count() > 0);

        renderer.toggle_borders();
        let layers = renderer.render(20, 10, &viewport(), &markers, &Overlays::default());
        assert!(layers.coastlines.inked().count() > 0);
        assert_eq!(layers.borders.inked().count(), 0);
    }

    #[test]
    fn test_lod_fallback() {
        let mut renderer = MapRenderer::new();
        renderer.add_coastline(vec![(0.0, 0.0), (1.0, 1.0)], Lod::Low);
        assert!(renderer.has_data());
        assert_eq!(renderer.get_coastlines(Lod::High).len(), 1);
        renderer.add_coastline(vec![(0.0, 0.0), (1.0, 1.0)], Lod::Medium);
        renderer.add_coastline(vec![(0.0, 0.0), (1.0, 1.0)], Lod::Medium);
        assert_eq!(renderer.get_coastlines(Lod::High).len(), 2);
        assert_eq!(renderer.get_coastlines(Lod::Low).len(), 1);
    }
}
