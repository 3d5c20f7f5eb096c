mod geometry;
mod markers;
mod projection;
mod renderer;
mod spatial;

pub use markers::{Marker, MarkerSet, MarkerStyle};
pub use projection::{zoom_for_level, Viewport, FLY_DURATION};
pub use renderer::{Boundary, Glyph, GlyphKind, LineString, Lod, MapLayers, MapRenderer, Overlays};
