use glam::DVec3;
use std::f64::consts::PI;
use std::time::{Duration, Instant};

use crate::place::Coordinate;

pub const MIN_ZOOM: f64 = 0.5;
/// Street level (slippy-map level 19)
pub const MAX_ZOOM: f64 = 131_072.0;

/// Default duration for animated camera moves
pub const FLY_DURATION: Duration = Duration::from_millis(1500);

/// Convert a slippy-map zoom level to the viewport zoom factor.
/// Level 2 shows the whole world across the canvas.
pub fn zoom_for_level(level: u8) -> f64 {
    2f64.powi(level as i32 - 2).clamp(MIN_ZOOM, MAX_ZOOM)
}

/// An in-progress animated move; interpolates (lon, lat, log2 zoom)
#[derive(Clone)]
struct Flight {
    from: DVec3,
    to: DVec3,
    started: Instant,
    duration: Duration,
}

impl Flight {
    fn at(&self, now: Instant) -> (DVec3, bool) {
        let elapsed = now.saturating_duration_since(self.started).as_secs_f64();
        let t = (elapsed / self.duration.as_secs_f64().max(f64::EPSILON)).clamp(0.0, 1.0);
        // Smoothstep easing
        let eased = t * t * (3.0 - 2.0 * t);
        (self.from.lerp(self.to, eased), t >= 1.0)
    }
}

/// Viewport representing the visible map area and zoom level
#[derive(Clone)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-90 to 90)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
    flight: Option<Flight>,
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
            flight: None,
        }
    }

    /// Create a world view (shows entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    /// Jump without animation
    pub fn set_view(&mut self, center: Coordinate, level: u8) {
        self.flight = None;
        self.center_lon = center.lon;
        self.center_lat = center.lat.clamp(-85.0, 85.0);
        self.zoom = zoom_for_level(level);
    }

    /// Start an animated move to `target` at the given zoom level
    pub fn fly_to(&mut self, target: Coordinate, level: u8, duration: Duration) {
        self.fly_to_at(target, level, duration, Instant::now());
    }

    pub fn fly_to_at(&mut self, target: Coordinate, level: u8, duration: Duration, now: Instant) {
        let from = DVec3::new(self.center_lon, self.center_lat, self.zoom.log2());
        let to = DVec3::new(
            target.lon,
            target.lat.clamp(-85.0, 85.0),
            zoom_for_level(level).log2(),
        );
        self.flight = Some(Flight {
            from,
            to,
            started: now,
            duration,
        });
    }

    pub fn is_flying(&self) -> bool {
        self.flight.is_some()
    }

    /// Advance any running flight; returns true while still animating
    pub fn tick(&mut self, now: Instant) -> bool {
        let Some(flight) = &self.flight else {
            return false;
        };
        let (pos, done) = flight.at(now);
        self.center_lon = pos.x;
        self.center_lat = pos.y;
        self.zoom = pos.z.exp2().clamp(MIN_ZOOM, MAX_ZOOM);
        if done {
            self.flight = None;
        }
        !done
    }

    /// Center of the view as a coordinate
    pub fn center(&self) -> Coordinate {
        Coordinate::new(self.center_lat, self.center_lon)
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.flight = None;
        let scale = 360.0 / (self.zoom * self.width.max(1) as f64);
        self.center_lon += dx as f64 * scale;
        self.center_lat -= dy as f64 * scale * 0.5; // Mercator distortion

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }

        // Clamp latitude
        self.center_lat = self.center_lat.clamp(-85.0, 85.0);
    }

    /// Zoom in by a factor
    pub fn zoom_in(&mut self) {
        self.flight = None;
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    /// Zoom out by a factor
    pub fn zoom_out(&mut self) {
        self.flight = None;
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: i32, py: i32) {
        self.zoom_at(px, py, 1.0 / 1.5);
    }

    /// Zoom by factor towards a specific pixel location
    fn zoom_at(&mut self, px: i32, py: i32, factor: f64) {
        // Get the geographic coordinates under the mouse
        let (lon, lat) = self.unproject(px, py);

        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);

        // Pan so that point stays under the mouse
        let (new_px, new_py) = self.project(lon, lat);
        self.pan(new_px - px, new_py - py);
    }

    /// Degrees of longitude covered by one pixel
    pub fn degrees_per_pixel(&self) -> f64 {
        360.0 / (self.zoom * self.width.max(1) as f64)
    }

    /// Unproject pixel coordinates back to geographic coordinates (lon, lat)
    pub fn unproject(&self, px: i32, py: i32) -> (f64, f64) {
        let scale = self.zoom * self.width as f64;

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let x = (px as f64 - self.width as f64 / 2.0) / scale + center_x;
        let y = (py as f64 - self.height as f64 / 2.0) / scale + center_y;

        let lon = x * 360.0 - 180.0;

        // Inverse Mercator for latitude
        let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
        let lat = lat_rad * 180.0 / PI;

        (lon, lat)
    }

    /// Project a geographic coordinate (lon, lat) to pixel coordinates
    pub fn project(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon + 180.0) / 360.0;
        let y = mercator_y(lat);

        let center_x = (self.center_lon + 180.0) / 360.0;
        let center_y = mercator_y(self.center_lat);

        let scale = self.zoom * self.width as f64;

        let px = ((x - center_x) * scale + self.width as f64 / 2.0) as i32;
        let py = ((y - center_y) * scale + self.height as f64 / 2.0) as i32;

        (px, py)
    }

    /// Check if a projected point is visible in the viewport
    pub fn is_visible(&self, px: i32, py: i32) -> bool {
        px >= -10
            && px < self.width as i32 + 10
            && py >= -10
            && py < self.height as i32 + 10
    }

    /// Check if a line segment might be visible (rough bounding box check)
    pub fn line_might_be_visible(&self, p1: (i32, i32), p2: (i32, i32)) -> bool {
        let min_x = p1.0.min(p2.0);
        let max_x = p1.0.max(p2.0);
        let min_y = p1.1.min(p2.1);
        let max_y = p1.1.max(p2.1);

        max_x >= 0
            && min_x < self.width as i32
            && max_y >= 0
            && min_y < self.height as i32
    }
}

/// Web Mercator normalized y in [0, 1] (0 = north)
#[inline(always)]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-85.05, 85.05) * PI / 180.0;
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}
