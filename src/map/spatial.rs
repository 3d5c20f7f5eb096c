use std::collections::HashMap;

/// Spatial hash grid for O(1) region queries.
/// Divides the world into square cells of `cell_size` degrees.
pub struct SpatialGrid<T> {
    /// Grid cells indexed by (cell_x, cell_y)
    cells: HashMap<(i32, i32), Vec<usize>>,
    /// All items (indices into this vec stored in cells)
    items: Vec<(f64, f64, T)>,
    /// Cell size in degrees
    cell_size: f64,
}

impl<T> SpatialGrid<T> {
    /// Create a new spatial grid with given cell size in degrees
    pub fn new(cell_size: f64) -> Self {
        Self {
            cells: HashMap::new(),
            items: Vec::new(),
            cell_size,
        }
    }

    /// Convert lon/lat to cell coordinates
    #[inline(always)]
    fn to_cell(&self, lon: f64, lat: f64) -> (i32, i32) {
        let x = (lon / self.cell_size).floor() as i32;
        let y = (lat / self.cell_size).floor() as i32;
        (x, y)
    }

    /// Insert an item at a geographic position
    pub fn insert(&mut self, lon: f64, lat: f64, item: T) {
        let idx = self.items.len();
        self.items.push((lon, lat, item));

        let cell = self.to_cell(lon, lat);
        self.cells.entry(cell).or_default().push(idx);
    }

    /// Drop every item
    pub fn clear(&mut self) {
        self.cells.clear();
        self.items.clear();
    }

    /// Query items in a radius around a point (returns indices).
    /// Cell-granular: may include items slightly outside the radius.
    pub fn query_radius(&self, lon: f64, lat: f64, radius_degrees: f64) -> Vec<usize> {
        let center_cell = self.to_cell(lon, lat);

        // Calculate cell radius to check (round up)
        let cell_radius = (radius_degrees / self.cell_size).ceil() as i32;

        // Visiting more cells than there are items: a full scan is cheaper
        let span = 2 * cell_radius as i64 + 1;
        if span.saturating_mul(span) > self.items.len() as i64 {
            return (0..self.items.len()).collect();
        }

        let mut results = Vec::new();

        for dy in -cell_radius..=cell_radius {
            for dx in -cell_radius..=cell_radius {
                let cell = (center_cell.0 + dx, center_cell.1 + dy);

                if let Some(indices) = self.cells.get(&cell) {
                    results.extend_from_slice(indices);
                }
            }
        }

        results
    }

    /// Item closest to (lon, lat) within `radius_degrees`, by planar distance
    pub fn nearest(&self, lon: f64, lat: f64, radius_degrees: f64) -> Option<&T> {
        self.query_radius(lon, lat, radius_degrees)
            .into_iter()
            .filter_map(|idx| self.items.get(idx))
            .map(|(ilon, ilat, item)| {
                let d2 = (ilon - lon).powi(2) + (ilat - lat).powi(2);
                (d2, item)
            })
            .filter(|(d2, _)| *d2 <= radius_degrees * radius_degrees)
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, item)| item)
    }

    /// Get item by index
    #[inline(always)]
    pub fn get(&self, idx: usize) -> Option<&T> {
        self.items.get(idx).map(|(_, _, item)| item)
    }

    /// All items in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter().map(|(_, _, item)| item)
    }

    /// Number of items
    #[inline(always)]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if empty
    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
