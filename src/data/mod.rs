use crate::map::{LineString, Lod, MapRenderer};
use anyhow::{Context, Result};
use geojson::{GeoJson, Geometry, Value};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

#[derive(Clone, Copy)]
enum Layer {
    Coastline(Lod),
    Border(Lod),
}

/// Natural Earth files looked up in the data directory
const BASEMAP_FILES: &[(&str, Layer)] = &[
    ("ne_110m_coastline.json", Layer::Coastline(Lod::Low)),
    ("ne_50m_coastline.json", Layer::Coastline(Lod::Medium)),
    ("ne_10m_coastline.json", Layer::Coastline(Lod::High)),
    ("ne_50m_borders.json", Layer::Border(Lod::Medium)),
    ("ne_10m_borders.json", Layer::Border(Lod::High)),
];

/// Load all available basemap GeoJSON into the map renderer.
/// Files are parsed in parallel; missing or broken files are skipped.
pub fn load_basemap(renderer: &mut MapRenderer, data_dir: &Path) {
    let parsed: Vec<(Layer, Vec<LineString>)> = BASEMAP_FILES
        .par_iter()
        .filter_map(|&(filename, layer)| {
            let path = data_dir.join(filename);
            if !path.exists() {
                return None;
            }
            match load_lines(&path) {
                Ok(lines) => Some((layer, lines)),
                Err(e) => {
                    warn!("failed to load {}: {:#}", filename, e);
                    None
                }
            }
        })
        .collect();

    for (layer, lines) in parsed {
        let count = lines.len();
        for line in lines {
            match layer {
                Layer::Coastline(lod) => renderer.add_coastline(line, lod),
                Layer::Border(lod) => renderer.add_border(line, lod),
            }
        }
        match layer {
            Layer::Coastline(lod) => info!(?lod, count, "loaded coastlines"),
            Layer::Border(lod) => info!(?lod, count, "loaded borders"),
        }
    }
}

/// Read a GeoJSON file and flatten it to line strings
fn load_lines(path: &Path) -> Result<Vec<LineString>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let geojson: GeoJson = content.parse().context("parsing GeoJSON")?;
    let mut lines = Vec::new();
    process_geojson_lines(&geojson, |line| lines.push(line));
    Ok(lines)
}

/// Process GeoJSON and extract line features
fn process_geojson_lines<F>(geojson: &GeoJson, mut add_line: F)
where
    F: FnMut(LineString),
{
    match geojson {
        GeoJson::FeatureCollection(fc) => {
            for feature in &fc.features {
                if let Some(ref geometry) = feature.geometry {
                    process_geometry_lines(geometry, &mut add_line);
                }
            }
        }
        GeoJson::Feature(f) => {
            if let Some(ref geometry) = f.geometry {
                process_geometry_lines(geometry, &mut add_line);
            }
        }
        GeoJson::Geometry(geometry) => {
            process_geometry_lines(geometry, &mut add_line);
        }
    }
}

/// Outline rings of a geometry; polygons contribute their exterior ring only
pub fn geometry_lines(geometry: &Geometry) -> Vec<LineString> {
    let mut lines = Vec::new();
    process_geometry_lines(geometry, &mut |line| lines.push(line));
    lines
}

fn process_geometry_lines<F>(geometry: &Geometry, add_line: &mut F)
where
    F: FnMut(LineString),
{
    let to_line = |coords: &Vec<Vec<f64>>| -> LineString { coords.iter().map(|c| (c[0], c[1])).collect() };
    match &geometry.value {
        Value::LineString(coords) => add_line(to_line(coords)),
        Value::MultiLineString(lines) => {
            for coords in lines {
                add_line(to_line(coords));
            }
        }
        Value::Polygon(rings) => {
            if let Some(exterior) = rings.first() {
                add_line(to_line(exterior));
            }
        }
        Value::MultiPolygon(polygons) => {
            for rings in polygons {
                if let Some(exterior) = rings.first() {
                    add_line(to_line(exterior));
                }
            }
        }
        Value::GeometryCollection(geometries) => {
            for g in geometries {
                process_geometry_lines(g, add_line);
            }
        }
        _ => {}
    }
}

/// Generate a simple world map outline for when no data file is available
pub fn generate_simple_world(renderer: &mut MapRenderer) {
    let continents: [&[(f64, f64)]; 6] = [
        // North America
        &[
            (-168.0, 65.0), (-166.0, 60.0), (-141.0, 60.0), (-130.0, 55.0),
            (-125.0, 48.0), (-124.0, 40.0), (-117.0, 32.0), (-110.0, 25.0),
            (-97.0, 25.0), (-97.0, 28.0), (-82.0, 24.0), (-80.0, 25.0),
            (-81.0, 31.0), (-75.0, 35.0), (-70.0, 41.0), (-67.0, 45.0),
            (-65.0, 47.0), (-55.0, 47.0), (-52.0, 47.0), (-55.0, 52.0),
            (-58.0, 55.0), (-64.0, 60.0), (-73.0, 62.0), (-80.0, 63.0),
            (-95.0, 62.0), (-110.0, 68.0), (-130.0, 70.0), (-145.0, 70.0),
            (-168.0, 65.0),
        ],
        // South America
        &[
            (-80.0, 10.0), (-75.0, 5.0), (-70.0, 5.0), (-60.0, 5.0),
            (-50.0, 0.0), (-35.0, -5.0), (-35.0, -10.0), (-38.0, -15.0),
            (-40.0, -22.0), (-48.0, -25.0), (-55.0, -34.0), (-58.0, -38.0),
            (-65.0, -42.0), (-68.0, -50.0), (-75.0, -52.0), (-75.0, -45.0),
            (-72.0, -40.0), (-72.0, -30.0), (-70.0, -20.0), (-70.0, -15.0),
            (-80.0, -5.0), (-80.0, 0.0), (-80.0, 10.0),
        ],
        // Europe
        &[
            (-10.0, 36.0), (-5.0, 36.0), (0.0, 38.0), (5.0, 43.0),
            (10.0, 44.0), (15.0, 45.0), (20.0, 40.0), (25.0, 37.0),
            (30.0, 40.0), (35.0, 42.0), (40.0, 43.0), (40.0, 55.0),
            (30.0, 60.0), (25.0, 65.0), (20.0, 70.0), (10.0, 71.0),
            (5.0, 62.0), (5.0, 58.0), (-5.0, 58.0), (-10.0, 52.0),
            (-5.0, 48.0), (-5.0, 43.0), (-10.0, 36.0),
        ],
        // Africa
        &[
            (-17.0, 15.0), (-17.0, 20.0), (-15.0, 28.0), (-5.0, 35.0),
            (10.0, 37.0), (20.0, 33.0), (25.0, 32.0), (35.0, 30.0),
            (35.0, 20.0), (42.0, 12.0), (50.0, 12.0), (45.0, 5.0),
            (35.0, -5.0), (35.0, -20.0), (30.0, -30.0), (20.0, -35.0),
            (18.0, -35.0), (15.0, -30.0), (10.0, -15.0), (10.0, 0.0),
            (5.0, 5.0), (-5.0, 5.0), (-10.0, 10.0), (-17.0, 15.0),
        ],
        // Asia
        &[
            (35.0, 42.0), (40.0, 43.0), (50.0, 40.0), (55.0, 37.0),
            (60.0, 25.0), (65.0, 25.0), (70.0, 20.0), (75.0, 15.0),
            (80.0, 8.0), (80.0, 15.0), (88.0, 22.0), (92.0, 22.0),
            (95.0, 16.0), (100.0, 14.0), (105.0, 10.0), (110.0, 20.0),
            (115.0, 22.0), (120.0, 22.0), (122.0, 25.0), (125.0, 30.0),
            (130.0, 35.0), (135.0, 35.0), (140.0, 40.0), (145.0, 45.0),
            (145.0, 50.0), (140.0, 55.0), (135.0, 55.0), (130.0, 52.0),
            (130.0, 43.0), (120.0, 40.0), (110.0, 45.0), (90.0, 50.0),
            (70.0, 55.0), (60.0, 55.0), (50.0, 50.0), (40.0, 43.0),
        ],
        // Australia
        &[
            (115.0, -20.0), (120.0, -18.0), (130.0, -12.0), (140.0, -12.0),
            (145.0, -15.0), (150.0, -25.0), (153.0, -30.0), (150.0, -35.0),
            (145.0, -38.0), (140.0, -38.0), (135.0, -35.0), (130.0, -32.0),
            (125.0, -32.0), (115.0, -35.0), (115.0, -25.0), (115.0, -20.0),
        ],
    ];

    for outline in continents {
        renderer.add_coastline(outline.to_vec(), Lod::Low);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polygon_uses_exterior_ring() {
        let geometry = Geometry::new(Value::Polygon(vec![
            vec![vec![0.0, 0.0], vec![1.0, 0.0], vec![1.0, 1.0], vec![0.0, 0.0]],
            vec![vec![0.2, 0.2], vec![0.4, 0.2], vec![0.2, 0.2]],
        ]));
        let lines = geometry_lines(&geometry);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 4);
        assert_eq!(lines[0][1], (1.0, 0.0));
    }

    #[test]
    fn test_multipolygon_and_points() {
        let geometry = Geometry::new(Value::GeometryCollection(vec![
            Geometry::new(Value::MultiPolygon(vec![
                vec![vec![vec![0.0, 0.0], vec![1.0, 1.0]]],
                vec![vec![vec![5.0, 5.0], vec![6.0, 6.0]]],
            ])),
            Geometry::new(Value::Point(vec![3.0, 3.0])),
        ]));
        assert_eq!(geometry_lines(&geometry).len(), 2);
    }

    #[test]
    fn test_load_basemap_from_dir() {
        let dir = std::env::temp_dir().join(format!("places-map-basemap-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("ne_110m_coastline.json"),
            r#"{"type":"FeatureCollection","features":[
                {"type":"Feature","properties":{},"geometry":{"type":"LineString","coordinates":[[0,0],[10,10]]}}
            ]}"#,
        )
        .unwrap();
        fs::write(dir.join("ne_50m_borders.json"), "not json").unwrap();

        let mut renderer = MapRenderer::new();
        load_basemap(&mut renderer, &dir);
        assert_eq!(renderer.coastlines_low.len(), 1);
        assert!(renderer.borders_medium.is_empty());
        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_simple_world_has_coastlines() {
        let mut renderer = MapRenderer::new();
        generate_simple_world(&mut renderer);
        assert!(renderer.has_data());
        assert_eq!(renderer.coastlines_low.len(), 6);
    }
}
