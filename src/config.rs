use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::place::Coordinate;

#[derive(Parser, Clone, Debug)]
#[command(name = "places-map", version, about = "Browse and share places on a terminal map")]
pub struct Config {
    /// Base URL of the places API
    #[arg(long, env = "PLACES_API_URL", default_value = "http://127.0.0.1:5000/api")]
    pub api_url: String,

    /// Nominatim-compatible geocoder
    #[arg(long, env = "PLACES_GEOCODER_URL", default_value = "https://nominatim.openstreetmap.org")]
    pub geocoder_url: String,

    /// IP geolocation endpoint returning `{latitude, longitude}`
    #[arg(long, env = "PLACES_IP_LOOKUP_URL", default_value = "https://ipapi.co/json/")]
    pub ip_lookup_url: String,

    /// Never look up the location from the IP address
    #[arg(long, env = "PLACES_NO_IP_LOOKUP")]
    pub no_ip_lookup: bool,

    /// Your position as `lat,lon`, used instead of device geolocation
    #[arg(long, env = "PLACES_POSITION", value_parser = Coordinate::parse, allow_hyphen_values = true)]
    pub position: Option<Coordinate>,

    /// Name attached to submitted places and comments
    #[arg(long, env = "PLACES_AUTHOR", default_value = "Anonymous")]
    pub author: String,

    /// Directory holding Natural Earth basemap GeoJSON
    #[arg(long, env = "PLACES_DATA_DIR", default_value = "data")]
    pub data_dir: PathBuf,

    /// Log file; the terminal is owned by the UI
    #[arg(long, env = "PLACES_LOG_FILE", default_value = "places-map.log")]
    pub log_file: PathBuf,

    #[arg(long, env = "PLACES_LOG_LEVEL", default_value = "info")]
    pub log_level: tracing::Level,

    /// HTTP timeout in seconds
    #[arg(long, env = "PLACES_TIMEOUT", default_value_t = 10)]
    pub timeout: u64,

    /// Browse-only landing view: no zoom keys, no submissions
    #[arg(long)]
    pub landing: bool,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout.max(1))
    }

    pub fn ip_lookup_url(&self) -> Option<&str> {
        (!self.no_ip_lookup).then_some(self.ip_lookup_url.as_str())
    }

    pub fn map_setup(&self) -> MapSetup {
        if self.landing {
            MapSetup::landing()
        } else {
            MapSetup::explore(self.position)
        }
    }
}

/// Which interactions are available
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Controls {
    pub zoom: bool,
    pub search: bool,
    pub submit: bool,
    pub engage: bool,
}

impl Controls {
    pub fn all() -> Self {
        Self {
            zoom: true,
            search: true,
            submit: true,
            engage: true,
        }
    }
}

/// Where the camera starts
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum InitialView {
    /// Known position at street-ish level
    At { center: Coordinate, level: u8 },
    /// Start wide, then fly to the located position at `level`
    Locate { fallback_level: u8, level: u8 },
}

/// Parameters for the one map setup routine
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MapSetup {
    pub controls: Controls,
    pub initial_view: InitialView,
}

/// Default camera target when nothing is known
pub const WORLD_CENTER: Coordinate = Coordinate { lat: 20.0, lon: 0.0 };

impl MapSetup {
    /// Full explorer: all controls; known position at level 13, else the world at level 3
    pub fn explore(position: Option<Coordinate>) -> Self {
        let initial_view = match position {
            Some(center) => InitialView::At { center, level: 13 },
            None => InitialView::Locate {
                fallback_level: 3,
                level: 13,
            },
        };
        Self {
            controls: Controls::all(),
            initial_view,
        }
    }

    /// Landing view: pan and search only, located from the IP address
    pub fn landing() -> Self {
        Self {
            controls: Controls {
                zoom: false,
                search: true,
                submit: false,
                engage: false,
            },
            initial_view: InitialView::Locate {
                fallback_level: 2,
                level: 13,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::parse_from(["places-map"]);
        assert_eq!(config.api_url, "http://127.0.0.1:5000/api");
        assert_eq!(config.author, "Anonymous");
        assert_eq!(config.log_level, tracing::Level::INFO);
        assert_eq!(config.ip_lookup_url(), Some("https://ipapi.co/json/"));
        assert_eq!(
            config.map_setup().initial_view,
            InitialView::Locate {
                fallback_level: 3,
                level: 13
            }
        );
    }

    #[test]
    fn test_position_and_landing() {
        let config = Config::parse_from(["places-map", "--position", "-33.9,151.2", "--no-ip-lookup"]);
        assert_eq!(config.position, Some(Coordinate::new(-33.9, 151.2)));
        assert_eq!(config.ip_lookup_url(), None);
        assert_eq!(
            config.map_setup().initial_view,
            InitialView::At {
                center: Coordinate::new(-33.9, 151.2),
                level: 13
            }
        );

        let config = Config::parse_from(["places-map", "--landing"]);
        let setup = config.map_setup();
        assert!(!setup.controls.zoom);
        assert!(!setup.controls.submit);
        assert!(setup.controls.search);
    }

    #[test]
    fn test_bad_position_is_rejected() {
        assert!(Config::try_parse_from(["places-map", "--position", "100,0"]).is_err());
    }
}
