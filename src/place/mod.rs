mod collection;
mod filter;

pub use collection::PlaceCollection;
pub use filter::{BoundingBox, CategoryFilter, FilterState, PreparedFilter};

use serde::{Deserialize, Serialize};

/// Category labels offered by the filter bar and the submit form.
/// The backend assigns `Other` when a submission omits the category.
pub const CATEGORIES: &[&str] = &[
    "Cafe",
    "Restaurant",
    "Bar",
    "Park",
    "Shop",
    "Museum",
    "Library",
    "Landmark",
    "Other",
];

/// A point on the globe in degrees
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Coordinate {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinate {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// True when the coordinate lies within [-90,90]×[-180,180]
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lon)
    }

    /// Parse `lat,lon` as typed on the command line
    pub fn parse(s: &str) -> Result<Self, String> {
        let (lat, lon) = s
            .split_once(',')
            .ok_or_else(|| format!("expected `lat,lon`, got `{s}`"))?;
        let lat: f64 = lat.trim().parse().map_err(|e| format!("bad latitude: {e}"))?;
        let lon: f64 = lon.trim().parse().map_err(|e| format!("bad longitude: {e}"))?;
        let coord = Self::new(lat, lon);
        if coord.is_valid() {
            Ok(coord)
        } else {
            Err(format!("{lat},{lon} is outside [-90,90]x[-180,180]"))
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Upvote,
    Downvote,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Upvote => "upvote",
            VoteKind::Downvote => "downvote",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub created_at: String,
    /// Set by moderation once enough reports arrive
    #[serde(default)]
    pub flagged: bool,
    /// Whether the current user already reported this comment
    #[serde(default)]
    pub reported: bool,
}

/// A user-submitted point of interest as served by the places API
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    pub id: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub contact: Option<String>,
    #[serde(default)]
    pub opening_hours: Option<String>,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub upvotes: u32,
    #[serde(default)]
    pub downvotes: u32,
    #[serde(default)]
    pub comments: Vec<Comment>,
    #[serde(default)]
    pub added_by: String,
    #[serde(default)]
    pub added_date: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Present only on single-place responses for the requesting user
    #[serde(default)]
    pub user_vote: Option<VoteKind>,
}

impl Place {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    /// Net score shown next to list cards
    pub fn score(&self) -> i64 {
        self.upvotes as i64 - self.downvotes as i64
    }

    /// Empty strings from the backend mean "not provided"
    pub fn contact(&self) -> Option<&str> {
        self.contact.as_deref().filter(|s| !s.is_empty())
    }

    pub fn opening_hours(&self) -> Option<&str> {
        self.opening_hours.as_deref().filter(|s| !s.is_empty())
    }
}

/// Submission payload for `POST /place`
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlace {
    pub name: String,
    pub category: String,
    pub description: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    pub added_by: String,
    pub contact: String,
    pub opening_hours: String,
    pub tags: Vec<String>,
}
