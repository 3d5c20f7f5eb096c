//! Blocking client for the places backend.

use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use simd_json::OwnedValue;
use thiserror::Error;
use tracing::{debug, warn};

use crate::place::{NewPlace, Place, VoteKind};

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request never completed (connect, timeout, TLS)
    #[error("network error: {0}")]
    Network(#[source] reqwest::Error),
    #[error("server responded {0}")]
    Status(StatusCode),
    #[error("unexpected response: {0}")]
    Decode(#[from] simd_json::Error),
    /// Backend answered `success: false`
    #[error("{0}")]
    Rejected(String),
}

// Not `#[from]`: HTTP status failures get their own variant
impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => ApiError::Status(status),
            None => ApiError::Network(e),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Updated tallies returned by a vote
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
pub struct VoteTally {
    pub upvotes: u32,
    pub downvotes: u32,
}

/// Payload for the feedback page
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Feedback {
    pub feedback: String,
    pub rating: Option<u8>,
    pub email: Option<String>,
}

fn succeeded() -> bool {
    true
}

/// Common `{success, error}` fields; missing `success` counts as success
#[derive(Deserialize)]
struct Ack {
    #[serde(default = "succeeded")]
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

impl Ack {
    fn check(&self, fallback: &str) -> ApiResult<()> {
        if self.success {
            Ok(())
        } else {
            Err(ApiError::Rejected(
                self.error.clone().unwrap_or_else(|| fallback.to_string()),
            ))
        }
    }
}

/// Records stay undecoded so one bad entry cannot sink the whole list
#[derive(Deserialize)]
#[serde(untagged)]
enum PlacesReply {
    Bare(Vec<OwnedValue>),
    Wrapped {
        success: Option<bool>,
        error: Option<String>,
        places: Option<Vec<OwnedValue>>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PlaceReply {
    // Tried first: an envelope would otherwise match with `place: None`
    Bare(Place),
    Wrapped {
        #[serde(flatten)]
        ack: Ack,
        place: Option<Place>,
    },
}

#[derive(Deserialize)]
struct VoteReply {
    #[serde(flatten)]
    ack: Ack,
    #[serde(flatten)]
    tally: Option<VoteTally>,
}

#[derive(Deserialize)]
struct ReportReply {
    #[serde(flatten)]
    ack: Ack,
    #[serde(default)]
    flagged: bool,
}

fn decode<T: DeserializeOwned>(mut body: Vec<u8>) -> ApiResult<T> {
    Ok(simd_json::serde::from_slice(&mut body)?)
}

/// A list envelope counts as success only with `success: true` or a
/// `places` array; anything else must not clear the current places.
pub fn decode_places(body: Vec<u8>) -> ApiResult<Vec<Place>> {
    let records = match decode(body)? {
        PlacesReply::Bare(records) => records,
        PlacesReply::Wrapped {
            success: Some(true),
            places,
            ..
        } => places.unwrap_or_default(),
        PlacesReply::Wrapped {
            success: None,
            places: Some(places),
            ..
        } => places,
        PlacesReply::Wrapped { error, .. } => {
            return Err(ApiError::Rejected(
                error.unwrap_or_else(|| "Failed to load places".to_string()),
            ))
        }
    };
    Ok(decode_records(records))
}

/// Decode list entries one by one, skipping malformed records
fn decode_records(records: Vec<OwnedValue>) -> Vec<Place> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(idx, record)| match simd_json::serde::from_owned_value::<Place>(record) {
            Ok(place) => Some(place),
            Err(e) => {
                warn!(index = idx, "skipping malformed place record: {}", e);
                None
            }
        })
        .collect()
}

pub fn decode_place(body: Vec<u8>) -> ApiResult<Place> {
    match decode(body)? {
        PlaceReply::Bare(place) => Ok(place),
        PlaceReply::Wrapped { ack, place } => {
            ack.check("Failed to load place")?;
            place.ok_or_else(|| ApiError::Rejected("Place not found".to_string()))
        }
    }
}

pub fn decode_vote(body: Vec<u8>) -> ApiResult<VoteTally> {
    let reply: VoteReply = decode(body)?;
    reply.ack.check("Vote was not recorded")?;
    reply
        .tally
        .ok_or_else(|| ApiError::Rejected("Vote reply had no tallies".to_string()))
}

pub fn decode_ack(body: Vec<u8>, fallback: &str) -> ApiResult<()> {
    let ack: Ack = decode(body)?;
    ack.check(fallback)
}

/// Returns whether the comment is now flagged for moderation
pub fn decode_report(body: Vec<u8>) -> ApiResult<bool> {
    let reply: ReportReply = decode(body)?;
    reply.ack.check("Report was not recorded")?;
    Ok(reply.flagged)
}

#[derive(Serialize)]
struct VoteBody {
    #[serde(rename = "type")]
    kind: VoteKind,
}

#[derive(Serialize)]
struct CommentBody<'a> {
    text: &'a str,
    author: &'a str,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("places-map/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send and return the raw body of a 2xx response
    fn send(&self, request: RequestBuilder) -> ApiResult<Vec<u8>> {
        let response = request.send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }

    pub fn list_places(&self) -> ApiResult<Vec<Place>> {
        debug!("GET /places-list");
        decode_places(self.send(self.http.get(self.url("/places-list")))?)
    }

    pub fn get_place(&self, id: &str) -> ApiResult<Place> {
        debug!(id, "GET /place/{{id}}");
        decode_place(self.send(self.http.get(self.url(&format!("/place/{id}"))))?)
    }

    pub fn submit_place(&self, place: &NewPlace) -> ApiResult<()> {
        debug!(name = %place.name, "POST /place");
        let body = self.send(self.http.post(self.url("/place")).json(place))?;
        decode_ack(body, "Failed to save place")
    }

    pub fn vote(&self, id: &str, kind: VoteKind) -> ApiResult<VoteTally> {
        debug!(id, kind = kind.as_str(), "POST /place/{{id}}/vote");
        let request = self
            .http
            .post(self.url(&format!("/place/{id}/vote")))
            .json(&VoteBody { kind });
        decode_vote(self.send(request)?)
    }

    pub fn add_comment(&self, id: &str, text: &str, author: &str) -> ApiResult<()> {
        debug!(id, "POST /place/{{id}}/comments");
        let request = self
            .http
            .post(self.url(&format!("/place/{id}/comments")))
            .json(&CommentBody { text, author });
        decode_ack(self.send(request)?, "Failed to post comment")
    }

    pub fn report_comment(&self, comment_id: &str) -> ApiResult<bool> {
        debug!(comment_id, "POST /comment/{{id}}/report");
        let request = self.http.post(self.url(&format!("/comment/{comment_id}/report")));
        decode_report(self.send(request)?)
    }

    pub fn send_feedback(&self, feedback: &Feedback) -> ApiResult<()> {
        debug!(rating = ?feedback.rating, "POST /feedback");
        let request = self.http.post(self.url("/feedback")).json(feedback);
        decode_ack(self.send(request)?, "Failed to submit feedback")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACE: &str = r#"{"id":"place_001","name":"Corner Cafe","category":"Cafe","latitude":1.5,"longitude":2.5}"#;

    fn body(s: &str) -> Vec<u8> {
        s.as_bytes().to_vec()
    }

    #[test]
    fn test_places_bare_list() {
        let places = decode_places(body(&format!("[{PLACE},{PLACE}]"))).unwrap();
        assert_eq!(places.len(), 2);
        assert_eq!(places[0].name, "Corner Cafe");
    }

    #[test]
    fn test_places_envelope() {
        let places = decode_places(body(&format!(r#"{{"success":true,"places":[{PLACE}]}}"#))).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].latitude, 1.5);
    }

    #[test]
    fn test_places_rejected() {
        let err = decode_places(body(r#"{"success":false,"error":"db down"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "db down"));
    }

    #[test]
    fn test_place_shapes() {
        assert_eq!(decode_place(body(PLACE)).unwrap().id, "place_001");
        let wrapped = format!(r#"{{"success":true,"place":{PLACE}}}"#);
        assert_eq!(decode_place(body(&wrapped)).unwrap().id, "place_001");
        assert!(matches!(
            decode_place(body(r#"{"success":false}"#)),
            Err(ApiError::Rejected(_))
        ));
    }

    #[test]
    fn test_vote_tally() {
        let tally = decode_vote(body(r#"{"success":true,"upvotes":4,"downvotes":1}"#)).unwrap();
        assert_eq!(tally, VoteTally { upvotes: 4, downvotes: 1 });
        assert!(decode_vote(body(r#"{"success":false,"error":"already voted"}"#)).is_err());
    }

    #[test]
    fn test_report_flagged() {
        assert!(decode_report(body(r#"{"success":true,"flagged":true}"#)).unwrap());
        assert!(!decode_report(body(r#"{"success":true}"#)).unwrap());
    }

    #[test]
    fn test_ack_fallback_message() {
        let err = decode_ack(body(r#"{"success":false}"#), "Failed to post comment").unwrap_err();
        assert_eq!(err.to_string(), "Failed to post comment");
        assert!(decode_ack(body(r#"{"success":true}"#), "x").is_ok());
    }

    #[test]
    fn test_places_envelope_without_list_is_rejected() {
        let err = decode_places(body("{}")).unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "Failed to load places"));
        let err = decode_places(body(r#"{"error":"maintenance"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::Rejected(ref m) if m == "maintenance"));
        let err = decode_places(body(&format!(r#"{{"success":false,"places":[{PLACE}]}}"#))).unwrap_err();
        assert!(matches!(err, ApiError::Rejected(_)));
        // Explicit success with nothing listed is a genuinely empty directory
        assert!(decode_places(body(r#"{"success":true}"#)).unwrap().is_empty());
        assert_eq!(decode_places(body(&format!(r#"{{"places":[{PLACE}]}}"#))).unwrap().len(), 1);
    }

    #[test]
    fn test_malformed_record_is_skipped() {
        let bad = r#"{"id":7,"name":"Broken","category":"Cafe","latitude":"north","longitude":0}"#;
        let places = decode_places(body(&format!("[{PLACE},{bad},{PLACE}]"))).unwrap();
        assert_eq!(places.len(), 2);
        let places = decode_places(body(&format!(r#"{{"success":true,"places":[{bad},{PLACE}]}}"#))).unwrap();
        assert_eq!(places.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["place_001"]);
    }

    #[test]
    fn test_error_messages_and_sources() {
        use std::error::Error as _;
        let err = ApiError::Rejected("Place not found".to_string());
        assert_eq!(err.to_string(), "Place not found");
        assert!(err.source().is_none());
        assert_eq!(
            ApiError::Status(StatusCode::NOT_FOUND).to_string(),
            "server responded 404 Not Found"
        );
        let decode = decode_places(body("<html>")).unwrap_err();
        assert!(decode.to_string().starts_with("unexpected response: "));
        assert!(decode.source().is_some());
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(decode_places(body("<html>")), Err(ApiError::Decode(_))));
    }

    #[test]
    fn test_request_bodies() {
        let vote = simd_json::serde::to_string(&VoteBody { kind: VoteKind::Downvote }).unwrap();
        assert_eq!(vote, r#"{"type":"downvote"}"#);
        let place = NewPlace {
            name: "Park".to_string(),
            opening_hours: "all day".to_string(),
            ..NewPlace::default()
        };
        let json = simd_json::serde::to_string(&place).unwrap();
        assert!(json.contains(r#""openingHours":"all day""#));
        assert!(json.contains(r#""addedBy":"""#));
    }
}
