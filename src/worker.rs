//! Runs network requests off the UI thread and hands results back over a channel.

use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::api::{ApiClient, ApiResult, Feedback, VoteTally};
use crate::geocode::{Geocoder, SearchHit};
use crate::locate::Locator;
use crate::map::Boundary;
use crate::place::{Coordinate, NewPlace, Place, VoteKind};

/// Search generation; only responses for the newest one are applied
pub type Generation = u64;

/// Why a position was requested
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocatePurpose {
    /// Initial view at startup; failure is silent
    InitialView,
    /// User asked to go to their location
    GoToMe,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Request {
    LoadPlaces,
    LoadPlace(String),
    SubmitPlace(NewPlace),
    Vote { id: String, kind: VoteKind },
    Comment { id: String, text: String, author: String },
    ReportComment { place_id: String, comment_id: String },
    Feedback(Feedback),
    Search { generation: Generation, query: String },
    Reverse { generation: Generation, at: Coordinate },
    Locate(LocatePurpose),
}

impl Request {
    fn name(&self) -> &'static str {
        match self {
            Request::LoadPlaces => "load places",
            Request::LoadPlace(_) => "load place",
            Request::SubmitPlace(_) => "submit place",
            Request::Vote { .. } => "vote",
            Request::Comment { .. } => "comment",
            Request::ReportComment { .. } => "report comment",
            Request::Feedback(_) => "feedback",
            Request::Search { .. } => "search",
            Request::Reverse { .. } => "reverse geocode",
            Request::Locate(_) => "locate",
        }
    }
}

#[derive(Debug)]
pub enum Response {
    Places(ApiResult<Vec<Place>>),
    Place(ApiResult<Place>),
    Submitted(ApiResult<()>),
    Voted { id: String, result: ApiResult<VoteTally> },
    Commented { id: String, result: ApiResult<()> },
    Reported { place_id: String, result: ApiResult<bool> },
    FeedbackSent(ApiResult<()>),
    Searched { generation: Generation, query: String, result: ApiResult<Option<SearchHit>> },
    Reversed { generation: Generation, result: ApiResult<Option<Boundary>> },
    Located { purpose: LocatePurpose, result: ApiResult<Coordinate> },
}

/// Network collaborators shared by request threads
pub struct Services {
    pub api: ApiClient,
    pub geocoder: Geocoder,
    pub locator: Locator,
}

impl Services {
    /// Execute one request synchronously
    pub fn run(&self, request: Request) -> Response {
        match request {
            Request::LoadPlaces => Response::Places(self.api.list_places()),
            Request::LoadPlace(id) => Response::Place(self.api.get_place(&id)),
            Request::SubmitPlace(place) => Response::Submitted(self.api.submit_place(&place)),
            Request::Vote { id, kind } => {
                let result = self.api.vote(&id, kind);
                Response::Voted { id, result }
            }
            Request::Comment { id, text, author } => {
                let result = self.api.add_comment(&id, &text, &author);
                Response::Commented { id, result }
            }
            Request::ReportComment { place_id, comment_id } => {
                let result = self.api.report_comment(&comment_id);
                Response::Reported { place_id, result }
            }
            Request::Feedback(feedback) => Response::FeedbackSent(self.api.send_feedback(&feedback)),
            Request::Search { generation, query } => {
                let result = self.geocoder.search(&query);
                Response::Searched {
                    generation,
                    query,
                    result,
                }
            }
            Request::Reverse { generation, at } => Response::Reversed {
                generation,
                result: self.geocoder.reverse(at),
            },
            Request::Locate(purpose) => Response::Located {
                purpose,
                result: self.locator.locate(),
            },
        }
    }
}

/// Fire-and-forget request runner; one thread per request
pub struct Worker {
    services: Arc<Services>,
    tx: Sender<Response>,
    rx: Receiver<Response>,
}

impl Worker {
    pub fn new(services: Services) -> Self {
        let (tx, rx) = unbounded();
        Self {
            services: Arc::new(services),
            tx,
            rx,
        }
    }

    pub fn submit(&self, request: Request) {
        let name = request.name();
        debug!(request = name, "dispatching");
        let services = Arc::clone(&self.services);
        let tx = self.tx.clone();
        let fallback = request.clone();
        let spawned = thread::Builder::new()
            .name(format!("req-{}", name.replace(' ', "-")))
            .spawn(move || {
                // Receiver gone means the app is shutting down
                let _ = tx.send(services.run(request));
            });
        if let Err(e) = spawned {
            warn!(request = name, "failed to spawn request thread, running inline: {}", e);
            let _ = self.tx.send(self.services.run(fallback));
        }
    }

    /// Responses that arrived since the last call; never blocks
    pub fn drain(&self) -> impl Iterator<Item = Response> + '_ {
        self.rx.try_iter()
    }
}
