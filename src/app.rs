use std::mem;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use tracing::{debug, info, warn};

use crate::compose::{self, FeedbackForm, PlaceForm, Rating, TextInput, MAX_TEXT_LEN};
use crate::config::{InitialView, MapSetup, WORLD_CENTER};
use crate::map::{zoom_for_level, Boundary, Lod, MapRenderer, MarkerSet, Viewport, FLY_DURATION};
use crate::place::{CategoryFilter, Coordinate, FilterState, PlaceCollection, VoteKind};
use crate::sync::{DetailView, ViewSynchronizer};
use crate::views::{DetailPanel, PlaceList};
use crate::worker::{Generation, LocatePurpose, Request, Response};

/// How long notifications and the search marker stay up
pub const NOTICE_TTL: Duration = Duration::from_secs(5);

/// Zoom level used when focusing a single place or the user
const CLOSE_LEVEL: u8 = 15;
const SEARCH_LEVEL: u8 = 13;

/// Click tolerance around a marker, in braille pixels
const HIT_TOLERANCE: i32 = 4;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Error,
    Info,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
    pub expires: Instant,
}

/// What keystrokes currently edit
#[derive(Clone, Debug, PartialEq)]
pub enum Mode {
    Normal,
    Search(TextInput),
    Filter(TextInput),
    Comment(TextInput),
    Feedback(FeedbackForm),
    Submit(PlaceForm),
}

/// Application state
pub struct App {
    pub viewport: Viewport,
    pub map_renderer: MapRenderer,
    pub setup: MapSetup,
    pub author: String,
    pub places: PlaceCollection,
    pub filter: FilterState,
    pub markers: MarkerSet,
    pub list: PlaceList,
    pub detail: DetailPanel,
    sync: ViewSynchronizer,
    pub mode: Mode,
    /// A form submission is waiting for the backend
    pub sending: bool,
    pub notice: Option<Notice>,
    /// Outline of the searched area
    pub boundary: Option<Boundary>,
    /// Temporary marker on the last search hit
    pub search_marker: Option<(Coordinate, Instant)>,
    pub user_position: Option<Coordinate>,
    pub should_quit: bool,
    /// Last mouse position for drag tracking
    pub last_mouse: Option<(u16, u16)>,
    dragged: bool,
    /// Requests in flight, for the loading indicator
    pub pending: usize,
    search_generation: Generation,
    outbox: Vec<Request>,
}

impl App {
    /// `width`/`height` are the map area in characters
    pub fn new(width: usize, height: usize, setup: MapSetup, author: &str) -> Self {
        let mut app = Self {
            viewport: Viewport::world(width * 2, height * 4),
            map_renderer: MapRenderer::new(),
            setup,
            author: author.to_string(),
            places: PlaceCollection::new(),
            filter: FilterState::default(),
            markers: MarkerSet::new(),
            list: PlaceList::default(),
            detail: DetailPanel::default(),
            sync: ViewSynchronizer::default(),
            mode: Mode::Normal,
            sending: false,
            notice: None,
            boundary: None,
            search_marker: None,
            user_position: None,
            should_quit: false,
            last_mouse: None,
            dragged: false,
            pending: 0,
            search_generation: 0,
            outbox: Vec::new(),
        };
        app.reset_view();
        app.request(Request::LoadPlaces);
        app.refresh();
        app
    }

    /// Put the camera where the map setup says
    pub fn reset_view(&mut self) {
        match self.setup.initial_view {
            InitialView::At { center, level } => {
                self.viewport.set_view(center, level);
                self.user_position = Some(center);
            }
            InitialView::Locate { fallback_level, .. } => {
                self.viewport.set_view(WORLD_CENTER, fallback_level);
                self.request(Request::Locate(LocatePurpose::InitialView));
            }
        }
    }

    /// Update viewport size when the map area changes (characters)
    pub fn resize(&mut self, width: usize, height: usize) {
        self.viewport.width = width * 2;
        self.viewport.height = height * 4;
    }

    fn request(&mut self, request: Request) {
        self.pending += 1;
        self.outbox.push(request);
    }

    /// Requests queued since the last call, for the worker
    pub fn take_requests(&mut self) -> Vec<Request> {
        mem::take(&mut self.outbox)
    }

    pub fn is_loading(&self) -> bool {
        self.pending > 0
    }

    fn notify(&mut self, kind: NoticeKind, message: impl Into<String>) {
        self.notice = Some(Notice {
            message: message.into(),
            kind,
            expires: Instant::now() + NOTICE_TTL,
        });
    }

    /// Re-render markers, list and detail from the current collection and filters
    pub fn refresh(&mut self) {
        let result = self.sync.refresh(
            &self.places,
            &self.filter,
            &mut self.markers,
            &mut self.list,
            &mut self.detail,
        );
        if result.detail_closed {
            debug!("detail panel closed, place no longer matches filters");
        }
    }

    /// Per-frame housekeeping: animation and expiry
    pub fn tick(&mut self, now: Instant) {
        self.viewport.tick(now);
        if self.notice.as_ref().is_some_and(|n| now >= n.expires) {
            self.notice = None;
        }
        if self
            .search_marker
            .is_some_and(|(_, shown)| now.saturating_duration_since(shown) >= NOTICE_TTL)
        {
            self.search_marker = None;
        }
    }

    /// Request quit
    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    /// Esc in normal mode: close the detail panel first, then quit
    pub fn back(&mut self) {
        if self.detail.is_open() {
            self.detail.close();
        } else {
            self.quit();
        }
    }

    // --- camera ---

    /// Pan the map
    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.viewport.pan(dx, dy);
    }

    pub fn zoom_in(&mut self) {
        if self.setup.controls.zoom {
            self.viewport.zoom_in();
        }
    }

    pub fn zoom_out(&mut self) {
        if self.setup.controls.zoom {
            self.viewport.zoom_out();
        }
    }

    /// Zoom in towards a screen position (map-relative column/row)
    pub fn zoom_in_at(&mut self, col: u16, row: u16) {
        if self.setup.controls.zoom {
            let (px, py) = to_pixels(col, row);
            self.viewport.zoom_in_at(px, py);
        }
    }

    pub fn zoom_out_at(&mut self, col: u16, row: u16) {
        if self.setup.controls.zoom {
            let (px, py) = to_pixels(col, row);
            self.viewport.zoom_out_at(px, py);
        }
    }

    pub fn press(&mut self, col: u16, row: u16) {
        self.last_mouse = Some((col, row));
        self.dragged = false;
    }

    /// Handle mouse drag
    pub fn handle_drag(&mut self, x: u16, y: u16) {
        if let Some((last_x, last_y)) = self.last_mouse {
            let dx = last_x as i32 - x as i32;
            let dy = last_y as i32 - y as i32;
            if dx != 0 || dy != 0 {
                self.dragged = true;
                // Drag distance is in cells; pan works in braille pixels
                self.pan(dx * 2, dy * 4);
            }
        }
        self.last_mouse = Some((x, y));
    }

    /// Mouse released; a press without drag is a click
    pub fn release(&mut self, col: u16, row: u16) {
        let clicked = self.last_mouse.is_some() && !self.dragged;
        self.last_mouse = None;
        self.dragged = false;
        if clicked {
            self.click(col, row);
        }
    }

    /// Open the marker under a map cell, if any
    pub fn click(&mut self, col: u16, row: u16) {
        let (px, py) = to_pixels(col, row);
        // Aim at the cell centre
        let hit = self
            .markers
            .hit(&self.viewport, px + 1, py + 2, HIT_TOLERANCE)
            .map(|m| m.id.clone());
        if let Some(id) = hit {
            self.list.select_id(&id);
            self.open_place(&id);
        }
    }

    pub fn zoom_level(&self) -> String {
        format!("{:.1}", self.viewport.zoom.log2() + 2.0)
    }

    /// Get current center coordinates as a string
    pub fn center_coords(&self) -> String {
        format!(
            "{:.4}°{}, {:.4}°{}",
            self.viewport.center_lat.abs(),
            if self.viewport.center_lat >= 0.0 { "N" } else { "S" },
            self.viewport.center_lon.abs(),
            if self.viewport.center_lon >= 0.0 { "E" } else { "W" }
        )
    }

    pub fn lod_level(&self) -> &'static str {
        match Lod::from_zoom(self.viewport.zoom) {
            Lod::Low => "110m",
            Lod::Medium => "50m",
            Lod::High => "10m",
        }
    }

    // --- filters ---

    pub fn cycle_category(&mut self, forward: bool) {
        self.filter.category = if forward {
            self.filter.category.next()
        } else {
            self.filter.category.prev()
        };
        self.refresh();
    }

    pub fn show_all_categories(&mut self) {
        self.filter.category = CategoryFilter::All;
        self.refresh();
    }

    /// Drop the geographic restriction and its overlay
    pub fn clear_search(&mut self) {
        // Anything still in flight belongs to the cleared search
        self.search_generation += 1;
        self.filter.bounds = None;
        self.boundary = None;
        self.search_marker = None;
        self.refresh();
    }

    fn search(&mut self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.search_generation += 1;
        let generation = self.search_generation;
        info!(generation, query, "location search");
        self.request(Request::Search {
            generation,
            query: query.to_string(),
        });
    }

    // --- list and detail ---

    pub fn select_next(&mut self) {
        if self.detail.is_open() {
            self.detail.next_comment();
        } else {
            self.list.select_next();
        }
    }

    pub fn select_prev(&mut self) {
        if self.detail.is_open() {
            self.detail.prev_comment();
        } else {
            self.list.select_prev();
        }
    }

    pub fn open_selected(&mut self) {
        if let Some(id) = self.list.selected().map(|c| c.id.clone()) {
            self.open_place(&id);
        }
    }

    /// Show a place in the detail panel and fetch its full record
    pub fn open_place(&mut self, id: &str) {
        let preview = self.places.get(id).cloned();
        if let Some(place) = &preview {
            self.viewport.fly_to(place.coordinate(), CLOSE_LEVEL, FLY_DURATION);
        }
        self.detail.open(id, preview);
        self.request(Request::LoadPlace(id.to_string()));
    }

    fn open_place_id(&self) -> Option<String> {
        self.detail.open_id().map(str::to_string)
    }

    pub fn vote(&mut self, kind: VoteKind) {
        if !self.setup.controls.engage {
            return;
        }
        if let Some(id) = self.open_place_id() {
            self.request(Request::Vote { id, kind });
        }
    }

    pub fn report_selected_comment(&mut self) {
        if !self.setup.controls.engage {
            return;
        }
        let Some(place_id) = self.open_place_id() else {
            return;
        };
        match self.detail.selected_comment() {
            Some(comment) if comment.reported => {
                self.notify(NoticeKind::Info, "You already reported this comment");
            }
            Some(comment) => {
                let comment_id = comment.id.clone();
                self.request(Request::ReportComment { place_id, comment_id });
            }
            None => {}
        }
    }

    pub fn reload(&mut self) {
        self.request(Request::LoadPlaces);
    }

    pub fn go_to_my_location(&mut self) {
        self.request(Request::Locate(LocatePurpose::GoToMe));
    }

    // --- modes ---

    pub fn start_search(&mut self) {
        if self.setup.controls.search {
            self.mode = Mode::Search(TextInput::default());
        }
    }

    pub fn start_filter(&mut self) {
        self.mode = Mode::Filter(TextInput::with_value(&self.filter.query));
    }

    pub fn start_comment(&mut self) {
        if self.setup.controls.engage && self.detail.is_open() {
            self.mode = Mode::Comment(TextInput::default());
        }
    }

    pub fn start_submit(&mut self) {
        if self.setup.controls.submit {
            self.mode = Mode::Submit(PlaceForm::new(self.viewport.center()));
        }
    }

    pub fn start_feedback(&mut self) {
        self.mode = Mode::Feedback(FeedbackForm::default());
    }

    /// Keystroke while a prompt or form is open
    pub fn input_key(&mut self, code: KeyCode) {
        if self.sending {
            // Form is locked until the backend answers
            if code == KeyCode::Esc {
                self.notify(NoticeKind::Info, "Still submitting...");
            }
            return;
        }
        if code == KeyCode::Esc {
            if matches!(self.mode, Mode::Filter(_)) {
                self.filter.query.clear();
                self.refresh();
            }
            self.mode = Mode::Normal;
            return;
        }
        let mode = mem::replace(&mut self.mode, Mode::Normal);
        self.mode = match mode {
            Mode::Normal => Mode::Normal,
            Mode::Search(mut input) => match code {
                KeyCode::Enter => {
                    self.search(input.value());
                    Mode::Normal
                }
                _ => {
                    edit(&mut input, code);
                    Mode::Search(input)
                }
            },
            Mode::Filter(mut input) => {
                if code == KeyCode::Enter {
                    Mode::Normal
                } else {
                    edit(&mut input, code);
                    // Filter as you type
                    self.filter.query = input.value().to_string();
                    self.refresh();
                    Mode::Filter(input)
                }
            }
            Mode::Comment(mut input) => match code {
                KeyCode::Enter => self.submit_comment(input),
                _ => {
                    edit(&mut input, code);
                    Mode::Comment(input)
                }
            },
            Mode::Feedback(mut form) => match code {
                KeyCode::Enter => self.submit_feedback(form),
                KeyCode::Tab | KeyCode::BackTab => {
                    form.toggle_focus();
                    Mode::Feedback(form)
                }
                KeyCode::Char(c @ '1'..='5') if form.focus == compose::FeedbackField::Text && form.text.is_empty() => {
                    // Digits set the rating until the text has started
                    form.rating = Rating::new(c as u8 - b'0');
                    Mode::Feedback(form)
                }
                _ => {
                    edit(form.focused(), code);
                    Mode::Feedback(form)
                }
            },
            Mode::Submit(mut form) => match code {
                KeyCode::Enter => self.submit_place(form),
                KeyCode::Tab | KeyCode::Down => {
                    form.next_field();
                    Mode::Submit(form)
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.prev_field();
                    Mode::Submit(form)
                }
                KeyCode::Left if form.on_category() => {
                    form.cycle_category(false);
                    Mode::Submit(form)
                }
                KeyCode::Right | KeyCode::Char(' ') if form.on_category() => {
                    form.cycle_category(true);
                    Mode::Submit(form)
                }
                _ => {
                    if let Some(input) = form.focused() {
                        edit(input, code);
                    }
                    Mode::Submit(form)
                }
            },
        };
    }

    fn submit_comment(&mut self, input: TextInput) -> Mode {
        let Some(id) = self.open_place_id() else {
            return Mode::Normal;
        };
        match compose::validate_text(input.value(), "a comment", MAX_TEXT_LEN) {
            Ok(text) => {
                let request = Request::Comment {
                    id,
                    text: text.to_string(),
                    author: self.author.clone(),
                };
                self.sending = true;
                self.request(request);
            }
            Err(e) => self.notify(NoticeKind::Error, e.to_string()),
        }
        Mode::Comment(input)
    }

    fn submit_feedback(&mut self, form: FeedbackForm) -> Mode {
        match form.validate() {
            Ok(feedback) => {
                self.sending = true;
                self.request(Request::Feedback(feedback));
            }
            Err(e) => self.notify(NoticeKind::Error, e.to_string()),
        }
        Mode::Feedback(form)
    }

    fn submit_place(&mut self, form: PlaceForm) -> Mode {
        match form.validate(&self.author) {
            Ok(place) => {
                self.sending = true;
                self.request(Request::SubmitPlace(place));
            }
            Err(e) => self.notify(NoticeKind::Error, e.to_string()),
        }
        Mode::Submit(form)
    }

    /// Close the open form after the backend accepted it
    fn finish_form(&mut self) {
        self.sending = false;
        self.mode = Mode::Normal;
    }

    // --- responses ---

    pub fn handle_response(&mut self, response: Response, now: Instant) {
        self.pending = self.pending.saturating_sub(1);
        match response {
            Response::Places(Ok(places)) => {
                let dropped = self.places.replace_all(places);
                info!(count = self.places.len(), dropped, "places loaded");
                self.refresh();
            }
            Response::Places(Err(e)) => {
                warn!("loading places failed: {}", e);
                self.notify(NoticeKind::Error, format!("Could not load places: {e}"));
            }
            Response::Place(Ok(place)) => {
                if self.places.replace_one(place.clone()) {
                    self.detail.update(&place);
                    self.refresh();
                } else {
                    self.detail.load_failed();
                }
            }
            Response::Place(Err(e)) => {
                warn!("loading place failed: {}", e);
                self.detail.load_failed();
                self.notify(NoticeKind::Error, format!("Could not load place: {e}"));
            }
            Response::Submitted(result) => match result {
                Ok(()) => {
                    self.finish_form();
                    self.notify(NoticeKind::Success, "Place submitted, thank you!");
                    self.request(Request::LoadPlaces);
                }
                Err(e) => {
                    warn!("submitting place failed: {}", e);
                    self.sending = false;
                    self.notify(NoticeKind::Error, e.to_string());
                }
            },
            Response::Voted { id, result } => match result {
                Ok(tally) => {
                    self.notify(
                        NoticeKind::Success,
                        format!("Vote recorded (▲{} ▼{})", tally.upvotes, tally.downvotes),
                    );
                    self.request(Request::LoadPlace(id));
                }
                Err(e) => {
                    warn!(id = %id, "vote failed: {}", e);
                    self.notify(NoticeKind::Error, format!("Vote failed: {e}"));
                }
            },
            Response::Commented { id, result } => match result {
                Ok(()) => {
                    self.finish_form();
                    self.notify(NoticeKind::Success, "Comment posted");
                    self.request(Request::LoadPlace(id));
                }
                Err(e) => {
                    warn!(id = %id, "comment failed: {}", e);
                    self.sending = false;
                    self.notify(NoticeKind::Error, e.to_string());
                }
            },
            Response::Reported { place_id, result } => match result {
                Ok(flagged) => {
                    let message = if flagged {
                        "Comment reported and hidden for review"
                    } else {
                        "Comment reported"
                    };
                    self.notify(NoticeKind::Success, message);
                    self.request(Request::LoadPlace(place_id));
                }
                Err(e) => {
                    warn!(place_id = %place_id, "report failed: {}", e);
                    self.notify(NoticeKind::Error, format!("Report failed: {e}"));
                }
            },
            Response::FeedbackSent(result) => match result {
                Ok(()) => {
                    self.finish_form();
                    self.notify(NoticeKind::Success, "Thanks for your feedback!");
                }
                Err(e) => {
                    warn!("feedback failed: {}", e);
                    self.sending = false;
                    self.notify(NoticeKind::Error, e.to_string());
                }
            },
            Response::Searched {
                generation,
                query,
                result,
            } => {
                if generation != self.search_generation {
                    debug!(generation, latest = self.search_generation, "dropping stale search result");
                    return;
                }
                match result {
                    Ok(Some(hit)) => {
                        info!(query = %query, name = %hit.display_name, "search hit");
                        self.filter.bounds = hit.bounds;
                        self.boundary = None;
                        self.viewport.fly_to(hit.coordinate, SEARCH_LEVEL, FLY_DURATION);
                        self.search_marker = Some((hit.coordinate, now));
                        self.refresh();
                        self.notify(NoticeKind::Info, hit.display_name);
                        self.request(Request::Reverse {
                            generation,
                            at: hit.coordinate,
                        });
                    }
                    Ok(None) => {
                        self.notify(NoticeKind::Error, "Location not found. Try a different search term.");
                    }
                    Err(e) => {
                        warn!(query = %query, "search failed: {}", e);
                        self.notify(NoticeKind::Error, "Error searching for location. Please try again.");
                    }
                }
            }
            Response::Reversed { generation, result } => {
                if generation != self.search_generation {
                    debug!(generation, "dropping stale boundary");
                    return;
                }
                match result {
                    Ok(boundary) => self.boundary = boundary,
                    Err(e) => warn!("boundary lookup failed: {}", e),
                }
            }
            Response::Located { purpose, result } => match (purpose, result) {
                (LocatePurpose::InitialView, Ok(at)) => {
                    info!(lat = at.lat, lon = at.lon, "located");
                    self.user_position = Some(at);
                    if let InitialView::Locate { level, .. } = self.setup.initial_view {
                        self.viewport.fly_to(at, level, FLY_DURATION);
                    }
                }
                (LocatePurpose::InitialView, Err(e)) => {
                    info!("no initial location, showing world map: {}", e);
                    self.notify(NoticeKind::Info, "Unable to get your location, showing the world map");
                }
                (LocatePurpose::GoToMe, Ok(at)) => {
                    self.user_position = Some(at);
                    self.viewport.fly_to(at, CLOSE_LEVEL, FLY_DURATION);
                }
                (LocatePurpose::GoToMe, Err(e)) => {
                    warn!("locate failed: {}", e);
                    self.notify(
                        NoticeKind::Error,
                        "Unable to get your location. Please enable location services.",
                    );
                }
            },
        }
    }

    /// True when the viewport is close enough for street-level detail
    pub fn is_close_up(&self) -> bool {
        self.viewport.zoom >= zoom_for_level(CLOSE_LEVEL)
    }
}

/// Map-relative terminal cell to braille pixel
fn to_pixels(col: u16, row: u16) -> (i32, i32) {
    (col as i32 * 2, row as i32 * 4)
}

fn edit(input: &mut TextInput, code: KeyCode) {
    match code {
        KeyCode::Char(c) => input.push(c),
        KeyCode::Backspace => input.backspace(),
        _ => {}
    }
}
