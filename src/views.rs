//! Sidebar list and detail panel state fed by the synchronizer.

use crate::place::{Comment, Place};
use crate::sync::{DetailView, ListView};

/// One row of the sidebar list
#[derive(Clone, Debug, PartialEq)]
pub struct ListCard {
    pub id: String,
    pub name: String,
    pub category: String,
    pub address: String,
    pub verified: bool,
    pub hidden: bool,
    pub score: i64,
    pub comments: usize,
}

impl ListCard {
    fn from_place(place: &Place) -> Self {
        Self {
            id: place.id.clone(),
            name: place.name.clone(),
            category: place.category.clone(),
            address: place.address.clone(),
            verified: place.verified,
            hidden: place.hidden,
            score: place.score(),
            comments: place.comments.len(),
        }
    }
}

#[derive(Default)]
pub struct PlaceList {
    cards: Vec<ListCard>,
    empty: Option<String>,
    selected: usize,
}

impl PlaceList {
    pub fn cards(&self) -> &[ListCard] {
        &self.cards
    }

    pub fn ids(&self) -> Vec<&str> {
        self.cards.iter().map(|c| c.id.as_str()).collect()
    }

    /// Placeholder text when nothing matched
    pub fn empty_message(&self) -> Option<&str> {
        self.empty.as_deref()
    }

    pub fn selected(&self) -> Option<&ListCard> {
        self.cards.get(self.selected)
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn select_next(&mut self) {
        if !self.cards.is_empty() {
            self.selected = (self.selected + 1).min(self.cards.len() - 1);
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Move the selection onto `id` if it is listed
    pub fn select_id(&mut self, id: &str) -> bool {
        match self.cards.iter().position(|c| c.id == id) {
            Some(idx) => {
                self.selected = idx;
                true
            }
            None => false,
        }
    }
}

impl ListView for PlaceList {
    fn show(&mut self, places: &[&Place]) {
        // Keep the same place selected across re-renders when possible
        let previous = self.selected().map(|c| c.id.clone());
        self.empty = None;
        self.cards = places.iter().map(|p| ListCard::from_place(p)).collect();
        self.selected = previous
            .and_then(|id| self.cards.iter().position(|c| c.id == id))
            .unwrap_or_else(|| self.selected.min(self.cards.len().saturating_sub(1)));
    }

    fn show_empty(&mut self, message: &str) {
        self.cards.clear();
        self.selected = 0;
        self.empty = Some(message.to_string());
    }
}

/// Full view of one place; `place` is `None` until it has been loaded
#[derive(Default)]
pub struct DetailPanel {
    open: Option<String>,
    place: Option<Place>,
    loading: bool,
    comment_cursor: usize,
}

impl DetailPanel {
    /// Open on `id`, showing `preview` until the full record arrives
    pub fn open(&mut self, id: &str, preview: Option<Place>) {
        if self.open.as_deref() != Some(id) {
            self.comment_cursor = 0;
        }
        self.open = Some(id.to_string());
        self.place = preview;
        self.loading = true;
    }

    /// Apply a fetched record if it is the one on display
    pub fn update(&mut self, place: &Place) -> bool {
        if self.open.as_deref() != Some(place.id.as_str()) {
            return false;
        }
        self.comment_cursor = self.comment_cursor.min(place.comments.len().saturating_sub(1));
        self.place = Some(place.clone());
        self.loading = false;
        true
    }

    pub fn load_failed(&mut self) {
        self.loading = false;
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn place(&self) -> Option<&Place> {
        self.place.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn comment_cursor(&self) -> usize {
        self.comment_cursor
    }

    pub fn selected_comment(&self) -> Option<&Comment> {
        self.place.as_ref()?.comments.get(self.comment_cursor)
    }

    pub fn next_comment(&mut self) {
        let count = self.place.as_ref().map_or(0, |p| p.comments.len());
        if count > 0 {
            self.comment_cursor = (self.comment_cursor + 1).min(count - 1);
        }
    }

    pub fn prev_comment(&mut self) {
        self.comment_cursor = self.comment_cursor.saturating_sub(1);
    }
}

impl DetailView for DetailPanel {
    fn open_id(&self) -> Option<&str> {
        self.open.as_deref()
    }

    fn close(&mut self) {
        self.open = None;
        self.place = None;
        self.loading = false;
        self.comment_cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::place::tests::place;

    fn comment(id: &str) -> Comment {
        Comment {
            id: id.to_string(),
            text: "nice".to_string(),
            author: "bo".to_string(),
            created_at: String::new(),
            flagged: false,
            reported: false,
        }
    }

    #[test]
    fn test_list_keeps_selection_by_id() {
        let (a, b, c) = (place("a", "Cafe", 0.0, 0.0), place("b", "Cafe", 0.0, 0.0), place("c", "Cafe", 0.0, 0.0));
        let mut list = PlaceList::default();
        list.show(&[&a, &b, &c]);
        list.select_next();
        assert_eq!(list.selected().map(|c| c.id.as_str()), Some("b"));
        list.show(&[&b, &c]);
        assert_eq!(list.selected().map(|c| c.id.as_str()), Some("b"));
        list.show(&[&a]);
        assert_eq!(list.selected().map(|c| c.id.as_str()), Some("a"));
    }

    #[test]
    fn test_list_empty_state() {
        let a = place("a", "Cafe", 0.0, 0.0);
        let mut list = PlaceList::default();
        list.show(&[&a]);
        list.show_empty("nothing");
        assert!(list.cards().is_empty());
        assert_eq!(list.empty_message(), Some("nothing"));
        assert!(list.selected().is_none());
        list.select_next();
        list.show(&[&a]);
        assert_eq!(list.empty_message(), None);
    }

    #[test]
    fn test_detail_lifecycle() {
        let mut p = place("a", "Cafe", 0.0, 0.0);
        let mut detail = DetailPanel::default();
        detail.open("a", Some(p.clone()));
        assert!(detail.is_loading());
        assert!(!detail.update(&place("b", "Cafe", 0.0, 0.0)));

        p.comments = vec![comment("c1"), comment("c2")];
        assert!(detail.update(&p));
        assert!(!detail.is_loading());
        detail.next_comment();
        detail.next_comment();
        assert_eq!(detail.selected_comment().map(|c| c.id.as_str()), Some("c2"));

        detail.close();
        assert_eq!(detail.open_id(), None);
        assert!(detail.place().is_none());
    }
}
