//! Text entry, client-side validation and the modal forms.

use thiserror::Error;

use crate::api::Feedback;
use crate::place::{Coordinate, NewPlace, CATEGORIES};

/// Upper bound for comments and feedback, in characters
pub const MAX_TEXT_LEN: usize = 1000;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Please enter {0}")]
    Empty(&'static str),
    #[error("{} is too long (max {max} characters)", capitalize(.what))]
    TooLong { what: &'static str, max: usize },
    #[error("Place location is outside the map")]
    InvalidCoordinate,
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Trimmed text if it is non-empty and within `max` characters
pub fn validate_text<'a>(text: &'a str, what: &'static str, max: usize) -> Result<&'a str, ValidationError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(ValidationError::Empty(what))
    } else if trimmed.chars().count() > max {
        Err(ValidationError::TooLong { what, max })
    } else {
        Ok(trimmed)
    }
}

/// Colour band of the character counter
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CounterLevel {
    Normal,
    Warning,
    Critical,
}

impl CounterLevel {
    pub fn for_len(len: usize) -> Self {
        if len > 950 {
            CounterLevel::Critical
        } else if len > 800 {
            CounterLevel::Warning
        } else {
            CounterLevel::Normal
        }
    }
}

/// Single-line editable buffer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TextInput {
    value: String,
}

impl TextInput {
    pub fn with_value(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }

    pub fn push(&mut self, ch: char) {
        self.value.push(ch);
    }

    pub fn backspace(&mut self) {
        self.value.pop();
    }

    pub fn clear(&mut self) {
        self.value.clear();
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// Length in characters, for the counter
    pub fn len(&self) -> usize {
        self.value.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }
}

/// Star rating with the feedback page's labels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rating(u8);

impl Rating {
    pub fn new(stars: u8) -> Option<Self> {
        (1..=5).contains(&stars).then_some(Self(stars))
    }

    pub fn stars(&self) -> u8 {
        self.0
    }

    pub fn label(&self) -> &'static str {
        match self.0 {
            1 => "Bad",
            2 => "Okish",
            3 => "Nice",
            4 => "Verrryy goood",
            _ => "OMG I LOVE THIS",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FeedbackField {
    Text,
    Email,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedbackForm {
    pub text: TextInput,
    pub email: TextInput,
    pub rating: Option<Rating>,
    pub focus: FeedbackField,
}

impl Default for FeedbackForm {
    fn default() -> Self {
        Self {
            text: TextInput::default(),
            email: TextInput::default(),
            rating: None,
            focus: FeedbackField::Text,
        }
    }
}

impl FeedbackForm {
    pub fn focused(&mut self) -> &mut TextInput {
        match self.focus {
            FeedbackField::Text => &mut self.text,
            FeedbackField::Email => &mut self.email,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            FeedbackField::Text => FeedbackField::Email,
            FeedbackField::Email => FeedbackField::Text,
        };
    }

    pub fn rating_label(&self) -> &'static str {
        self.rating.map_or("Select a rating", |r| r.label())
    }

    pub fn validate(&self) -> Result<Feedback, ValidationError> {
        let feedback = validate_text(self.text.value(), "your feedback", MAX_TEXT_LEN)?;
        let email = self.email.value().trim();
        Ok(Feedback {
            feedback: feedback.to_string(),
            rating: self.rating.map(|r| r.stars()),
            email: (!email.is_empty()).then(|| email.to_string()),
        })
    }
}

/// Fields of the new-place form, in tab order
pub const PLACE_FIELDS: &[&str] = &[
    "Name",
    "Category",
    "Description",
    "Address",
    "Contact",
    "Opening hours",
    "Tags",
];

const CATEGORY_FIELD: usize = 1;

#[derive(Clone, Debug, PartialEq)]
pub struct PlaceForm {
    /// Where the place goes; taken from the map centre when the form opens
    pub at: Coordinate,
    pub inputs: Vec<TextInput>,
    pub category: usize,
    pub focus: usize,
}

impl PlaceForm {
    pub fn new(at: Coordinate) -> Self {
        Self {
            at,
            inputs: vec![TextInput::default(); PLACE_FIELDS.len()],
            category: CATEGORIES.len() - 1,
            focus: 0,
        }
    }

    pub fn category(&self) -> &'static str {
        CATEGORIES[self.category % CATEGORIES.len()]
    }

    pub fn on_category(&self) -> bool {
        self.focus == CATEGORY_FIELD
    }

    pub fn next_field(&mut self) {
        self.focus = (self.focus + 1) % PLACE_FIELDS.len();
    }

    pub fn prev_field(&mut self) {
        self.focus = (self.focus + PLACE_FIELDS.len() - 1) % PLACE_FIELDS.len();
    }

    /// Typing on the category row cycles the fixed set instead of editing text
    pub fn cycle_category(&mut self, forward: bool) {
        let n = CATEGORIES.len();
        self.category = if forward {
            (self.category + 1) % n
        } else {
            (self.category + n - 1) % n
        };
    }

    pub fn focused(&mut self) -> Option<&mut TextInput> {
        if self.on_category() {
            None
        } else {
            self.inputs.get_mut(self.focus)
        }
    }

    fn field(&self, idx: usize) -> &str {
        self.inputs[idx].value().trim()
    }

    pub fn validate(&self, author: &str) -> Result<NewPlace, ValidationError> {
        let name = validate_text(self.inputs[0].value(), "a name for the place", 200)?;
        let description = self.field(2);
        if description.chars().count() > MAX_TEXT_LEN {
            return Err(ValidationError::TooLong {
                what: "description",
                max: MAX_TEXT_LEN,
            });
        }
        if !self.at.is_valid() {
            return Err(ValidationError::InvalidCoordinate);
        }
        Ok(NewPlace {
            name: name.to_string(),
            category: self.category().to_string(),
            description: description.to_string(),
            address: self.field(3).to_string(),
            latitude: self.at.lat,
            longitude: self.at.lon,
            added_by: author.to_string(),
            contact: self.field(4).to_string(),
            opening_hours: self.field(5).to_string(),
            tags: self
                .field(6)
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(str::to_string)
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_text() {
        assert_eq!(validate_text("  hi  ", "a comment", 10), Ok("hi"));
        assert_eq!(
            validate_text("   ", "a comment", 10),
            Err(ValidationError::Empty("a comment"))
        );
        let long = "x".repeat(11);
        let err = validate_text(&long, "comment", 10).unwrap_err();
        assert_eq!(err.to_string(), "Comment is too long (max 10 characters)");
    }

    #[test]
    fn test_validate_counts_chars_not_bytes() {
        let text = "é".repeat(MAX_TEXT_LEN);
        assert!(validate_text(&text, "feedback", MAX_TEXT_LEN).is_ok());
    }

    #[test]
    fn test_counter_levels() {
        assert_eq!(CounterLevel::for_len(800), CounterLevel::Normal);
        assert_eq!(CounterLevel::for_len(801), CounterLevel::Warning);
        assert_eq!(CounterLevel::for_len(950), CounterLevel::Warning);
        assert_eq!(CounterLevel::for_len(951), CounterLevel::Critical);
    }

    #[test]
    fn test_rating() {
        assert_eq!(Rating::new(0), None);
        assert_eq!(Rating::new(6), None);
        assert_eq!(Rating::new(2).map(|r| r.label()), Some("Okish"));
        assert_eq!(Rating::new(5).map(|r| r.label()), Some("OMG I LOVE THIS"));
    }

    #[test]
    fn test_feedback_form() {
        let mut form = FeedbackForm::default();
        assert_eq!(form.validate().unwrap_err().to_string(), "Please enter your feedback");
        assert_eq!(form.rating_label(), "Select a rating");
        for ch in "love it".chars() {
            form.focused().push(ch);
        }
        form.rating = Rating::new(4);
        let feedback = form.validate().unwrap();
        assert_eq!(feedback.feedback, "love it");
        assert_eq!(feedback.rating, Some(4));
        assert_eq!(feedback.email, None);

        form.toggle_focus();
        for ch in "a@b.c".chars() {
            form.focused().push(ch);
        }
        assert_eq!(form.validate().unwrap().email.as_deref(), Some("a@b.c"));
    }

    #[test]
    fn test_place_form() {
        let mut form = PlaceForm::new(Coordinate::new(10.0, 20.0));
        assert_eq!(form.category(), "Other");
        assert!(matches!(form.validate("ana"), Err(ValidationError::Empty(_))));

        for ch in "Tea House".chars() {
            form.focused().unwrap().push(ch);
        }
        form.next_field();
        assert!(form.focused().is_none());
        form.cycle_category(true);
        assert_eq!(form.category(), "Cafe");
        form.prev_field();
        form.prev_field();
        assert_eq!(form.focus, PLACE_FIELDS.len() - 1);
        for ch in "tea, quiet, ,".chars() {
            form.focused().unwrap().push(ch);
        }

        let place = form.validate("ana").unwrap();
        assert_eq!(place.name, "Tea House");
        assert_eq!(place.category, "Cafe");
        assert_eq!(place.added_by, "ana");
        assert_eq!((place.latitude, place.longitude), (10.0, 20.0));
        assert_eq!(place.tags, ["tea", "quiet"]);
    }

    #[test]
    fn test_text_input() {
        let mut input = TextInput::with_value("ab");
        input.push('ç');
        assert_eq!(input.len(), 3);
        input.backspace();
        assert_eq!(input.value(), "ab");
        input.clear();
        assert!(input.is_empty());
    }
}
