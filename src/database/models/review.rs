use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{trimmed, ValidationError, Validator};

#[derive(Debug, Default, Deserialize)]
pub struct ReviewInput {
    pub title: Option<String>,
    pub text: Option<String>,
    pub rating: Option<f64>,
}

impl ReviewInput {
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.required(&self.title, "title", "Please add a review title");
        v.required(&self.text, "text", "Please add a text");
        v.required(&self.rating, "rating", "Please add a rating between 1 and 10");
        self.validate_fields(&mut v);
        v.finish()
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        self.validate_fields(&mut v);
        v.finish()
    }

    fn validate_fields(&self, v: &mut Validator) {
        v.max_len(&self.title, 100, "title", "Title can not be more than 100 characters");
        if let Some(rating) = self.rating {
            v.check((1.0..=10.0).contains(&rating), "rating", "Please add a rating between 1 and 10");
        }
    }

    pub fn into_document(self, bootcamp: Uuid, owner: Uuid) -> Map<String, Value> {
        let mut doc = self.into_patch();
        doc.insert("bootcamp".into(), json!(bootcamp.to_string()));
        doc.insert("user".into(), json!(owner.to_string()));
        doc
    }

    pub fn into_patch(self) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(title) = trimmed(self.title) {
            patch.insert("title".into(), json!(title));
        }
        if let Some(text) = trimmed(self.text) {
            patch.insert("text".into(), json!(text));
        }
        if let Some(rating) = self.rating {
            patch.insert("rating".into(), json!(rating));
        }
        patch
    }
}

/// `ceil(avg)`, or `None` for no ratings.
pub fn average_rating(ratings: &[f64]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    Some((ratings.iter().sum::<f64>() / ratings.len() as f64).ceil())
}
