use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{string_or_number, trimmed, ValidationError, Validator};

pub const SKILLS: [&str; 3] = ["beginner", "intermediate", "advanced"];

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseInput {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub weeks: Option<String>,
    pub tuition: Option<f64>,
    pub minimum_skill: Option<String>,
    pub scholarships_available: Option<bool>,
}

impl CourseInput {
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.required(&self.title, "title", "Please add a title");
        v.required(&self.description, "description", "Please add a description");
        v.required(&self.weeks, "weeks", "Please add a number of weeks");
        v.required(&self.tuition, "tuition", "Please add a tuition");
        v.required(&self.minimum_skill, "minimumSkill", "Please add a minimum skill");
        self.validate_fields(&mut v);
        v.finish()
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        self.validate_fields(&mut v);
        v.finish()
    }

    fn validate_fields(&self, v: &mut Validator) {
        if let Some(skill) = &self.minimum_skill {
            v.check(
                SKILLS.contains(&skill.as_str()),
                "minimumSkill",
                "Minimum skill must be beginner, intermediate or advanced",
            );
        }
        if let Some(tuition) = self.tuition {
            v.check(tuition >= 0.0, "tuition", "Tuition can not be negative");
        }
    }

    pub fn into_document(self, bootcamp: Uuid, owner: Uuid) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("scholarshipsAvailable".into(), json!(false));
        doc.extend(self.into_patch());
        doc.insert("bootcamp".into(), json!(bootcamp.to_string()));
        doc.insert("user".into(), json!(owner.to_string()));
        doc
    }

    pub fn into_patch(self) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(title) = trimmed(self.title) {
            patch.insert("title".into(), json!(title));
        }
        if let Some(description) = trimmed(self.description) {
            patch.insert("description".into(), json!(description));
        }
        if let Some(weeks) = self.weeks {
            patch.insert("weeks".into(), json!(weeks));
        }
        if let Some(tuition) = self.tuition {
            patch.insert("tuition".into(), json!(tuition));
        }
        if let Some(skill) = self.minimum_skill {
            patch.insert("minimumSkill".into(), json!(skill));
        }
        if let Some(scholarships) = self.scholarships_available {
            patch.insert("scholarshipsAvailable".into(), json!(scholarships));
        }
        patch
    }
}

/// `ceil(avg * 10) / 10`, or `None` for no tuitions.
pub fn average_cost(tuitions: &[f64]) -> Option<f64> {
    if tuitions.is_empty() {
        return None;
    }
    let avg = tuitions.iter().sum::<f64>() / tuitions.len() as f64;
    Some((avg * 10.0).ceil() / 10.0)
}
