use serde::Deserialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

use super::{is_valid_email, trimmed, ValidationError, Validator};

pub const CAREERS: [&str; 6] = [
    "Web Development",
    "Mobile Development",
    "UI/UX",
    "Data Science",
    "Business",
    "Other",
];

pub const DEFAULT_PHOTO: &str = "no-photo.jpg";

/// Writable bootcamp fields as sent by clients. `address` is geocoded into `location`
/// and never stored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootcampInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub website: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub careers: Option<Vec<String>>,
    pub housing: Option<bool>,
    pub job_assistance: Option<bool>,
    pub job_guarantee: Option<bool>,
    pub accept_gi: Option<bool>,
}

impl BootcampInput {
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.required(&self.name, "name", "Please add a name");
        v.required(&self.description, "description", "Please add a description");
        v.required(&self.address, "address", "Please add an address");
        v.required(&self.careers, "careers", "Please add at least one career");
        self.validate_fields(&mut v);
        v.finish()
    }

    /// Only the fields present are checked.
    pub fn validate_update(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        if self.name.is_some() {
            v.required(&self.name, "name", "Please add a name");
        }
        if self.description.is_some() {
            v.required(&self.description, "description", "Please add a description");
        }
        self.validate_fields(&mut v);
        v.finish()
    }

    fn validate_fields(&self, v: &mut Validator) {
        v.max_len(&self.name, 50, "name", "Name can not be more than 50 characters");
        v.max_len(&self.description, 500, "description", "Description can not be more than 500 characters");
        v.max_len(&self.phone, 20, "phone", "Phone number can not be longer than 20 characters");
        if let Some(website) = &self.website {
            v.check(
                website.starts_with("http://") || website.starts_with("https://"),
                "website",
                "Please use a valid URL with HTTP or HTTPS",
            );
        }
        if let Some(email) = &self.email {
            v.check(is_valid_email(email), "email", "Please enter a valid email");
        }
        if let Some(careers) = &self.careers {
            for career in careers {
                if !CAREERS.contains(&career.as_str()) {
                    v.fail("careers", format!("'{}' is not a valid career", career));
                }
            }
        }
    }

    /// Full document for insertion, with defaults applied.
    pub fn into_document(self, owner: Uuid, location: Value) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("photo".into(), json!(DEFAULT_PHOTO));
        for flag in ["housing", "jobAssistance", "jobGuarantee", "acceptGi"] {
            doc.insert(flag.into(), json!(false));
        }
        doc.insert("averageRating".into(), Value::Null);
        doc.insert("averageCost".into(), Value::Null);
        doc.extend(self.into_patch(Some(location)));
        doc.insert("user".into(), json!(owner.to_string()));
        doc
    }

    /// Only the provided fields; `name` also refreshes `slug`.
    pub fn into_patch(self, location: Option<Value>) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(name) = trimmed(self.name) {
            patch.insert("slug".into(), json!(slugify(&name)));
            patch.insert("name".into(), json!(name));
        }
        let strings = [
            ("description", self.description),
            ("website", self.website),
            ("phone", self.phone),
            ("email", self.email),
        ];
        for (key, value) in strings {
            if let Some(value) = value {
                patch.insert(key.into(), json!(value));
            }
        }
        if let Some(careers) = self.careers {
            patch.insert("careers".into(), json!(careers));
        }
        let flags = [
            ("housing", self.housing),
            ("jobAssistance", self.job_assistance),
            ("jobGuarantee", self.job_guarantee),
            ("acceptGi", self.accept_gi),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                patch.insert(key.into(), json!(value));
            }
        }
        if let Some(location) = location {
            patch.insert("location".into(), location);
        }
        patch
    }
}

/// Lowercase, ASCII-alphanumeric words joined by `-`.
pub fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_ascii_lowercase)
        .collect::<Vec<_>>()
        .join("-")
}

pub fn owner_of(doc: &Value) -> Option<&str> {
    doc.get("user").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(value: Value) -> BootcampInput {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn slug_from_name() {
        assert_eq!(slugify("Devworks Bootcamp"), "devworks-bootcamp");
        assert_eq!(slugify("  UI/UX  Academy!"), "ui-ux-academy");
    }

    #[test]
    fn new_requires_core_fields() {
        let err = input(json!({ "careers": ["Cooking"] })).validate_new().unwrap_err();
        assert!(err.message.starts_with("Please add a name"));
        assert!(err.field_errors.contains_key("address"));
        assert!(err.message.contains("'Cooking' is not a valid career"));
    }

    #[test]
    fn document_has_defaults_owner_and_location() {
        let owner = Uuid::new_v4();
        let camp = input(json!({
            "name": "Devworks Bootcamp",
            "description": "Full stack",
            "address": "233 Bay State Rd Boston MA 02215",
            "careers": ["Web Development"],
            "housing": true
        }));
        camp.validate_new().unwrap();
        let doc = camp.into_document(owner, json!({ "type": "Point", "coordinates": [-71.1, 42.3] }));
        assert_eq!(doc["slug"], "devworks-bootcamp");
        assert_eq!(doc["photo"], DEFAULT_PHOTO);
        assert_eq!(doc["housing"], true);
        assert_eq!(doc["acceptGi"], false);
        assert_eq!(doc["user"], owner.to_string());
        assert!(doc.get("address").is_none());
        assert_eq!(doc["location"]["type"], "Point");
    }

    #[test]
    fn patch_only_touches_given_fields() {
        let patch = input(json!({ "phone": "(111) 111-1111" })).into_patch(None);
        assert_eq!(patch.len(), 1);
        assert!(input(json!({ "website": "ftp://x.y" })).validate_update().is_err());
    }
}
