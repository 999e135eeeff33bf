use serde::Deserialize;
use serde_json::{json, Map, Value};

use super::{is_valid_email, trimmed, ValidationError, Validator};
use crate::auth::Role;

/// Fields never returned to clients.
pub const PRIVATE_FIELDS: [&str; 3] = ["password", "resetPasswordToken", "resetPasswordExpire"];

pub const MIN_PASSWORD_LEN: usize = 6;

/// Self-registration. Only `user` and `publisher` may be chosen here.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl RegisterInput {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.required(&self.name, "name", "Please add a name");
        v.required(&self.email, "email", "Please add an email");
        v.required(&self.password, "password", "Please add a password");
        validate_email(&mut v, &self.email);
        validate_password(&mut v, &self.password);
        if let Some(role) = self.role {
            v.check(role != Role::Admin, "role", "Role must be user or publisher");
        }
        v.finish()
    }

    pub fn into_input(self) -> UserInput {
        UserInput {
            name: self.name,
            email: self.email,
            password: self.password,
            role: self.role,
        }
    }
}

/// Admin-managed user fields. The password arrives in plaintext and is hashed by the caller.
#[derive(Debug, Default, Deserialize)]
pub struct UserInput {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<Role>,
}

impl UserInput {
    pub fn validate_new(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        v.required(&self.name, "name", "Please add a name");
        v.required(&self.email, "email", "Please add an email");
        v.required(&self.password, "password", "Please add a password");
        validate_email(&mut v, &self.email);
        validate_password(&mut v, &self.password);
        v.finish()
    }

    pub fn validate_update(&self) -> Result<(), ValidationError> {
        let mut v = Validator::new();
        if self.name.is_some() {
            v.required(&self.name, "name", "Please add a name");
        }
        validate_email(&mut v, &self.email);
        validate_password(&mut v, &self.password);
        v.finish()
    }

    /// Document fields; `password_hash` replaces the plaintext password when given.
    pub fn into_patch(self, password_hash: Option<String>) -> Map<String, Value> {
        let mut patch = Map::new();
        if let Some(name) = trimmed(self.name) {
            patch.insert("name".into(), json!(name));
        }
        if let Some(email) = self.email {
            patch.insert("email".into(), json!(normalize_email(&email)));
        }
        if let Some(role) = self.role {
            patch.insert("role".into(), json!(role));
        }
        if let Some(hash) = password_hash {
            patch.insert("password".into(), json!(hash));
        }
        patch
    }

    pub fn into_document(self, password_hash: String) -> Map<String, Value> {
        let mut doc = Map::new();
        doc.insert("role".into(), json!(Role::User));
        doc.extend(self.into_patch(Some(password_hash)));
        doc
    }
}

fn validate_email(v: &mut Validator, email: &Option<String>) {
    if let Some(email) = email {
        v.check(is_valid_email(email.trim()), "email", "Please enter a valid email");
    }
}

fn validate_password(v: &mut Validator, password: &Option<String>) {
    if let Some(password) = password {
        v.check(
            password.chars().count() >= MIN_PASSWORD_LEN,
            "password",
            "Password must be at least 6 characters",
        );
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Copy of a user document without credentials or reset state.
pub fn public_view(doc: &Value) -> Value {
    let mut doc = doc.clone();
    if let Value::Object(fields) = &mut doc {
        for key in PRIVATE_FIELDS {
            fields.remove(key);
        }
    }
    doc
}

pub fn password_hash(doc: &Value) -> Option<&str> {
    doc.get("password").and_then(Value::as_str)
}
