//! Form payloads and their validation.
//!
//! Every form trims its text fields before validating (passwords excepted)
//! and reports failures as a [`FormErrors`] map keyed by field name.

use std::collections::BTreeMap;

use email_address::EmailAddress;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Key for errors that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "__all__";

pub const TITLE_MAX_LENGTH: usize = 200;
pub const USERNAME_MAX_LENGTH: usize = 150;
pub const EMAIL_MAX_LENGTH: usize = 254;
pub const PASSWORD_MIN_LENGTH: usize = 8;

const MAX_SIMILARITY: f64 = 0.7;

pub const REQUIRED: &str = "This field is required.";
pub const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
pub const INACTIVE_ACCOUNT: &str = "This account is inactive.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const PASSWORD_MISMATCH: &str = "The two password fields didn't match.";

const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
const INVALID_EMAIL: &str = "Enter a valid email address.";

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "12345678", "123456789", "1234567890", "password", "password1", "password123",
    "qwerty", "qwerty123", "qwertyuiop", "abc123", "abcd1234", "111111", "11111111", "000000",
    "iloveyou", "letmein", "welcome", "welcome1", "monkey", "dragon", "football", "baseball",
    "sunshine", "princess", "superman", "starwars", "trustno1", "passw0rd", "master",
    "shadow", "whatever", "freedom", "computer", "internet", "changeme", "administrator",
    "1q2w3e4r", "zaq12wsx", "asdfghjkl",
];

/// Field name -> messages, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(transparent)]
#[error("invalid form fields: {}", .0.keys().cloned().collect::<Vec<_>>().join(", "))]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// A single error not tied to a field.
    pub fn non_field(message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(NON_FIELD_ERRORS, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// `Ok(value)` when no errors were recorded.
    pub fn finish<T>(self, value: T) -> Result<T, FormErrors> {
        if self.is_empty() { Ok(value) } else { Err(self) }
    }

    pub fn into_map(self) -> BTreeMap<String, Vec<String>> {
        self.0
    }
}

fn too_long(max: usize, actual: usize) -> String {
    format!("Ensure this value has at most {max} characters (it has {actual}).")
}

/// Trims `value`, recording a required error when nothing is left.
fn required(errors: &mut FormErrors, field: &str, value: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        errors.add(field, REQUIRED);
    }
    value.to_string()
}

fn max_length(errors: &mut FormErrors, field: &str, value: &str, max: usize) {
    let count = value.chars().count();
    if count > max {
        errors.add(field, too_long(max, count));
    }
}

// ---------------------------------------------------------------------------
// Posts and comments
// ---------------------------------------------------------------------------

/// Post create/update form.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidPost {
    pub title: String,
    pub content: String,
}

impl PostForm {
    pub fn validate(&self) -> Result<ValidPost, FormErrors> {
        let mut errors = FormErrors::new();
        let title = required(&mut errors, "title", &self.title);
        max_length(&mut errors, "title", &title, TITLE_MAX_LENGTH);
        let content = required(&mut errors, "content", &self.content);
        errors.finish(ValidPost { title, content })
    }
}

/// Comment form: the post and author come from the request context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub content: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FormErrors> {
        let mut errors = FormErrors::new();
        let content = required(&mut errors, "content", &self.content);
        errors.finish(content)
    }
}

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<Credentials, FormErrors> {
        let mut errors = FormErrors::new();
        let username = required(&mut errors, "username", &self.username);
        if self.password.is_empty() {
            errors.add("password", REQUIRED);
        }
        errors.finish(Credentials {
            username,
            password: self.password.clone(),
        })
    }
}

/// Registration form with password confirmation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidRegistration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    /// The username after normalization, as it will be stored.
    pub fn normalized_username(&self) -> &str {
        self.username.trim()
    }

    /// Validates the form. `username_taken` reports whether
    /// [`Self::normalized_username`] already belongs to an account.
    pub fn validate(&self, username_taken: bool) -> Result<ValidRegistration, FormErrors> {
        let mut errors = FormErrors::new();

        let username = required(&mut errors, "username", &self.username);
        if !username.is_empty() {
            max_length(&mut errors, "username", &username, USERNAME_MAX_LENGTH);
            if !is_valid_username(&username) {
                errors.add("username", INVALID_USERNAME);
            } else if username_taken {
                errors.add("username", USERNAME_TAKEN);
            }
        }

        let email = required(&mut errors, "email", &self.email);
        if !email.is_empty() {
            max_length(&mut errors, "email", &email, EMAIL_MAX_LENGTH);
            if !EmailAddress::is_valid(&email) {
                errors.add("email", INVALID_EMAIL);
            }
        }

        if self.password1.is_empty() {
            errors.add("password1", REQUIRED);
        }
        if self.password2.is_empty() {
            errors.add("password2", REQUIRED);
        }
        if !self.password1.is_empty() && !self.password2.is_empty() {
            if self.password1 != self.password2 {
                errors.add("password2", PASSWORD_MISMATCH);
            } else {
                for problem in password_problems(&self.password2, &username, &email) {
                    errors.add("password2", problem);
                }
            }
        }

        errors.finish(ValidRegistration {
            username,
            email,
            password: self.password1.clone(),
        })
    }
}

/// Letters, digits and `@ . + - _`.
pub fn is_valid_username(username: &str) -> bool {
    !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// Strength checks applied to a new password. Empty when acceptable.
pub fn password_problems(password: &str, username: &str, email: &str) -> Vec<String> {
    let mut problems = Vec::new();

    for (attribute, value) in [("username", username), ("email address", email)] {
        if is_too_similar(password, value) {
            problems.push(format!("The password is too similar to the {attribute}."));
            break;
        }
    }

    let length = password.chars().count();
    if length < PASSWORD_MIN_LENGTH {
        problems.push(format!(
            "This password is too short. It must contain at least {PASSWORD_MIN_LENGTH} characters."
        ));
    }

    let lowered = password.trim().to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        problems.push("This password is too common.".to_string());
    }

    if password.chars().all(|c| c.is_ascii_digit()) {
        problems.push("This password is entirely numeric.".to_string());
    }

    problems
}

/// Compares the password against the attribute and each of its word parts.
fn is_too_similar(password: &str, attribute: &str) -> bool {
    if attribute.is_empty() {
        return false;
    }
    let password = password.to_lowercase();
    let attribute = attribute.to_lowercase();
    attribute
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|part| !part.is_empty())
        .chain(std::iter::once(attribute.as_str()))
        .any(|part| similarity_ratio(&password, part) >= MAX_SIMILARITY)
}

/// `2 * shared characters / total characters`, ignoring order.
fn similarity_ratio(a: &str, b: &str) -> f64 {
    let total = a.chars().count() + b.chars().count();
    if total == 0 {
        return 1.0;
    }
    let mut available: BTreeMap<char, usize> = BTreeMap::new();
    for c in b.chars() {
        *available.entry(c).or_default() += 1;
    }
    let mut shared = 0usize;
    for c in a.chars() {
        if let Some(count) = available.get_mut(&c).filter(|count| **count > 0) {
            *count -= 1;
            shared += 1;
        }
    }
    2.0 * shared as f64 / total as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, password1: &str, password2: &str) -> RegisterForm {
        RegisterForm {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password1: password1.to_string(),
            password2: password2.to_string(),
        }
    }

    #[test]
    fn test_post_form_trims_and_requires_fields() {
        let form = PostForm {
            title: "   ".to_string(),
            content: String::new(),
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(errors.get("title"), [REQUIRED.to_string()]);
        assert_eq!(errors.get("content"), [REQUIRED.to_string()]);

        let valid = PostForm {
            title: "  Hello  ".to_string(),
            content: "body".to_string(),
        }
        .validate()
        .unwrap();
        assert_eq!(valid.title, "Hello");
    }

    #[test]
    fn test_post_title_length_limit() {
        let ok = PostForm {
            title: "a".repeat(200),
            content: "x".to_string(),
        };
        assert!(ok.validate().is_ok());

        let too_long = PostForm {
            title: "a".repeat(201),
            content: "x".to_string(),
        };
        let errors = too_long.validate().unwrap_err();
        assert_eq!(
            errors.get("title"),
            ["Ensure this value has at most 200 characters (it has 201).".to_string()]
        );
    }

    #[test]
    fn test_comment_form_rejects_whitespace() {
        let errors = CommentForm {
            content: " \n\t".to_string(),
        }
        .validate()
        .unwrap_err();
        assert!(errors.has("content"));
    }

    #[test]
    fn test_login_form_requires_both_fields() {
        let errors = LoginForm::default().validate().unwrap_err();
        assert!(errors.has("username"));
        assert!(errors.has("password"));
    }

    #[test]
    fn test_valid_registration() {
        let form = registration("alice", "correct-horse-battery", "correct-horse-battery");
        let valid = form.validate(false).unwrap();
        assert_eq!(valid.username, "alice");
        assert_eq!(valid.email, "alice@example.com");
        assert_eq!(valid.password, "correct-horse-battery");
    }

    #[test]
    fn test_registration_password_mismatch() {
        let errors = registration("alice", "correct-horse-battery", "correct-horse-staple")
            .validate(false)
            .unwrap_err();
        assert_eq!(errors.get("password2"), [PASSWORD_MISMATCH.to_string()]);
    }

    #[test]
    fn test_registration_duplicate_username() {
        let errors = registration("alice", "correct-horse-battery", "correct-horse-battery")
            .validate(true)
            .unwrap_err();
        assert_eq!(errors.get("username"), [USERNAME_TAKEN.to_string()]);
    }

    #[test]
    fn test_registration_rejects_bad_username_and_email() {
        let mut form = registration("bad name!", "correct-horse-battery", "correct-horse-battery");
        form.email = "not-an-email".to_string();
        let errors = form.validate(false).unwrap_err();
        assert_eq!(errors.get("username"), [INVALID_USERNAME.to_string()]);
        assert_eq!(errors.get("email"), [INVALID_EMAIL.to_string()]);
    }

    #[test]
    fn test_weak_passwords() {
        let short = password_problems("a1b2c3", "alice", "");
        assert!(short.iter().any(|p| p.contains("too short")));

        let numeric = password_problems("9081726354", "alice", "");
        assert_eq!(numeric, vec!["This password is entirely numeric.".to_string()]);

        let common = password_problems("password123", "alice", "");
        assert_eq!(common, vec!["This password is too common.".to_string()]);

        let similar = password_problems("alice2024", "alice", "");
        assert_eq!(
            similar,
            vec!["The password is too similar to the username.".to_string()]
        );
    }

    #[test]
    fn test_strong_password_passes() {
        assert!(password_problems("correct-horse-battery", "alice", "alice@example.com").is_empty());
    }

    #[test]
    fn test_username_characters() {
        assert!(is_valid_username("jane.doe+blog@site_1-a"));
        assert!(!is_valid_username("jane doe"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn test_similarity_ratio() {
        assert_eq!(similarity_ratio("abc", "abc"), 1.0);
        assert_eq!(similarity_ratio("abc", "xyz"), 0.0);
        assert!((similarity_ratio("ab", "abcd") - 2.0 * 2.0 / 6.0).abs() < f64::EPSILON);
    }
}
