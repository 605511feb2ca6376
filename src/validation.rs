//! The signup schema, shared by the client form and the signup route.

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

pub const USERNAME_REQUIRED: &str = "username is required!";
pub const USERNAME_TOO_SHORT: &str = "Length of the name is too short!";
pub const EMAIL_REQUIRED: &str = "Email is required!";
pub const EMAIL_INVALID: &str = "Invalid email address!";
pub const PASSWORD_REQUIRED: &str = "Password is required!";
pub const PASSWORD_WEAK: &str = "Password must contain at least 8 characters, one uppercase, one lowercase, one number and one special character";

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const PASSWORD_SPECIAL_CHARS: &str = "@$!%*?&";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Username,
    Email,
    Password,
}

impl Field {
    /// Every field, in form order.
    pub const ALL: [Field; 3] = [Field::Username, Field::Email, Field::Password];
}

/// The values entered on the signup form; also the body of `POST /signup`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub username: String,
}

impl SignupForm {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Username => &self.username,
            Field::Email => &self.email,
            Field::Password => &self.password,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Username => self.username = value,
            Field::Email => self.email = value,
            Field::Password => self.password = value,
        }
    }

    /// Checks every field independently and collects one message per failing field.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let errors = FieldErrors {
            username: validate_username(&self.username).err(),
            email: validate_email(&self.email).err(),
            password: validate_password(&self.password).err(),
        };

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    pub username: Option<&'static str>,
    pub email: Option<&'static str>,
    pub password: Option<&'static str>,
}

impl FieldErrors {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none() && self.password.is_none()
    }

    pub fn get(&self, field: Field) -> Option<&'static str> {
        match field {
            Field::Username => self.username,
            Field::Email => self.email,
            Field::Password => self.password,
        }
    }

    /// Drops the messages of the fields `keep` rejects.
    pub fn retain(mut self, keep: impl Fn(Field) -> bool) -> Self {
        for field in Field::ALL {
            if !keep(field) {
                match field {
                    Field::Username => self.username = None,
                    Field::Email => self.email = None,
                    Field::Password => self.password = None,
                }
            }
        }
        self
    }

    /// The first message in form order.
    pub fn first(&self) -> Option<&'static str> {
        self.username.or(self.email).or(self.password)
    }
}

pub fn validate_username(username: &str) -> Result<(), &'static str> {
    if username.is_empty() {
        Err(USERNAME_REQUIRED)
    } else if username.chars().count() < MIN_USERNAME_LENGTH {
        Err(USERNAME_TOO_SHORT)
    } else {
        Ok(())
    }
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.is_empty() {
        Err(EMAIL_REQUIRED)
    } else if !email_pattern().is_match(email) {
        Err(EMAIL_INVALID)
    } else {
        Ok(())
    }
}

/// At least eight characters drawn from letters, digits and `@$!%*?&`, with one of each of
/// lowercase, uppercase, digit and special character.
pub fn validate_password(password: &str) -> Result<(), &'static str> {
    if password.is_empty() {
        return Err(PASSWORD_REQUIRED);
    }

    let strong = password_charset().is_match(password)
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SPECIAL_CHARS.contains(c));

    if strong {
        Ok(())
    } else {
        Err(PASSWORD_WEAK)
    }
}

fn email_pattern() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| {
        Regex::new(
            r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$",
        )
        .expect("email pattern compiles")
    })
}

fn password_charset() -> &'static Regex {
    static CHARSET: OnceLock<Regex> = OnceLock::new();
    CHARSET.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9@$!%*?&]{8,}$").expect("password pattern compiles")
    })
}
