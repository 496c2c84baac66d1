/// Input validation functions for all backend routes
use inventory_db::ObjectId;
use thiserror::Error;
use validator::ValidateEmail;

/// Minimum password length for user accounts
pub const MIN_PASSWORD_LEN: usize = 6;

/// Largest page size served; bigger requests are clamped to it
pub const MAX_PAGE_LIMIT: u64 = 100;

/// Largest offset the store can bind
const MAX_SKIP: u64 = i64::MAX as u64;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("{0} is required")]
    Required(&'static str),

    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Password too short (min {min} characters, got {actual})")]
    PasswordTooShort { min: usize, actual: usize },

    #[error("Invalid server ID")]
    InvalidServerId,

    #[error("page must be a positive integer")]
    InvalidPage,

    #[error("page is out of range")]
    PageOutOfRange,

    #[error("limit must be a positive integer")]
    InvalidLimit,
}

/// Requires a text field to contain something other than whitespace.
pub fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::Required(field));
    }
    Ok(())
}

/// Requires an integer field to be present and greater than zero.
pub fn require_positive(field: &'static str, value: Option<i64>) -> Result<i64, ValidationError> {
    match value {
        None => Err(ValidationError::Required(field)),
        Some(v) if v <= 0 => Err(ValidationError::NotPositive(field)),
        Some(v) => Ok(v),
    }
}

/// Requires a money amount to be present, finite and greater than zero.
pub fn require_amount(field: &'static str, value: Option<f64>) -> Result<f64, ValidationError> {
    match value {
        None => Err(ValidationError::Required(field)),
        Some(v) if !v.is_finite() || v <= 0.0 => Err(ValidationError::NotPositive(field)),
        Some(v) => Ok(v),
    }
}

pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    require_text("email", email)?;
    if !email.validate_email() {
        return Err(ValidationError::InvalidEmail);
    }
    Ok(())
}

/// Validates a new account password
///
/// Rules:
/// - Cannot be empty
/// - At least 6 characters (counted as chars, not bytes)
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::Required("password"));
    }

    let len = password.chars().count();
    if len < MIN_PASSWORD_LEN {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LEN,
            actual: len,
        });
    }

    Ok(())
}

/// Parses a path segment into a record id.
pub fn parse_server_id(id: &str) -> Result<ObjectId, ValidationError> {
    id.parse().map_err(|_| ValidationError::InvalidServerId)
}

/// Resolved pagination parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u64,
    pub limit: u64,
}

impl Pagination {
    /// Number of records to skip before this page starts.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Parses optional `page` / `limit` query values.
///
/// Absent or blank values fall back to page 1, limit 10. Values the caller
/// does supply are honored; `limit` is clamped to [`MAX_PAGE_LIMIT`] and the
/// page offset must fit the store's signed 64-bit OFFSET.
pub fn parse_pagination(
    page: Option<&str>,
    limit: Option<&str>,
) -> Result<Pagination, ValidationError> {
    let page = match page.map(str::trim).filter(|p| !p.is_empty()) {
        None => DEFAULT_PAGE,
        Some(p) => p
            .parse::<u64>()
            .ok()
            .filter(|&p| p >= 1)
            .ok_or(ValidationError::InvalidPage)?,
    };

    let limit = match limit.map(str::trim).filter(|l| !l.is_empty()) {
        None => DEFAULT_LIMIT,
        Some(l) => l
            .parse::<u64>()
            .ok()
            .filter(|&l| l >= 1)
            .ok_or(ValidationError::InvalidLimit)?
            .min(MAX_PAGE_LIMIT),
    };

    let fits = (page - 1)
        .checked_mul(limit)
        .is_some_and(|skip| skip <= MAX_SKIP);
    if !fits {
        return Err(ValidationError::PageOutOfRange);
    }

    Ok(Pagination { page, limit })
}
