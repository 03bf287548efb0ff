use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

/// Staff roles
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Admin,
    Pharmacist,
    Clinician,
    Receptionist,
}

impl Role {
    /// Abilities granted when a user is created without an explicit list.
    pub fn default_abilities(&self) -> &'static [&'static str] {
        match self {
            Role::Admin => &["*"],
            Role::Pharmacist => &["pharmacy.read", "pharmacy.write", "pharmacy.sell"],
            Role::Clinician => &[
                "patients.read",
                "patients.write",
                "patients.audit",
                "visites.read",
                "visites.write",
            ],
            Role::Receptionist => &[
                "patients.read",
                "patients.write",
                "visites.read",
                "visites.write",
            ],
        }
    }
}

/// Union of the roles' default abilities, in first-seen order.
pub fn abilities_for(roles: &[Role]) -> Vec<String> {
    let mut abilities: Vec<String> = Vec::new();
    for ability in roles.iter().flat_map(|r| r.default_abilities()) {
        if !abilities.iter().any(|a| a == ability) {
            abilities.push(ability.to_string());
        }
    }
    abilities
}

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    /// Stored lowercased, unique
    pub email: String,
    pub name: String,
    /// Argon2 password hash (never exposed in API responses)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub roles: Vec<Role>,
    /// Ability names; `*` grants all
    pub abilities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user (password must already be hashed)
    pub fn new(
        email: String,
        name: String,
        password_hash: String,
        roles: Vec<Role>,
        abilities: Vec<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: email.trim().to_lowercase(),
            name,
            password_hash,
            roles,
            abilities,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role_names(&self) -> Vec<String> {
        self.roles.iter().map(|r| r.to_string()).collect()
    }
}

/// User response DTO (without password_hash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub roles: Vec<Role>,
    pub abilities: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            roles: user.roles,
            abilities: user.abilities,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Password must be 8 to 128 characters with a letter and a digit.
pub fn password_strength(password: &str) -> Result<(), ValidationError> {
    let long_enough = (8..=128).contains(&password.chars().count());
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if long_enough && has_letter && has_digit {
        Ok(())
    } else {
        Err(ValidationError::new("password").with_message(
            "must be 8 to 128 characters and contain a letter and a digit".into(),
        ))
    }
}

fn ability_names(abilities: &[String]) -> Result<(), ValidationError> {
    let valid = abilities.iter().all(|a| {
        !a.is_empty()
            && a.len() <= 64
            && a.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '*'))
    });
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("ability").with_message("unknown ability format".into()))
    }
}

/// DTO for creating a staff user
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateUser {
    #[validate(email, length(max = 190))]
    pub email: String,
    #[validate(length(min = 1, max = 190))]
    pub name: String,
    #[validate(custom(function = "password_strength"))]
    pub password: String,
    #[validate(length(min = 1))]
    pub roles: Vec<Role>,
    /// Defaults to the union of the roles' abilities
    #[validate(custom(function = "ability_names"))]
    pub abilities: Option<Vec<String>>,
}

/// Query filters for listing users
#[derive(Debug, Clone, Deserialize, ToSchema, IntoParams)]
pub struct UserFilter {
    /// Case-insensitive match on email or name
    pub search: Option<String>,
    pub role: Option<Role>,
    #[serde(default = "default_limit")]
    pub limit: u64,
    #[serde(default)]
    pub offset: u64,
}

impl Default for UserFilter {
    fn default() -> Self {
        Self {
            search: None,
            role: None,
            limit: default_limit(),
            offset: 0,
        }
    }
}

fn default_limit() -> u64 {
    50
}

/// Page of users
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPage {
    pub data: Vec<UserResponse>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// DTO for user login
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(email, length(max = 190))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Bearer token issued on login
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `Bearer`
    pub token_type: String,
    /// Seconds until the token expires
    pub expires_in: i64,
    pub user: UserResponse,
}
