//! Authentication Models
//! Mission: Define user accounts, roles and the session claim schema

use serde::{Deserialize, Serialize};

/// User account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub staff_no: Option<String>,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // bcrypt hash - never serialize
    pub full_name: String,
    pub role: UserRole,
    pub status: AccountStatus,
    pub created_at: String,
    pub last_login: Option<String>,
}

/// User roles for RBAC
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,       // Full access, user management
    Member,      // Cooperative member, read access
    LoanOfficer, // Records and manages loans
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin => "admin",
            UserRole::Member => "member",
            UserRole::LoanOfficer => "loan_officer",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "admin" => Some(UserRole::Admin),
            "member" => Some(UserRole::Member),
            "loan_officer" => Some(UserRole::LoanOfficer),
            _ => None,
        }
    }
}

/// Whether an account may log in
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(AccountStatus::Active),
            "inactive" => Some(AccountStatus::Inactive),
            _ => None,
        }
    }
}

/// Session token claims. `iat`/`exp` are added by the signer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    pub sub: i64, // subject (user id)
    pub email: String,
    pub role: UserRole,
    pub status: AccountStatus,
}

impl SessionClaims {
    pub fn for_user(user: &User) -> Self {
        Self {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            status: user.status,
        }
    }

    pub fn has_role(&self, allowed: &[UserRole]) -> bool {
        allowed.contains(&self.role)
    }
}

/// Login request body. `identifier` is an email address or a staff number.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default, alias = "email", alias = "staff_no")]
    pub identifier: String,
    #[serde(default)]
    pub password: String,
}

/// Registration request body
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub user_type: String,
    pub staff_no: Option<String>,
}

/// Login / registration response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_in: i64, // seconds until expiration
    pub user: UserResponse,
}

/// User response (sanitized)
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub staff_no: Option<String>,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
    pub status: AccountStatus,
    pub created_at: String,
    pub last_login: Option<String>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id,
            staff_no: user.staff_no.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            status: user.status,
            created_at: user.created_at.clone(),
            last_login: user.last_login.clone(),
        }
    }
}
