//! Cooperative domain models: members, loans and dashboard statistics

use serde::{Deserialize, Serialize};

/// Membership state of a cooperative member
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MemberStatus {
    Active,
    Inactive,
    Pending,
}

impl MemberStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MemberStatus::Active => "active",
            MemberStatus::Inactive => "inactive",
            MemberStatus::Pending => "pending",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "active" => Some(MemberStatus::Active),
            "inactive" => Some(MemberStatus::Inactive),
            "pending" => Some(MemberStatus::Pending),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Member {
    pub member_id: i64,
    pub member_number: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub status: MemberStatus,
    pub created_at: String,
}

/// Member registration request
#[derive(Debug, Clone, Deserialize)]
pub struct NewMember {
    pub member_number: String,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(default = "default_member_status")]
    pub status: MemberStatus,
}

fn default_member_status() -> MemberStatus {
    MemberStatus::Pending
}

/// Loan lifecycle state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Pending,
    Approved,
    Active,
    Completed,
    Rejected,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Pending => "pending",
            LoanStatus::Approved => "approved",
            LoanStatus::Active => "active",
            LoanStatus::Completed => "completed",
            LoanStatus::Rejected => "rejected",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(LoanStatus::Pending),
            "approved" => Some(LoanStatus::Approved),
            "active" => Some(LoanStatus::Active),
            "completed" => Some(LoanStatus::Completed),
            "rejected" => Some(LoanStatus::Rejected),
            _ => None,
        }
    }
}

/// Loan row joined with the borrowing member's name and number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Loan {
    pub loan_id: i64,
    pub member_id: i64,
    pub member_name: Option<String>,
    pub member_number: Option<String>,
    pub principal_amount: f64,
    pub total_amount: f64,
    pub amount_paid: f64,
    pub status: LoanStatus,
    pub created_at: String,
}

/// Loan recording request. `total_amount` defaults to the principal.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLoan {
    pub member_id: i64,
    pub principal_amount: f64,
    pub total_amount: Option<f64>,
    #[serde(default)]
    pub amount_paid: f64,
    #[serde(default = "default_loan_status")]
    pub status: LoanStatus,
}

fn default_loan_status() -> LoanStatus {
    LoanStatus::Pending
}

impl NewLoan {
    /// Reject amounts that cannot describe a real loan
    pub fn validate(&self) -> Result<(), &'static str> {
        if !self.principal_amount.is_finite() || self.principal_amount <= 0.0 {
            return Err("principal_amount must be greater than zero");
        }
        let total = self.total_amount.unwrap_or(self.principal_amount);
        if !total.is_finite() || total < self.principal_amount {
            return Err("total_amount must not be less than principal_amount");
        }
        if !self.amount_paid.is_finite() || self.amount_paid < 0.0 {
            return Err("amount_paid must not be negative");
        }
        Ok(())
    }
}

/// Filters for the loan listing
#[derive(Debug, Clone, Copy, Default)]
pub struct LoanFilter {
    pub status: Option<LoanStatus>,
    pub member_id: Option<i64>,
}

/// Aggregate figures for the dashboard
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DashboardStats {
    pub total_members: i64,
    pub active_members: i64,
    pub pending_members: i64,
    pub total_users: i64,
    pub total_loans: i64,
    pub active_loans_amount: f64,
    pub pending_loans: i64,
    pub approved_loans: i64,
    pub total_loan_amount: f64,
    pub total_amount_paid: f64,
    pub repayment_rate: f64,
    pub members_this_month: i64,
    pub loans_this_month: i64,
}

/// Paid share of the owed amount as a percentage with two decimals; 0 when nothing is owed
pub fn repayment_rate(total_amount: f64, amount_paid: f64) -> f64 {
    if total_amount > 0.0 {
        ((amount_paid / total_amount) * 100.0 * 100.0).round() / 100.0
    } else {
        0.0
    }
}
