//! JSON request and response bodies for the HTTP API.
//!
//! All money fields are integer minor units and carry a `_minor` suffix.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

/// Returned when a ledger entry is created.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionCreated {
    pub id: i32,
}

/// One requested share of a donation or withdrawal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationNew {
    pub funding_pool_id: i32,
    pub amount_minor: i64,
}

pub mod funding_pool {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundingPool {
        pub id: i32,
        pub name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        pub goal_amount_minor: i64,
        pub current_amount_minor: i64,
    }

    /// Body of both create and update.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct FundingPoolInput {
        pub name: String,
        #[serde(default)]
        pub description: Option<String>,
        pub goal_amount_minor: i64,
    }
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct GoogleCallback {
        /// ID token issued by the identity provider.
        pub credential: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserView {
        pub subject_id: String,
        pub email: String,
        pub first_name: String,
        pub last_name: String,
        pub is_moderator: bool,
    }
}

pub mod ledger {
    use super::*;

    #[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum TransactionType {
        Deposit,
        Withdrawal,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct Allocation {
        pub id: i32,
        pub ledger_id: i32,
        pub funding_pool_id: i32,
        pub amount_minor: i64,
    }

    /// Public view of a ledger entry. The attributed user id is not exposed.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerEntry {
        pub id: i32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub transaction_id: Option<String>,
        pub amount_minor: i64,
        pub timestamp: DateTime<Utc>,
        pub transaction_type: TransactionType,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub first_name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub last_initial: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub description: Option<String>,
        pub anonymous: bool,
        pub allocations: Vec<Allocation>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LedgerResponse {
        pub transactions: Vec<LedgerEntry>,
        pub total_donations_minor: i64,
        pub total_withdrawals_minor: i64,
    }
}

pub mod donation {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CaptureRequest {
        #[serde(alias = "orderID")]
        pub order_id: String,
        pub allocations: Vec<AllocationNew>,
        #[serde(default)]
        pub description: Option<String>,
        #[serde(default, alias = "isAnonymous")]
        pub is_anonymous: bool,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct CaptureResponse {
        pub status: String,
        pub transaction_id: String,
        pub ledger_id: i32,
        pub amount_minor: i64,
    }

    /// Donation received outside the payment processor.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExternalDonation {
        pub allocations: Vec<AllocationNew>,
        pub description: String,
    }
}

pub mod withdrawal {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct WithdrawalNew {
        pub allocations: Vec<AllocationNew>,
        pub description: String,
    }
}

pub mod site {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct SiteInstance {
        pub site_title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub site_headline: Option<String>,
    }
}
