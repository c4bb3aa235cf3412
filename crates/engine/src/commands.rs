//! Command structs for engine operations.
//!
//! These types group parameters for write operations (pool lifecycle,
//! donations, withdrawals), keeping call sites readable and avoiding long
//! argument lists.

use crate::MoneyCents;

/// The share of an event requested for one funding pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AllocationRequest {
    pub funding_pool_id: i32,
    pub amount: MoneyCents,
}

impl AllocationRequest {
    #[must_use]
    pub fn new(funding_pool_id: i32, amount_minor: i64) -> Self {
        Self {
            funding_pool_id,
            amount: MoneyCents::new(amount_minor),
        }
    }
}

/// Create or update a funding pool.
#[derive(Clone, Debug)]
pub struct PoolCmd {
    pub moderator: String,
    pub name: String,
    pub description: Option<String>,
    pub goal_amount: MoneyCents,
}

impl PoolCmd {
    #[must_use]
    pub fn new(moderator: impl Into<String>, name: impl Into<String>, goal_amount_minor: i64) -> Self {
        Self {
            moderator: moderator.into(),
            name: name.into(),
            description: None,
            goal_amount: MoneyCents::new(goal_amount_minor),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn description_opt(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Record a donation paid through the payment processor.
#[derive(Clone, Debug)]
pub struct CaptureDonationCmd {
    pub order_id: String,
    /// Authenticated donor, if any.
    pub donor: Option<String>,
    pub anonymous: bool,
    pub description: Option<String>,
    pub allocations: Vec<AllocationRequest>,
}

impl CaptureDonationCmd {
    #[must_use]
    pub fn new(order_id: impl Into<String>, allocations: Vec<AllocationRequest>) -> Self {
        Self {
            order_id: order_id.into(),
            donor: None,
            anonymous: false,
            description: None,
            allocations,
        }
    }

    #[must_use]
    pub fn donor(mut self, subject_id: impl Into<String>) -> Self {
        self.donor = Some(subject_id.into());
        self
    }

    #[must_use]
    pub fn donor_opt(mut self, subject_id: Option<String>) -> Self {
        self.donor = subject_id;
        self
    }

    #[must_use]
    pub fn anonymous(mut self, anonymous: bool) -> Self {
        self.anonymous = anonymous;
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn description_opt(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }
}

/// Record a donation received outside the payment processor (cash, cheque).
#[derive(Clone, Debug)]
pub struct ExternalDonationCmd {
    pub moderator: String,
    pub description: String,
    pub allocations: Vec<AllocationRequest>,
}

impl ExternalDonationCmd {
    #[must_use]
    pub fn new(
        moderator: impl Into<String>,
        description: impl Into<String>,
        allocations: Vec<AllocationRequest>,
    ) -> Self {
        Self {
            moderator: moderator.into(),
            description: description.into(),
            allocations,
        }
    }
}

/// Take money out of one or more pools.
#[derive(Clone, Debug)]
pub struct WithdrawalCmd {
    pub moderator: String,
    pub description: String,
    pub allocations: Vec<AllocationRequest>,
}

impl WithdrawalCmd {
    #[must_use]
    pub fn new(
        moderator: impl Into<String>,
        description: impl Into<String>,
        allocations: Vec<AllocationRequest>,
    ) -> Self {
        Self {
            moderator: moderator.into(),
            description: description.into(),
            allocations,
        }
    }
}
