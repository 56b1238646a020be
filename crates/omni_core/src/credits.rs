use std::fmt;

use crate::ConversionRequest;

/// Non-negative credit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CreditBalance(u64);

impl CreditBalance {
    pub const fn new(credits: u64) -> Self {
        Self(credits)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub fn can_afford(self, cost: u64) -> bool {
        self.0 >= cost
    }

    /// `None` when the balance does not cover `cost`.
    pub fn debit(self, cost: u64) -> Option<Self> {
        self.0.checked_sub(cost).map(Self)
    }
}

impl fmt::Display for CreditBalance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CreditBalance {
    fn from(credits: u64) -> Self {
        Self(credits)
    }
}

/// Pricing tiers and the guest starting balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditPolicy {
    pub conversion_rate: u64,
    pub transcription_rate: u64,
    pub initial_allotment: u64,
}

impl Default for CreditPolicy {
    fn default() -> Self {
        Self {
            conversion_rate: 1,
            transcription_rate: 5,
            initial_allotment: 50,
        }
    }
}

impl CreditPolicy {
    pub fn unit_cost(&self, request: &ConversionRequest) -> u64 {
        if request.is_transcription() {
            self.transcription_rate
        } else {
            self.conversion_rate
        }
    }

    pub fn batch_cost(&self, request: &ConversionRequest, batch_len: usize) -> u64 {
        let files = u64::try_from(batch_len).unwrap_or(u64::MAX);
        self.unit_cost(request).saturating_mul(files)
    }

    pub fn initial_balance(&self) -> CreditBalance {
        CreditBalance(self.initial_allotment)
    }
}

/// Authenticated account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity(String);

impl Identity {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
