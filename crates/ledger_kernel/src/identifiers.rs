//! Strongly-typed identifiers for ledger entities
//!
//! Newtype wrappers prevent a flat number from being confused with a month
//! or a raw amount at call sites, and give each identifier its own display
//! form.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by identifier constructors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("flat number must be a positive integer")]
    ZeroFlatNumber,

    #[error("service code must not be empty")]
    EmptyServiceCode,
}

/// An apartment's flat number. Unique within the association, always positive.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FlatNumber(u32);

impl FlatNumber {
    pub fn new(number: u32) -> Result<Self, IdentifierError> {
        if number == 0 {
            return Err(IdentifierError::ZeroFlatNumber);
        }
        Ok(Self(number))
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for FlatNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "№{}", self.0)
    }
}

/// Stable code identifying a billable service, e.g. `SD` for building
/// maintenance or `KR` for capital repair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceCode(String);

impl ServiceCode {
    pub fn new(code: impl Into<String>) -> Result<Self, IdentifierError> {
        let code = code.into();
        if code.trim().is_empty() {
            return Err(IdentifierError::EmptyServiceCode);
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for a recorded payment. Time-ordered so payment history
/// listings sort by insertion without an extra column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    /// Creates a new time-ordered identifier (UUID v7).
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PAY-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_number_rejects_zero() {
        assert_eq!(FlatNumber::new(0), Err(IdentifierError::ZeroFlatNumber));
        assert_eq!(FlatNumber::new(1).unwrap().as_u32(), 1);
    }

    #[test]
    fn flat_number_display() {
        assert_eq!(FlatNumber::new(17).unwrap().to_string(), "№17");
    }

    #[test]
    fn service_code_rejects_blank() {
        assert!(ServiceCode::new("  ").is_err());
        assert_eq!(ServiceCode::new("SD").unwrap().as_str(), "SD");
    }

    #[test]
    fn service_code_serializes_as_plain_string() {
        let code = ServiceCode::new("UB").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"UB\"");
    }

    #[test]
    fn payment_id_display_prefix() {
        assert!(PaymentId::new().to_string().starts_with("PAY-"));
    }
}
