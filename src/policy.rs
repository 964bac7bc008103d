//! Ban policy: which addresses and subnet sizes may be banned.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::address::{AddressSpec, Family};
use crate::Category;

/// Why a candidate ban was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    /// No address was given
    EmptyAddress,
    /// Address falls in a private, loopback or link-local range
    PrivateOrReservedAddress,
    /// Prefix is shorter than the category allows
    SubnetTooBroad,
    /// An active ban of the same category already overlaps the subnet
    AlreadyBanned,
    /// The ban reason text is blank
    MissingReason,
}

impl RejectionReason {
    /// Machine-readable code.
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectionReason::EmptyAddress => "empty_address",
            RejectionReason::PrivateOrReservedAddress => "private_or_reserved_address",
            RejectionReason::SubnetTooBroad => "subnet_too_broad",
            RejectionReason::AlreadyBanned => "already_banned",
            RejectionReason::MissingReason => "missing_reason",
        }
    }

    /// Human-readable message for moderators.
    pub fn message(&self) -> &'static str {
        match self {
            RejectionReason::EmptyAddress => "address is invalid",
            RejectionReason::PrivateOrReservedAddress => "address must be a public address",
            RejectionReason::SubnetTooBroad => "subnet is broader than this category allows",
            RejectionReason::AlreadyBanned => "address is already banned",
            RejectionReason::MissingReason => "reason can't be blank",
        }
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message(), self.as_str())
    }
}

/// Outcome of [`PolicyEngine::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Validation {
    /// The candidate may be banned
    Ok,
    /// The candidate violates a rule
    Rejected(RejectionReason),
}

impl Validation {
    /// Returns `true` for [`Validation::Ok`].
    pub fn is_ok(&self) -> bool {
        matches!(self, Validation::Ok)
    }

    /// Convert into a `Result`, mapping rejections to `Err`.
    pub fn into_result(self) -> Result<(), RejectionReason> {
        match self {
            Validation::Ok => Ok(()),
            Validation::Rejected(reason) => Err(reason),
        }
    }
}

/// Stateless ban policy.
///
/// Rules are evaluated in order and the first failure wins:
/// 1. an address must be present
/// 2. it must be public (not private, loopback or link-local)
/// 3. its prefix must be at least [`PolicyEngine::min_prefix_len`]
/// 4. a new record may not overlap an active ban of the same category
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyEngine;

impl PolicyEngine {
    /// Narrowest-allowed breadth for a category and family.
    pub fn min_prefix_len(category: Category, family: Family) -> u8 {
        match (category, family) {
            (Category::Full, Family::V4) => 24,
            (Category::Partial, Family::V4) => 8,
            (Category::Full, Family::V6) => 48,
            (Category::Partial, Family::V6) => 20,
        }
    }

    /// Validate a candidate ban.
    ///
    /// `spec` is `None` when the submitted address was blank.
    pub fn validate(
        spec: Option<&AddressSpec>,
        category: Category,
        is_new_record: bool,
        existing_overlap: bool,
    ) -> Validation {
        let Some(spec) = spec else {
            return Validation::Rejected(RejectionReason::EmptyAddress);
        };

        if spec.is_private() || spec.is_loopback() || spec.is_link_local() {
            return Validation::Rejected(RejectionReason::PrivateOrReservedAddress);
        }

        if spec.prefix_len() < Self::min_prefix_len(category, spec.family()) {
            return Validation::Rejected(RejectionReason::SubnetTooBroad);
        }

        if is_new_record && existing_overlap {
            return Validation::Rejected(RejectionReason::AlreadyBanned);
        }

        Validation::Ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(text: &str, category: Category) -> Validation {
        let spec = AddressSpec::parse(text).unwrap();
        PolicyEngine::validate(Some(&spec), category, true, false)
    }

    #[test]
    fn test_empty_address() {
        assert_eq!(
            PolicyEngine::validate(None, Category::Full, true, false),
            Validation::Rejected(RejectionReason::EmptyAddress)
        );
    }

    #[test]
    fn test_loopback_rejected_for_any_category() {
        for category in Category::ALL {
            assert_eq!(
                check("127.0.0.1/32", category),
                Validation::Rejected(RejectionReason::PrivateOrReservedAddress)
            );
            assert_eq!(
                check("::1", category),
                Validation::Rejected(RejectionReason::PrivateOrReservedAddress)
            );
        }
    }

    #[test]
    fn test_private_checked_before_breadth() {
        // 10.0.0.0/8 is too broad for Full, but private wins.
        assert_eq!(
            check("10.0.0.0/8", Category::Full),
            Validation::Rejected(RejectionReason::PrivateOrReservedAddress)
        );
        assert_eq!(
            check("10.0.0.0/8", Category::Partial),
            Validation::Rejected(RejectionReason::PrivateOrReservedAddress)
        );
        assert_eq!(
            check("fe80::/10", Category::Partial),
            Validation::Rejected(RejectionReason::PrivateOrReservedAddress)
        );
    }

    #[test]
    fn test_slash_eight_by_category() {
        assert_eq!(
            check("45.0.0.0/8", Category::Full),
            Validation::Rejected(RejectionReason::SubnetTooBroad)
        );
        assert_eq!(check("45.0.0.0/8", Category::Partial), Validation::Ok);
        assert_eq!(
            check("45.0.0.0/7", Category::Partial),
            Validation::Rejected(RejectionReason::SubnetTooBroad)
        );
    }

    #[test]
    fn test_min_prefix_boundaries() {
        assert_eq!(check("203.0.113.0/24", Category::Full), Validation::Ok);
        assert_eq!(
            check("203.0.112.0/23", Category::Full),
            Validation::Rejected(RejectionReason::SubnetTooBroad)
        );
        assert_eq!(check("2001:db8:1::/48", Category::Full), Validation::Ok);
        assert_eq!(
            check("2001:db8::/47", Category::Full),
            Validation::Rejected(RejectionReason::SubnetTooBroad)
        );
        assert_eq!(check("2001:d000::/20", Category::Partial), Validation::Ok);
        assert_eq!(
            check("2001:c000::/19", Category::Partial),
            Validation::Rejected(RejectionReason::SubnetTooBroad)
        );
    }

    #[test]
    fn test_overlap_only_blocks_new_records() {
        let spec = AddressSpec::parse("203.0.113.5").unwrap();
        assert_eq!(
            PolicyEngine::validate(Some(&spec), Category::Full, true, true),
            Validation::Rejected(RejectionReason::AlreadyBanned)
        );
        assert_eq!(
            PolicyEngine::validate(Some(&spec), Category::Full, false, true),
            Validation::Ok
        );
    }

    #[test]
    fn test_breadth_checked_before_overlap() {
        let spec = AddressSpec::parse("203.0.0.0/16").unwrap();
        assert_eq!(
            PolicyEngine::validate(Some(&spec), Category::Full, true, true),
            Validation::Rejected(RejectionReason::SubnetTooBroad)
        );
    }

    #[test]
    fn test_validation_into_result() {
        assert!(Validation::Ok.into_result().is_ok());
        assert_eq!(
            Validation::Rejected(RejectionReason::AlreadyBanned).into_result(),
            Err(RejectionReason::AlreadyBanned)
        );
    }
}
