//! Request-eligibility policy.
//!
//! [`evaluate`] is pure and cheap. Call it on every attempted feature
//! invocation; never cache a verdict, since entitlements change underneath it.

use crate::entitlement::Entitlement;

/// Prefix the backend puts in front of custom plans, e.g. `Custom_MASTERMIND_2024`.
pub const CUSTOM_PREFIX: &str = "custom_";

/// Base subscription tiers known to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TierKey {
    Mastermind,
    SavvyScholar,
    KnowledgeKickstart,
    NoSubscription,
    Cancelled,
}

impl TierKey {
    /// Requests per billing period allowed by this tier.
    #[must_use]
    pub fn ceiling(self) -> u32 {
        match self {
            Self::Mastermind => 2000,
            Self::SavvyScholar => 1000,
            Self::KnowledgeKickstart => 500,
            Self::NoSubscription => 15,
            Self::Cancelled => 0,
        }
    }

    /// Maps a server-reported subscription level to its base tier.
    ///
    /// Matching is case-insensitive. A leading `custom_` is stripped, then
    /// anything from the first `_` on is ignored. Returns `None` for names
    /// outside the known set.
    #[must_use]
    pub fn parse(level: &str) -> Option<Self> {
        let level = level.trim();
        let level = match level.get(..CUSTOM_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(CUSTOM_PREFIX) => {
                &level[CUSTOM_PREFIX.len()..]
            }
            _ => level,
        };
        let base = level.split('_').next().unwrap_or_default();

        [
            ("MASTERMIND", Self::Mastermind),
            ("SAVVY SCHOLAR", Self::SavvyScholar),
            ("KNOWLEDGE KICKSTART", Self::KnowledgeKickstart),
            ("NO SUBSCRIPTION", Self::NoSubscription),
            ("CANCELLED", Self::Cancelled),
        ]
        .into_iter()
        .find(|(name, _)| base.eq_ignore_ascii_case(name))
        .map(|(_, key)| key)
    }
}

/// Request ceiling for a subscription level. Unknown levels get the
/// no-subscription ceiling rather than an unlimited one.
#[must_use]
pub fn ceiling(level: &str) -> u32 {
    TierKey::parse(level)
        .unwrap_or(TierKey::NoSubscription)
        .ceiling()
}

/// Whether the level is the mastermind plan or a custom mastermind plan.
///
/// Gates premium options such as Mathpix image analysis.
#[must_use]
pub fn is_mastermind(level: &str) -> bool {
    let level = level.trim().to_ascii_uppercase();
    level == "MASTERMIND" || level.starts_with("CUSTOM_MASTERMIND")
}

/// Why a request was allowed or refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictReason {
    /// Usage is below the tier ceiling.
    WithinPlan { used: u32, ceiling: u32 },
    /// Plan is used up but free requests remain.
    FreeRequests { remaining: u32 },
    /// Plan used up and no free requests left.
    QuotaExceeded { used: u32, ceiling: u32 },
}

/// Allow/deny decision for the next feature request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaVerdict {
    pub allowed: bool,
    pub reason: VerdictReason,
}

/// Decides whether the next request may be dispatched.
///
/// Allowed iff `request_count < ceiling(tier)` or `free_requests_remaining > 0`.
#[must_use]
pub fn evaluate(entitlement: &Entitlement) -> QuotaVerdict {
    let used = entitlement.request_count;
    let ceiling = ceiling(&entitlement.tier);

    if used < ceiling {
        QuotaVerdict {
            allowed: true,
            reason: VerdictReason::WithinPlan { used, ceiling },
        }
    } else if entitlement.free_requests_remaining > 0 {
        QuotaVerdict {
            allowed: true,
            reason: VerdictReason::FreeRequests {
                remaining: entitlement.free_requests_remaining,
            },
        }
    } else {
        QuotaVerdict {
            allowed: false,
            reason: VerdictReason::QuotaExceeded { used, ceiling },
        }
    }
}
