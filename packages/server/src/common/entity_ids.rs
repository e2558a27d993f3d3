//! Typed ID definitions for persisted entities.

pub use super::id::Id;

// ============================================================================
// Entity marker types
// ============================================================================

/// Marker type for Agent accounts.
pub struct Agent;

/// Marker type for one-time passcode rows.
pub struct Otp;

/// Marker type for persisted refresh-token records.
pub struct RefreshToken;

/// Marker type for Policy definitions.
pub struct Policy;

/// Marker type for submitted Policy applications.
pub struct PolicyApplication;

// ============================================================================
// Type aliases - the primary API
// ============================================================================

pub type AgentId = Id<Agent>;

pub type OtpId = Id<Otp>;

pub type RefreshTokenId = Id<RefreshToken>;

pub type PolicyId = Id<Policy>;

pub type PolicyApplicationId = Id<PolicyApplication>;
