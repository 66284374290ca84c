//! Database schemas for warden
//!
//! Document structures for user wallet records and community eligibility
//! configs. Both collections are owned by other services; warden reads them.

mod community;
mod metadata;
mod user_record;

pub use community::{CommunityConfigDoc, COMMUNITY_CONFIG_COLLECTION};
pub use metadata::Metadata;
pub use user_record::{UserRecordDoc, USER_RECORD_COLLECTION};
