//! `roster-recon`: three-roster benefit enrollment reconciliation engine.
//!
//! Pure engine crate: receives CSV text and pre-loaded rosters, returns
//! bucketed members. No CLI or file IO.

pub mod config;
pub mod engine;
pub mod error;
pub mod keys;
pub mod load;
pub mod matcher;
pub mod mismatch;
pub mod model;
pub mod normalize;
pub mod profile;
pub mod slab;
pub mod summary;

pub use config::ReconConfig;
pub use engine::{reconcile, run};
pub use error::ReconError;
pub use load::{load_roster, load_roster_csv};
pub use model::{BucketKind, CarryOver, MemberRecord, ReconInput, ReconResult};
pub use profile::MatchingProfile;
