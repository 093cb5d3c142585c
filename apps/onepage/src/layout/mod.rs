//! Page fitting: the shrink policy, content trimming, the fit profile that
//! parameterizes both, and the enforcer loop that drives them.

pub mod enforcer;
pub mod profile;
pub mod shrink;
pub mod trim;

pub use enforcer::{EnforceError, FitEnforcer, FitReport};
pub use profile::FitProfile;
pub use shrink::ShrinkStep;
