//! Auth-domain identifiers, token bundles, and store keys.

pub mod bundle;
pub mod id;

pub use bundle::*;
pub use id::*;
