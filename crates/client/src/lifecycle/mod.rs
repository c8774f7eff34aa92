//! Install and activate phases.
//!
//! ### Install
//! - Static assets: fetched concurrently and written as one atomic batch.
//!   Any rejected or non-ok asset skips the whole batch with a warning.
//! - External assets: fetched concurrently with settle-all semantics; each
//!   ok response is stored on its own and failures are swallowed.
//! - Both sub-steps run side by side and install completes once both settle.
//!
//! ### Activate
//! - Every namespace other than the two current ones is deleted.

mod activate;
mod install;

pub use activate::{ActivateReport, activate};
pub use install::{InstallAssets, InstallReport, install};
