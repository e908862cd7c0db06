//! Infrastructure-state tool driver.
//!
//! Wraps the `terraform` binary (or a compatible one named in config) to pull
//! remote state, with an advisory backend precheck beforehand and a
//! remediation classifier for failures.

mod backend;
mod remediation;
mod state;

pub use backend::check_backend;
pub use remediation::{classify_error, find_remediation, Remediation, REMEDIATIONS};
pub use state::{format_state, persist_state, validate_workdir, StateRetriever, STATE_FILE_MODE};
