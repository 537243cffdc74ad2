pub mod job_loader;
pub mod profile_loader;

pub use job_loader::{load_jobs, parse_jobs, select_range};
pub use profile_loader::load_profile;
