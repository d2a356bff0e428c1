//! Project catalog: records, document mapping, fallback data and the
//! caching service consumers talk to.

mod api_types;
mod fallback;
mod service;
mod types;

pub use fallback::projects as fallback_projects;
pub use service::{ProjectService, ServiceSettings};
pub use types::{ProjectList, ProjectRecord, ProjectStatus};
