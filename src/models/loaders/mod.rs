pub mod toml_loader;

pub use toml_loader::{group_requests, load_requests, parse_requests, RequestGroups};
