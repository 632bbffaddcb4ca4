pub mod paths;
pub mod persistence;
pub mod schema;

pub use paths::*;
pub use persistence::*;
pub use schema::*;

fn default_base_url() -> String {
    "https://archive.org".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_search_rows() -> u32 {
    1000
}

fn default_fs_name() -> String {
    "iafs".to_string()
}

fn default_allow_other() -> bool {
    true
}
