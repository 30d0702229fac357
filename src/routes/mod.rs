//! HTTP routes for Keyward

pub mod health;
pub mod keys;

pub use health::{health_check, version_info};
pub use keys::{
    handle_add_key, handle_issue_key, handle_list_keys, handle_reload_keys, handle_set_security,
    handle_verify_key,
};
