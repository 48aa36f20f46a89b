pub mod aladhan_client;
pub mod config;
pub mod error;
pub mod local_oracle;
pub mod logging;
pub mod notification_center;
pub mod settings_store;
pub mod solar;
pub mod time_oracle;
