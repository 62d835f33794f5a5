pub mod config;
pub mod error;
pub mod ids;
pub mod pool;
pub mod types;

pub use config::{parse_site_toml, parse_site_toml_str};
pub use error::{Error, Result};
pub use ids::{encode_base36, image_key, normalize_id, short_hash, urlify};
pub use types::*;
