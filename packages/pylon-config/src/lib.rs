mod error;
mod types;

pub use error::{Error, Result};
pub use types::{Config, Qos, Redis, Service, Storage};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.log_level.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.log_level must be non-empty.".to_string(),
		});
	}
	if cfg.storage.redis.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.redis.url must be non-empty.".to_string(),
		});
	}
	if cfg.qos.app_ttl_seconds == 0 {
		return Err(Error::Validation {
			message: "qos.app_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.qos.node_ttl_seconds == 0 {
		return Err(Error::Validation {
			message: "qos.node_ttl_seconds must be greater than zero.".to_string(),
		});
	}
	if cfg.qos.app_max_failures == 0 {
		return Err(Error::Validation {
			message: "qos.app_max_failures must be greater than zero.".to_string(),
		});
	}
	if cfg.qos.node_max_failures == 0 {
		return Err(Error::Validation {
			message: "qos.node_max_failures must be greater than zero.".to_string(),
		});
	}

	Ok(())
}
