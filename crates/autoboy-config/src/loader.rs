// SPDX-FileCopyrightText: 2026 AutoBoy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Lookup order: `./autoboy.toml` > `~/.config/autoboy/autoboy.toml` >
//! `/etc/autoboy/autoboy.toml`, with `AUTOBOY_` environment overrides on top.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::AutoboyConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/autoboy/autoboy.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "autoboy.toml";

/// Config sections that environment variables may address.
const ENV_SECTIONS: &[&str] = &[
    "server",
    "hub",
    "alerts",
    "storage",
    "auth",
    "email",
    "sms",
    "prometheus",
];

pub(crate) fn user_config_path() -> PathBuf {
    dirs::config_dir()
        .map(|d| d.join("autoboy/autoboy.toml"))
        .unwrap_or_default()
}

/// Load configuration from the standard hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/autoboy/autoboy.toml`
/// 3. `~/.config/autoboy/autoboy.toml`
/// 4. `./autoboy.toml`
/// 5. `AUTOBOY_*` environment variables
pub fn load_config() -> Result<AutoboyConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string over the defaults only.
pub fn load_config_from_str(toml_content: &str) -> Result<AutoboyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AutoboyConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<AutoboyConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(AutoboyConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment behind [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(AutoboyConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider mapping `AUTOBOY_<SECTION>_<KEY>` to `section.key`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// `AUTOBOY_HUB_OUTBOX_CAPACITY` maps to `hub.outbox_capacity`.
fn env_provider() -> Env {
    Env::prefixed("AUTOBOY_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
