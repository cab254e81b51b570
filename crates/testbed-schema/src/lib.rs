//! Configuration schema, environment overlay, and finalization for testbed.
//!
//! This crate defines the configuration layer: the typed `Config` tree and its
//! `Instance` snapshots, the immutable default template (`Config::default_template`),
//! the registry-driven environment overlay (`apply_overlay`), and the
//! validate-and-default pass (`Config::validate_and_set_defaults`) that derives the
//! tag, cluster name, storage keys, key path, init script, and instance-profile names.

pub mod config;
pub mod defaults;
pub mod finalize;
pub mod overlay;
pub mod plugins;
pub mod region;
pub mod ssh;

pub use config::{
    BlockDeviceMapping, Config, ConfigError, Ebs, Instance, InstanceState, Placement,
    SecurityGroup,
};
pub use defaults::DEFAULT_ENV_PREFIX;
pub use finalize::FinalizeContext;
pub use overlay::{apply_overlay, env_key, fields, EnvSource, FieldSpec, ProcessEnv, Setter};
pub use plugins::{get_plugin, list_plugins, render_init_script, Plugin, BUILTIN_PLUGINS};
pub use region::{region_label, REGION_LABELS};
