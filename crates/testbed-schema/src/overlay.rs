//! Environment overlay for [`Config`].
//!
//! Every serialized field of `Config` is registered here with a typed setter.
//! For field `cluster-size` and prefix `TESTBED_EC2_` the overlay reads
//! `TESTBED_EC2_CLUSTER_SIZE`; a non-empty value is parsed according to the
//! setter and assigned, replacing whatever the field held.
//!
//! Fields are processed in registry order and the first failure stops the pass.
//! Fields handled before the failure keep their new values, so a configuration
//! that failed to overlay must be discarded.

use crate::config::{Config, ConfigError};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tracing::debug;

/// Source of override values.
pub trait EnvSource {
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads overrides from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl EnvSource for BTreeMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// How an override is parsed and where it lands.
pub enum Setter {
    Text(fn(&mut Config) -> &mut String),
    Bool(fn(&mut Config) -> &mut bool),
    Int(fn(&mut Config) -> &mut i64),
    /// Humantime literal such as `90s` or `5m`.
    Duration(fn(&mut Config) -> &mut Duration),
    Unsigned(fn(&mut Config) -> &mut u64),
    Float(fn(&mut Config) -> &mut f64),
    /// Comma-separated `key=value` pairs, replacing the map.
    Map(fn(&mut Config) -> &mut BTreeMap<String, String>),
    /// Comma-separated entries, replacing the list.
    List(fn(&mut Config) -> &mut Vec<String>),
    /// Registered so that an override is rejected instead of ignored.
    Unsupported(&'static str),
}

pub struct FieldSpec {
    /// Serialization name, e.g. `ingress-rules-tcp`.
    pub name: &'static str,
    pub setter: Setter,
}

macro_rules! field {
    ($name:literal, Unsupported($kind:literal)) => {
        FieldSpec {
            name: $name,
            setter: Setter::Unsupported($kind),
        }
    };
    ($name:literal, $setter:ident, $field:ident) => {
        FieldSpec {
            name: $name,
            setter: Setter::$setter(|cfg| &mut cfg.$field),
        }
    };
}

/// The overlay registry, in `Config` declaration order.
#[allow(clippy::too_many_lines)]
pub fn fields() -> Vec<FieldSpec> {
    vec![
        field!("env-prefix", Text, env_prefix),
        field!("aws-account-id", Text, aws_account_id),
        field!("aws-region", Text, aws_region),
        field!("log-level", Text, log_level),
        field!("log-outputs", Unsupported("list")),
        field!("log-output-to-upload-path", Text, log_output_to_upload_path),
        field!("log-output-to-upload-path-bucket", Text, log_output_to_upload_path_bucket),
        field!("log-output-to-upload-path-url", Text, log_output_to_upload_path_url),
        field!("upload-tester-logs", Bool, upload_tester_logs),
        field!("upload-bucket-expire-days", Int, upload_bucket_expire_days),
        field!("tag", Text, tag),
        field!("tags", Map, tags),
        field!("cluster-name", Text, cluster_name),
        field!("destroy-after-create", Bool, destroy_after_create),
        field!("destroy-wait-time", Duration, destroy_wait_time),
        field!("config-path", Text, config_path),
        field!("config-path-bucket", Text, config_path_bucket),
        field!("config-path-url", Text, config_path_url),
        field!("updated-at", Unsupported("timestamp")),
        field!("image-id", Text, image_id),
        field!("user-name", Text, user_name),
        field!("plugins", List, plugins),
        field!("init-script", Text, init_script),
        field!("init-script-created", Bool, init_script_created),
        field!("instance-type", Text, instance_type),
        field!("cluster-size", Int, cluster_size),
        field!("key-name", Text, key_name),
        field!("key-path", Text, key_path),
        field!("key-path-bucket", Text, key_path_bucket),
        field!("key-path-url", Text, key_path_url),
        field!("key-create-skip", Bool, key_create_skip),
        field!("key-created", Bool, key_created),
        field!("vpc-cidr", Text, vpc_cidr),
        field!("vpc-id", Text, vpc_id),
        field!("vpc-created", Bool, vpc_created),
        field!("internet-gateway-id", Text, internet_gateway_id),
        field!("route-table-ids", Unsupported("list")),
        field!("subnet-ids", List, subnet_ids),
        field!("subnet-id-to-availability-zone", Unsupported("map")),
        field!("ingress-rules-tcp", Map, ingress_rules_tcp),
        field!("security-group-ids", List, security_group_ids),
        field!("security-group-created", Bool, security_group_created),
        field!("associate-public-ip-address", Bool, associate_public_ip_address),
        field!("volume-size", Unsigned, volume_size),
        field!("max-spot-price", Float, max_spot_price),
        field!("instances", Unsupported("instance map")),
        field!("wait", Bool, wait),
        field!("instance-profile-file-path", Text, instance_profile_file_path),
        field!("instance-profile-name", Text, instance_profile_name),
        field!("instance-profile-created", Bool, instance_profile_created),
        field!("instance-profile-policy-name", Text, instance_profile_policy_name),
        field!("instance-profile-policy-arn", Text, instance_profile_policy_arn),
        field!("instance-profile-policy", Text, instance_profile_policy),
        field!("instance-profile-policy-created", Bool, instance_profile_policy_created),
        field!("instance-profile-role-name", Text, instance_profile_role_name),
        field!("instance-profile-role-arn", Text, instance_profile_role_arn),
        field!("instance-profile-role-created", Bool, instance_profile_role_created),
        field!("custom-script", Text, custom_script),
        field!("kubectl-path", Text, kubectl_path),
        field!("kubeconfig-path", Text, kubeconfig_path),
        field!("node-auth-applied", Bool, node_auth_applied),
        field!("status", Text, status),
    ]
}

/// External key for a field: `prefix` + upper-cased name with `-` as `_`.
pub fn env_key(prefix: &str, name: &str) -> String {
    format!("{prefix}{}", name.replace('-', "_").to_uppercase())
}

/// Apply every non-empty override found under `prefix` onto `cfg`.
pub fn apply_overlay(
    cfg: &mut Config,
    prefix: &str,
    env: &dyn EnvSource,
) -> Result<usize, ConfigError> {
    let mut applied = 0;
    for spec in fields() {
        let key = env_key(prefix, spec.name);
        let Some(value) = env.var(&key).filter(|v| !v.is_empty()) else {
            continue;
        };
        apply_field(cfg, &spec.setter, &key, &value)?;
        debug!("overlay applied {key}");
        applied += 1;
    }
    Ok(applied)
}

fn apply_field(
    cfg: &mut Config,
    setter: &Setter,
    key: &str,
    value: &str,
) -> Result<(), ConfigError> {
    match setter {
        Setter::Text(slot) => *slot(cfg) = value.to_owned(),
        Setter::Bool(slot) => {
            *slot(cfg) =
                parse_bool(value).ok_or_else(|| invalid(key, value, "invalid boolean literal"))?;
        }
        Setter::Int(slot) => {
            *slot(cfg) = value
                .parse::<i64>()
                .map_err(|e| invalid(key, value, e.to_string()))?;
        }
        Setter::Duration(slot) => {
            *slot(cfg) =
                humantime::parse_duration(value).map_err(|e| invalid(key, value, e.to_string()))?;
        }
        Setter::Unsigned(slot) => {
            *slot(cfg) = value
                .parse::<u64>()
                .map_err(|e| invalid(key, value, e.to_string()))?;
        }
        Setter::Float(slot) => {
            *slot(cfg) = value
                .parse::<f64>()
                .map_err(|e| invalid(key, value, e.to_string()))?;
        }
        Setter::Map(slot) => *slot(cfg) = parse_map(key, value)?,
        Setter::List(slot) => *slot(cfg) = value.split(',').map(str::to_owned).collect(),
        Setter::Unsupported(kind) => {
            return Err(ConfigError::UnsupportedOverride {
                key: key.to_owned(),
                kind: *kind,
            });
        }
    }
    Ok(())
}

/// Boolean literals: `1 t T TRUE true True` and `0 f F FALSE false False`.
fn parse_bool(value: &str) -> Option<bool> {
    match value {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn parse_map(key: &str, value: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut map = BTreeMap::new();
    for pair in value.split(',') {
        let mut parts = pair.split('=');
        let (Some(k), Some(v), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ConfigError::MalformedMap {
                key: key.to_owned(),
                value: value.to_owned(),
            });
        };
        map.insert(k.to_owned(), v.to_owned());
    }
    Ok(map)
}

fn invalid(key: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidOverride {
        key: key.to_owned(),
        value: value.to_owned(),
        reason: reason.into(),
    }
}
