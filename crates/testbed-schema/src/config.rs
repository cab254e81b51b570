use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("log-outputs is not specified")]
    NoLogOutputs,
    #[error("aws-region must not be empty")]
    EmptyRegion,
    #[error("aws-region '{0}' is not a known region")]
    UnknownRegion(String),
    #[error("user-name must not be empty")]
    EmptyUserName,
    #[error("image-id must not be empty")]
    EmptyImageId,
    #[error("instance-type must not be empty")]
    EmptyInstanceType,
    #[error("cluster-size must be at least 1, got {0}")]
    InvalidClusterSize(i64),
    #[error("unknown init script plugin '{0}'")]
    UnknownPlugin(String),
    #[error("instance profile file '{path}' does not exist: {source}")]
    InstanceProfileMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("instance profile file '{path}' is not a valid policy document: {reason}")]
    InvalidInstanceProfile { path: PathBuf, reason: String },
    #[error("failed to parse '{value}' from {key}: {reason}")]
    InvalidOverride {
        key: String,
        value: String,
        reason: String,
    },
    #[error("{key}='{value}' has unexpected format, expected 'a=b,c=d'")]
    MalformedMap { key: String, value: String },
    #[error("{key} ({kind}) cannot be set from the environment")]
    UnsupportedOverride { key: String, kind: &'static str },
    #[error("failed to reserve a temporary path in '{dir}': {source}")]
    TempPath {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    /// True when the failure came from the filesystem rather than from the
    /// configuration's content.
    pub fn is_io(&self) -> bool {
        matches!(self, Self::TempPath { .. })
    }
}

/// Full description of a test cluster: user inputs, derived identifiers,
/// creation flags, and the instances observed after provisioning.
///
/// Field order matters: the overlay registry walks fields in the same order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    /// Namespace for environment overrides, e.g. `TESTBED_EC2_`.
    pub env_prefix: String,

    pub aws_account_id: String,
    pub aws_region: String,

    pub log_level: String,
    /// `stderr`, `stdout`, or file paths. Finalization appends the upload log path.
    #[serde(deserialize_with = "null_as_default")]
    pub log_outputs: Vec<String>,
    /// Derived from the cluster name; any user value is overwritten.
    pub log_output_to_upload_path: String,
    pub log_output_to_upload_path_bucket: String,
    pub log_output_to_upload_path_url: String,
    pub upload_tester_logs: bool,
    /// Days before uploaded objects expire. 0 disables expiry.
    pub upload_bucket_expire_days: i64,

    /// Hour-bucketed run tag, e.g. `ec2-26101519`.
    pub tag: String,
    #[serde(deserialize_with = "null_as_default")]
    pub tags: BTreeMap<String, String>,
    pub cluster_name: String,

    pub destroy_after_create: bool,
    #[serde(with = "duration_format")]
    pub destroy_wait_time: Duration,

    pub config_path: String,
    pub config_path_bucket: String,
    pub config_path_url: String,
    pub updated_at: Option<DateTime<Utc>>,

    pub image_id: String,
    pub user_name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub plugins: Vec<String>,
    /// Plain-text user data. When plugins are set, the rendered plugin script
    /// is prepended to whatever was here.
    pub init_script: String,
    pub init_script_created: bool,

    pub instance_type: String,
    pub cluster_size: i64,

    /// Leave empty to create a key pair named after the cluster.
    pub key_name: String,
    pub key_path: String,
    pub key_path_bucket: String,
    pub key_path_url: String,
    pub key_create_skip: bool,
    pub key_created: bool,

    pub vpc_cidr: String,
    pub vpc_id: String,
    pub vpc_created: bool,
    pub internet_gateway_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub route_table_ids: Vec<String>,

    #[serde(deserialize_with = "null_as_default")]
    pub subnet_ids: Vec<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub subnet_id_to_availability_zone: BTreeMap<String, String>,

    /// TCP port range to CIDR.
    #[serde(deserialize_with = "null_as_default")]
    pub ingress_rules_tcp: BTreeMap<String, String>,

    #[serde(deserialize_with = "null_as_default")]
    pub security_group_ids: Vec<String>,
    pub security_group_created: bool,

    pub associate_public_ip_address: bool,

    /// Root volume size in GiB.
    pub volume_size: u64,
    /// Hourly price ceiling for spot capacity; 0 requests on-demand instances.
    pub max_spot_price: f64,

    #[serde(deserialize_with = "null_as_default")]
    pub instances: BTreeMap<String, Instance>,

    pub wait: bool,

    pub instance_profile_file_path: String,
    pub instance_profile_name: String,
    pub instance_profile_created: bool,
    pub instance_profile_policy_name: String,
    pub instance_profile_policy_arn: String,
    pub instance_profile_policy: String,
    pub instance_profile_policy_created: bool,
    pub instance_profile_role_name: String,
    pub instance_profile_role_arn: String,
    pub instance_profile_role_created: bool,

    /// Appended to the generated init script.
    pub custom_script: String,

    pub kubectl_path: String,
    pub kubeconfig_path: String,
    pub node_auth_applied: bool,
    pub status: String,
}

impl Config {
    /// Replace the instance map wholesale with a fresh batch of snapshots.
    pub fn refresh_instances(&mut self, snapshots: impl IntoIterator<Item = Instance>) {
        self.instances = snapshots
            .into_iter()
            .map(|inst| (inst.instance_id.clone(), inst))
            .collect();
    }

    pub fn record_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }
}

/// Observed state of one EC2 instance at the last refresh.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Instance {
    pub image_id: String,
    pub instance_id: String,
    pub instance_type: String,
    pub key_name: String,
    pub placement: Placement,
    pub private_dns_name: String,
    pub private_ip: String,
    pub public_dns_name: String,
    pub public_ip: String,
    pub state: InstanceState,
    pub subnet_id: String,
    pub vpc_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub block_device_mappings: Vec<BlockDeviceMapping>,
    pub ebs_optimized: bool,
    pub root_device_name: String,
    pub root_device_type: String,
    #[serde(deserialize_with = "null_as_default")]
    pub security_groups: Vec<SecurityGroup>,
    pub launch_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Placement {
    pub availability_zone: String,
    pub tenancy: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct InstanceState {
    pub code: i64,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct BlockDeviceMapping {
    pub device_name: String,
    pub ebs: Ebs,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct Ebs {
    pub delete_on_termination: bool,
    pub status: String,
    pub volume_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case", default)]
pub struct SecurityGroup {
    pub group_name: String,
    pub group_id: String,
}

/// Collections written as `null` or `~` load as empty.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Durations are stored in humantime form (`1m`, `90s`).
mod duration_format {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&humantime::format_duration(*duration).to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
