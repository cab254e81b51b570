use crate::config::{Config, ConfigError};
use crate::plugins::render_init_script;
use crate::region::region_label;
use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const SUFFIX_LEN: usize = 5;

const CONFIG_OBJECT_NAME: &str = "ec2config.yaml";
const LOG_OBJECT_NAME: &str = "ec2.log";
const KEY_OBJECT_NAME: &str = "ec2.key";

/// Clock, randomness, and scratch directory used while deriving fields.
pub struct FinalizeContext<'a> {
    pub now: DateTime<Utc>,
    pub temp_dir: PathBuf,
    pub rng: &'a mut dyn RngCore,
}

impl<'a> FinalizeContext<'a> {
    /// Current time and the system temp directory.
    pub fn new(rng: &'a mut dyn RngCore) -> Self {
        Self {
            now: Utc::now(),
            temp_dir: std::env::temp_dir(),
            rng,
        }
    }
}

impl Config {
    /// Validate required fields, then fill in every derived field.
    ///
    /// Safe to call again on an already finalized configuration: fields that
    /// are already set are kept, the init script is not rebuilt, and the
    /// upload log path is not added to `log-outputs` twice.
    pub fn validate_and_set_defaults(&mut self) -> Result<(), ConfigError> {
        let mut rng = rand::thread_rng();
        let mut ctx = FinalizeContext::new(&mut rng);
        self.finalize_with(&mut ctx)
    }

    pub fn finalize_with(&mut self, ctx: &mut FinalizeContext<'_>) -> Result<(), ConfigError> {
        let label = self.validate()?;

        if !self.plugins.is_empty() && !self.init_script_created {
            let rendered = render_init_script(&self.user_name, &self.custom_script, &self.plugins)?;
            let manual = std::mem::take(&mut self.init_script);
            self.init_script = format!("{rendered}\n{manual}");
            self.init_script_created = true;
            debug!("rendered init script from {} plugins", self.plugins.len());
        }

        if self.tag.is_empty() {
            self.tag = generate_tag(ctx.now);
        }
        if self.cluster_name.is_empty() {
            self.cluster_name = format!(
                "{}-{}-{}-{}",
                self.tag,
                label.to_lowercase(),
                self.aws_region,
                random_suffix(ctx.rng)
            );
            info!("generated cluster name {}", self.cluster_name);
        }

        if self.config_path.is_empty() {
            self.config_path = reserve_temp_path(&ctx.temp_dir, "ec2config", ".yaml")?;
        }
        self.config_path_bucket = self.object_key(CONFIG_OBJECT_NAME);

        self.log_output_to_upload_path = ctx
            .temp_dir
            .join(format!("{}.log", self.cluster_name))
            .to_string_lossy()
            .into_owned();
        if !self.log_outputs.contains(&self.log_output_to_upload_path) {
            self.log_outputs.push(self.log_output_to_upload_path.clone());
        }
        self.log_output_to_upload_path_bucket = self.object_key(LOG_OBJECT_NAME);

        if self.key_name.is_empty() {
            self.key_name.clone_from(&self.cluster_name);
        }
        self.key_path_bucket = self.object_key(KEY_OBJECT_NAME);
        if self.key_path.is_empty() {
            self.key_path = reserve_temp_path(&ctx.temp_dir, "ec2.key", "")?;
            debug!("reserved key path {}", self.key_path);
        }

        if !self.instance_profile_file_path.is_empty() {
            self.load_instance_profile()?;
        }

        Ok(())
    }

    /// Fail-fast required-field checks. Returns the region label on success.
    fn validate(&self) -> Result<&'static str, ConfigError> {
        if self.log_outputs.is_empty() {
            return Err(ConfigError::NoLogOutputs);
        }
        if self.aws_region.is_empty() {
            return Err(ConfigError::EmptyRegion);
        }
        let label = region_label(&self.aws_region)
            .ok_or_else(|| ConfigError::UnknownRegion(self.aws_region.clone()))?;
        if self.user_name.is_empty() {
            return Err(ConfigError::EmptyUserName);
        }
        if self.image_id.is_empty() {
            return Err(ConfigError::EmptyImageId);
        }
        if self.instance_type.is_empty() {
            return Err(ConfigError::EmptyInstanceType);
        }
        if self.cluster_size < 1 {
            return Err(ConfigError::InvalidClusterSize(self.cluster_size));
        }
        Ok(label)
    }

    fn object_key(&self, name: &str) -> String {
        format!("{}/{name}", self.cluster_name)
    }

    fn load_instance_profile(&mut self) -> Result<(), ConfigError> {
        let path = PathBuf::from(&self.instance_profile_file_path);
        let content =
            std::fs::read_to_string(&path).map_err(|source| ConfigError::InstanceProfileMissing {
                path: path.clone(),
                source,
            })?;
        if self.instance_profile_policy.is_empty() {
            serde_json::from_str::<serde_json::Value>(&content).map_err(|e| {
                ConfigError::InvalidInstanceProfile {
                    path: path.clone(),
                    reason: e.to_string(),
                }
            })?;
            self.instance_profile_policy = content;
        }

        self.instance_profile_name = format!("{}-instance-profile", self.cluster_name);
        self.instance_profile_role_name = format!("{}-role", self.instance_profile_name);
        self.instance_profile_policy_name = format!("{}-policy", self.instance_profile_name);
        Ok(())
    }
}

/// `ec2-YYMMDDHH`, one tag per hour.
fn generate_tag(now: DateTime<Utc>) -> String {
    format!("ec2-{}", now.format("%y%m%d%H"))
}

fn random_suffix<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..SUFFIX_LEN)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.gen_range(0..SUFFIX_ALPHABET.len())]))
        .collect()
}

/// Pick a unique file name in `dir` and leave nothing behind at that path.
/// The file itself is written later by whoever owns its contents.
fn reserve_temp_path(dir: &Path, prefix: &str, suffix: &str) -> Result<String, ConfigError> {
    let io_err = |source| ConfigError::TempPath {
        dir: dir.to_path_buf(),
        source,
    };
    let file = tempfile::Builder::new()
        .prefix(prefix)
        .suffix(suffix)
        .tempfile_in(dir)
        .map_err(io_err)?;
    let temp_path = file.into_temp_path();
    let reserved = temp_path.to_path_buf();
    temp_path.close().map_err(io_err)?;
    Ok(reserved.to_string_lossy().into_owned())
}
