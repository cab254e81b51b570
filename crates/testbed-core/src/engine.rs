use crate::node_auth::{render_aws_auth, write_artifact};
use crate::reconcile::{reconcile, ReconcileOptions, ReconcileReport};
use crate::CoreError;
use std::path::{Path, PathBuf};
use testbed_runtime::ControlPlane;
use testbed_schema::{apply_overlay, Config, EnvSource, FinalizeContext, DEFAULT_ENV_PREFIX};
use testbed_store::{backup, load, sync};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

fn overlay_prefix(cfg: &Config) -> String {
    if cfg.env_prefix.is_empty() {
        DEFAULT_ENV_PREFIX.to_owned()
    } else {
        cfg.env_prefix.clone()
    }
}

/// Start a fresh run: default template, environment overlay, finalize, sync.
///
/// With `config_path` unset the finalizer picks a temp path for the file.
pub fn prepare(config_path: Option<&Path>, env: &dyn EnvSource) -> Result<Config, CoreError> {
    let mut rng = rand::thread_rng();
    let mut ctx = FinalizeContext::new(&mut rng);
    prepare_with(config_path, env, &mut ctx)
}

pub fn prepare_with(
    config_path: Option<&Path>,
    env: &dyn EnvSource,
    ctx: &mut FinalizeContext<'_>,
) -> Result<Config, CoreError> {
    let mut cfg = Config::default_template();
    if let Some(path) = config_path {
        cfg.config_path = path.to_string_lossy().into_owned();
    }

    let prefix = overlay_prefix(&cfg);
    let applied = apply_overlay(&mut cfg, &prefix, env)?;
    info!("applied {applied} overrides from {prefix}*");

    cfg.finalize_with(ctx)?;
    let saved = sync(&mut cfg)?;
    info!("prepared cluster {} at {}", cfg.cluster_name, saved.display());
    Ok(cfg)
}

/// Pick up an existing run: load, back up the original once, overlay, finalize, sync.
pub fn resume(config_path: &Path, env: &dyn EnvSource) -> Result<Config, CoreError> {
    let mut cfg = load(config_path)?;
    if let Some(saved) = backup(&cfg)? {
        info!("original configuration kept at {}", saved.display());
    }

    let prefix = overlay_prefix(&cfg);
    let applied = apply_overlay(&mut cfg, &prefix, env)?;
    info!("applied {applied} overrides from {prefix}*");

    cfg.validate_and_set_defaults()?;
    sync(&mut cfg)?;
    info!("resumed cluster {}", cfg.cluster_name);
    Ok(cfg)
}

/// Applies node authentication against a cluster through one control-plane client.
pub struct Engine<C> {
    client: C,
    options: ReconcileOptions,
    artifact_dir: PathBuf,
}

impl<C: ControlPlane> Engine<C> {
    pub fn new(client: C, options: ReconcileOptions) -> Self {
        Self {
            client,
            options,
            artifact_dir: std::env::temp_dir(),
        }
    }

    /// Write rendered manifests somewhere other than the system temp dir.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Reconcile the aws-auth ConfigMap for `cfg`'s instance role.
    ///
    /// Every failed attempt is recorded in `status` and synced right away.
    /// Whatever the outcome, including a manifest that could not be rendered
    /// or written, the configuration is synced once more before returning;
    /// on success `node-auth-applied` is set.
    pub async fn apply_node_auth(
        &self,
        cfg: &mut Config,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, CoreError> {
        let result = self.reconcile_node_auth(cfg, cancel).await;

        match &result {
            Ok(report) => {
                cfg.node_auth_applied = true;
                cfg.record_status(format!(
                    "applied node auth ({} attempts, {:?})",
                    report.attempts, report.elapsed
                ));
            }
            Err(CoreError::Aborted { attempts }) => {
                cfg.record_status(format!("apply node auth aborted after {attempts} attempts"));
            }
            Err(e) => cfg.record_status(format!("apply node auth failed ({e})")),
        }

        match (result, sync(cfg)) {
            (Ok(report), Ok(_)) => Ok(report),
            (Ok(_), Err(sync_err)) => Err(sync_err.into()),
            (Err(e), Ok(_)) => Err(e),
            (Err(e), Err(sync_err)) => {
                warn!("failed to save final status: {sync_err}");
                Err(e)
            }
        }
    }

    async fn reconcile_node_auth(
        &self,
        cfg: &mut Config,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, CoreError> {
        let manifest = render_aws_auth(&cfg.instance_profile_role_arn)?;
        let artifact = write_artifact(&self.artifact_dir, &manifest)?;
        info!("applying node auth for cluster {}", cfg.cluster_name);

        reconcile(&self.client, &artifact, &self.options, cancel, |attempt, e| {
            cfg.record_status(format!("apply node auth failed ({e})"));
            if let Err(sync_err) = sync(cfg) {
                warn!("failed to save status after attempt {attempt}: {sync_err}");
            }
        })
        .await
    }
}
