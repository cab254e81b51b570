use crate::CoreError;
use std::io::Write;
use std::path::Path;
use tempfile::TempPath;
use tracing::debug;

/// `{{EC2PrivateDNSName}}` is filled in by the cluster when a node joins and
/// must reach kubectl untouched.
const AWS_AUTH_TEMPLATE: &str = r"---
apiVersion: v1
kind: ConfigMap
metadata:
  name: aws-auth
  namespace: kube-system
data:
  mapRoles: |
    - rolearn: {role_arn}
      username: system:node:{{EC2PrivateDNSName}}
      groups:
      - system:bootstrappers
      - system:nodes
";

/// Render the aws-auth ConfigMap that lets instances using `role_arn` join the cluster.
pub fn render_aws_auth(role_arn: &str) -> Result<String, CoreError> {
    if role_arn.is_empty() {
        return Err(CoreError::EmptyRoleArn);
    }
    Ok(AWS_AUTH_TEMPLATE.replace("{role_arn}", role_arn))
}

/// Write `content` to a fresh file in `dir`. The file is removed when the
/// returned path is dropped.
pub fn write_artifact(dir: &Path, content: &str) -> Result<TempPath, CoreError> {
    let mut file = tempfile::Builder::new()
        .prefix("aws-auth")
        .suffix(".yaml")
        .tempfile_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    let path = file.into_temp_path();
    debug!("wrote node auth manifest to {}", path.display());
    Ok(path)
}
