use crate::config::Config;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_ENV_PREFIX: &str = "TESTBED_EC2_";

/// Amazon Linux 2 AMI (HVM), SSD volume type, us-west-2.
const DEFAULT_IMAGE_ID: &str = "ami-082b5a644766e0e6f";

impl Config {
    /// Baseline configuration for a fresh run.
    ///
    /// Every call builds a new value; nothing is shared between callers, so
    /// overlaying or finalizing one template never leaks into another.
    pub fn default_template() -> Self {
        Self {
            env_prefix: DEFAULT_ENV_PREFIX.to_owned(),
            aws_region: "us-west-2".to_owned(),

            log_level: "info".to_owned(),
            log_outputs: vec!["stderr".to_owned()],
            upload_tester_logs: false,
            upload_bucket_expire_days: 2,

            destroy_after_create: false,
            destroy_wait_time: Duration::from_secs(60),

            image_id: DEFAULT_IMAGE_ID.to_owned(),
            user_name: "ec2-user".to_owned(),
            plugins: vec![
                "update-amazon-linux-2".to_owned(),
                "install-start-docker-amazon-linux-2".to_owned(),
            ],

            // 2 vCPU, 8 GiB
            instance_type: "m5.large".to_owned(),
            cluster_size: 1,

            associate_public_ip_address: true,

            vpc_cidr: "192.168.0.0/16".to_owned(),
            ingress_rules_tcp: BTreeMap::from([("22".to_owned(), "0.0.0.0/0".to_owned())]),

            volume_size: 40,

            wait: true,

            kubectl_path: "kubectl".to_owned(),

            ..Self::default()
        }
    }
}
