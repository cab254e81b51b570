use crate::config::Config;
use std::fmt::Write as _;

impl Config {
    /// Shell snippets for reaching every recorded instance over SSH and SCP.
    pub fn ssh_commands(&self) -> String {
        if self.instances.is_empty() {
            return String::new();
        }

        let mut out = format!("\n# change SSH key permission\nchmod 400 {}\n", self.key_path);
        for inst in self.instances.values() {
            let target = format!("{}@{}", self.user_name, inst.public_dns_name);
            let _ = write!(
                out,
                "# SSH into the remote machine (instance ID {:?}, public IP {:?}, private IP {:?}, public DNS {:?})\n\
                 ssh -o \"StrictHostKeyChecking no\" -i {key} {target}\n\
                 # download to local machine\n\
                 scp -i {key} {target}:REMOTE_FILE_PATH LOCAL_FILE_PATH\n\
                 scp -i {key} -r {target}:REMOTE_DIRECTORY_PATH LOCAL_DIRECTORY_PATH\n\
                 # upload to remote machine\n\
                 scp -i {key} LOCAL_FILE_PATH {target}:REMOTE_FILE_PATH\n\
                 scp -i {key} -r LOCAL_DIRECTORY_PATH {target}:REMOTE_DIRECTORY_PATH\n\n",
                inst.instance_id,
                inst.public_ip,
                inst.private_ip,
                inst.public_dns_name,
                key = self.key_path,
            );
        }
        out
    }
}
