use crate::config::ConfigError;

/// A named init-script fragment. `{user}` in `script` is replaced with the
/// login user name when the script is rendered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Plugin {
    pub name: &'static str,
    pub description: &'static str,
    pub script: &'static str,
}

pub const BUILTIN_PLUGINS: &[Plugin] = &[
    Plugin {
        name: "update-amazon-linux-2",
        description: "Update Amazon Linux 2 packages",
        script: r"
################################## update Amazon Linux 2
sudo yum update -y \
  && sudo yum install -y \
  gcc \
  zlib-devel \
  openssl-devel \
  ncurses-devel \
  git \
  wget \
  jq \
  tar \
  curl \
  unzip \
  screen \
  mercurial \
  aspell \
  aspell-en \
  make \
  gcc \
  bind-utils
",
    },
    Plugin {
        name: "install-start-docker-amazon-linux-2",
        description: "Install and start Docker on Amazon Linux 2",
        script: r"
################################## install Docker on Amazon Linux 2
sudo yum update -y
sudo yum install -y yum-utils device-mapper-persistent-data lvm2
sudo amazon-linux-extras install docker -y

sudo systemctl daemon-reload
sudo systemctl enable docker || true
sudo systemctl start docker || true
sudo systemctl restart docker || true

sudo usermod -aG docker {user} || true

sudo docker version
sudo docker info
",
    },
    Plugin {
        name: "install-go-amazon-linux-2",
        description: "Install the Go toolchain on Amazon Linux 2",
        script: r#"
################################## install Go on Amazon Linux 2
GO_VERSION=1.21.6
GOOGLE_URL=https://storage.googleapis.com/golang
DOWNLOAD_URL=${GOOGLE_URL}

sudo curl -s ${DOWNLOAD_URL}/go${GO_VERSION}.linux-amd64.tar.gz | sudo tar -v -C /usr/local/ -xz

if grep -q GOPATH "/home/{user}/.bashrc"; then
  echo "bashrc already has GOPATH"
else
  echo "adding GOPATH to bashrc"
  echo "export GOPATH=/home/{user}/go" >> /home/{user}/.bashrc
  echo "export PATH=/usr/local/go/bin:/home/{user}/go/bin:\$PATH" >> /home/{user}/.bashrc
fi
"#,
    },
    Plugin {
        name: "update-ubuntu",
        description: "Update Ubuntu packages",
        script: r"
################################## update Ubuntu
sudo apt-get update -y \
  && sudo apt-get upgrade -y \
  && sudo apt-get install -y \
  build-essential \
  gcc \
  jq \
  file \
  apt-utils \
  pkg-config \
  software-properties-common \
  apt-transport-https \
  ca-certificates \
  libssl-dev \
  gnupg2 \
  sudo \
  bash \
  curl \
  wget \
  tar \
  git
",
    },
    Plugin {
        name: "install-start-docker-ubuntu",
        description: "Install and start Docker on Ubuntu",
        script: r"
################################## install Docker on Ubuntu
curl -fsSL https://download.docker.com/linux/ubuntu/gpg | sudo apt-key add -
sudo add-apt-repository \
  'deb [arch=amd64] https://download.docker.com/linux/ubuntu bionic stable'
sudo apt-get update -y
sudo apt-get install -y docker-ce

sudo systemctl enable docker || true
sudo systemctl start docker || true

sudo usermod -aG docker {user} || true

sudo docker version
sudo docker info
",
    },
];

pub fn get_plugin(name: &str) -> Option<&'static Plugin> {
    BUILTIN_PLUGINS.iter().find(|p| p.name == name)
}

pub fn list_plugins() -> &'static [Plugin] {
    BUILTIN_PLUGINS
}

/// Render the init script for `plugins` in the given order, followed by
/// `custom_script`. Unknown plugin names are rejected before anything is rendered.
pub fn render_init_script(
    user_name: &str,
    custom_script: &str,
    plugins: &[String],
) -> Result<String, ConfigError> {
    let fragments = plugins
        .iter()
        .map(|name| get_plugin(name).ok_or_else(|| ConfigError::UnknownPlugin(name.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let mut script = String::from("#!/usr/bin/env bash\n\nset -e\n");
    for plugin in fragments {
        script.push_str(&plugin.script.replace("{user}", user_name));
    }
    if !custom_script.is_empty() {
        script.push_str("\n################################## custom script\n");
        script.push_str(custom_script);
        script.push('\n');
    }
    Ok(script)
}
