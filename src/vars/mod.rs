//! Vars-file generation for playbook runs.
//!
//! Each creation operation materializes a YAML vars file at a fixed,
//! per-family path under the vars directory; the file is overwritten on
//! every call with no versioning. Deletion operations pass their parameters
//! inline and never touch this module.

use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const LB_RULES_VARS: &str = "lb_rules.yml";
pub const CONTAINER_VARS: &str = "container.yml";
pub const SUBNET_VARS: &str = "subnet.yml";
pub const VETH_BRIDGE_VARS: &str = "veth_bridge.yml";

#[derive(Debug, thiserror::Error)]
pub enum VarsError {
    #[error("Failed to serialize vars: {0}")]
    Serialize(#[from] serde_yaml::Error),

    #[error("Failed to write vars file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Vars for load-balancer rule creation.
#[derive(Debug, Clone, Serialize)]
pub struct LbRuleVars {
    pub container_name: String,
    pub lb_ip: String,
    pub lb_snat_ip: String,
    pub tenant_ips: Vec<String>,
}

/// Vars for container creation. `vcpu`/`memory_mb` are present only for
/// VM-backed containers; the playbook falls back to its defaults otherwise.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerVars {
    pub container_name: String,
    pub container_image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vcpu: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<u64>,
}

/// Vars for subnet creation inside a VPC container.
#[derive(Debug, Clone, Serialize)]
pub struct SubnetVars {
    pub container_name: String,
    pub subnet_name: String,
    pub subnet: String,
    pub gateway: String,
    pub vni_id: u32,
    pub local_ip: String,
    pub remote_ip: String,
}

/// Vars for veth bridge pair creation. `link_intent` records which bridge
/// semantics the caller asked for so the playbook can branch on it.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeVars {
    pub container_name: String,
    pub bridge_name: String,
    pub link_intent: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<String>,
}

/// One method per operation family, mirroring the playbooks' expectations.
/// Implementations return the path the vars landed at.
pub trait VarsWriter: Send + Sync {
    fn write_lb_rules(&self, vars: &LbRuleVars) -> Result<PathBuf, VarsError>;
    fn write_container(&self, vars: &ContainerVars) -> Result<PathBuf, VarsError>;
    fn write_subnet(&self, vars: &SubnetVars) -> Result<PathBuf, VarsError>;
    fn write_bridge(&self, vars: &BridgeVars) -> Result<PathBuf, VarsError>;
}

/// Writes vars files under a single directory, atomically (temp file then
/// rename) so a concurrent runner never reads a half-written file.
pub struct FileVarsWriter {
    vars_dir: PathBuf,
}

impl FileVarsWriter {
    pub fn new(vars_dir: impl Into<PathBuf>) -> Self {
        Self {
            vars_dir: vars_dir.into(),
        }
    }

    pub fn vars_dir(&self) -> &Path {
        &self.vars_dir
    }

    fn write_file<T: Serialize>(&self, file_name: &str, vars: &T) -> Result<PathBuf, VarsError> {
        let yaml = serde_yaml::to_string(vars)?;
        let path = self.vars_dir.join(file_name);

        std::fs::create_dir_all(&self.vars_dir).map_err(|source| VarsError::Io {
            path: self.vars_dir.clone(),
            source,
        })?;

        let mut temp_file =
            tempfile::NamedTempFile::new_in(&self.vars_dir).map_err(|source| VarsError::Io {
                path: path.clone(),
                source,
            })?;
        temp_file
            .write_all(yaml.as_bytes())
            .map_err(|source| VarsError::Io {
                path: path.clone(),
                source,
            })?;
        temp_file.persist(&path).map_err(|e| VarsError::Io {
            path: path.clone(),
            source: e.error,
        })?;

        tracing::debug!("Wrote vars file: {}", path.display());
        Ok(path)
    }
}

impl VarsWriter for FileVarsWriter {
    fn write_lb_rules(&self, vars: &LbRuleVars) -> Result<PathBuf, VarsError> {
        self.write_file(LB_RULES_VARS, vars)
    }

    fn write_container(&self, vars: &ContainerVars) -> Result<PathBuf, VarsError> {
        self.write_file(CONTAINER_VARS, vars)
    }

    fn write_subnet(&self, vars: &SubnetVars) -> Result<PathBuf, VarsError> {
        self.write_file(SUBNET_VARS, vars)
    }

    fn write_bridge(&self, vars: &BridgeVars) -> Result<PathBuf, VarsError> {
        self.write_file(VETH_BRIDGE_VARS, vars)
    }
}
