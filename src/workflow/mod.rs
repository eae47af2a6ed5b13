//! Container networking workflows over an external playbook runner.
//!
//! Each operation is a stateless, single-shot pipeline: emit a `triggered`
//! notification, materialize the vars file (creation paths only), invoke the
//! runner scoped to the operation's host group, classify the outcome. No
//! operation retries, queues, or tracks prior applications.

pub mod executor;
pub mod progress;

pub use executor::{FailureKind, WorkflowError, WorkflowExecutor};
pub use progress::{ProgressReporter, TracingReporter};

pub use crate::subprocess::TargetGroup;

/// Load-balancer rule creation parameters.
#[derive(Debug, Clone)]
pub struct LoadBalancerRuleRequest {
    pub container_name: String,
    pub lb_ip: String,
    pub lb_snat_ip: String,
    pub tenant_ips: Vec<String>,
}

/// Resource sizing for VM-backed containers.
#[derive(Debug, Clone, Copy)]
pub struct ContainerResources {
    pub vcpu: u32,
    pub memory_mb: u64,
}

/// Container creation parameters. `resources` distinguishes the VM-backed
/// path from plain container creation; both drive the same playbook.
#[derive(Debug, Clone)]
pub struct ContainerCreateRequest {
    pub container_name: String,
    pub image: String,
    pub resources: Option<ContainerResources>,
}

/// Subnet creation inside a VPC container.
#[derive(Debug, Clone)]
pub struct SubnetCreateRequest {
    pub container_name: String,
    pub subnet_name: String,
    pub cidr: String,
    pub gateway: String,
    pub vni_id: u32,
    pub local_ip: String,
    pub remote_ip: String,
}

#[derive(Debug, Clone)]
pub struct SubnetDeleteRequest {
    pub container_name: String,
    pub subnet_name: String,
}

#[derive(Debug, Clone)]
pub struct ContainerDeleteRequest {
    pub container_name: String,
}

/// Which veth bridge link a container is being attached with. Intents that
/// address the container carry the address in their payload, so a request
/// can never mix an address-less intent with an IP or vice versa.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeIntent {
    /// Container acting as VPC router, linked to a private bridge.
    VpcToPrivate { ip_address: String, gateway: String },
    /// VPC router acting as load balancer, linked to a public bridge.
    VpcToPublic,
    /// Container acting as load balancer, linked to a public bridge.
    LbToPublic,
    /// Load balancer (or VM container) joining a subnet bridge.
    LbToSubnet { ip_address: String, gateway: String },
}

impl BridgeIntent {
    /// Stable tag serialized into the vars file.
    pub fn label(&self) -> &'static str {
        match self {
            BridgeIntent::VpcToPrivate { .. } => "vpc_to_private",
            BridgeIntent::VpcToPublic => "vpc_to_public",
            BridgeIntent::LbToPublic => "lb_to_public",
            BridgeIntent::LbToSubnet { .. } => "lb_to_subnet",
        }
    }

    /// Address assignment carried by the intent, if any.
    pub fn address(&self) -> Option<(&str, &str)> {
        match self {
            BridgeIntent::VpcToPrivate {
                ip_address,
                gateway,
            }
            | BridgeIntent::LbToSubnet {
                ip_address,
                gateway,
            } => Some((ip_address, gateway)),
            BridgeIntent::VpcToPublic | BridgeIntent::LbToPublic => None,
        }
    }
}

/// Veth bridge pair creation parameters.
#[derive(Debug, Clone)]
pub struct BridgeVethRequest {
    pub container_name: String,
    pub bridge_name: String,
    pub intent: BridgeIntent,
}

/// One infrastructure change intent, for callers that dispatch generically
/// (the CLI does; library callers may use the typed executor methods).
#[derive(Debug, Clone)]
pub enum OperationRequest {
    CreateLbRules(LoadBalancerRuleRequest),
    CreateContainer(ContainerCreateRequest),
    CreateSubnet(SubnetCreateRequest),
    DeleteSubnet(SubnetDeleteRequest),
    DeleteContainer(ContainerDeleteRequest),
    AttachBridge(BridgeVethRequest),
}

impl OperationRequest {
    /// Primary subject of the operation, used in progress notifications.
    pub fn subject(&self) -> &str {
        match self {
            OperationRequest::CreateLbRules(r) => &r.container_name,
            OperationRequest::CreateContainer(r) => &r.container_name,
            OperationRequest::CreateSubnet(r) => &r.container_name,
            OperationRequest::DeleteSubnet(r) => &r.container_name,
            OperationRequest::DeleteContainer(r) => &r.container_name,
            OperationRequest::AttachBridge(r) => &r.container_name,
        }
    }

    /// Human-readable operation name for progress notifications.
    pub fn describe(&self) -> &'static str {
        match self {
            OperationRequest::CreateLbRules(_) => "LB rule creation",
            OperationRequest::CreateContainer(_) => "Container creation",
            OperationRequest::CreateSubnet(_) => "Subnet creation",
            OperationRequest::DeleteSubnet(_) => "Subnet deletion",
            OperationRequest::DeleteContainer(_) => "Container deletion",
            OperationRequest::AttachBridge(_) => "Veth pair creation",
        }
    }

    pub fn target_group(&self) -> TargetGroup {
        match self {
            OperationRequest::DeleteSubnet(_) | OperationRequest::DeleteContainer(_) => {
                TargetGroup::Deletion
            }
            _ => TargetGroup::Creation,
        }
    }
}
