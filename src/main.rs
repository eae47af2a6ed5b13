use anyhow::{bail, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::debug;

use corral::workflow::{
    BridgeIntent, BridgeVethRequest, ContainerCreateRequest, ContainerDeleteRequest,
    ContainerResources, LoadBalancerRuleRequest, OperationRequest, SubnetCreateRequest,
    SubnetDeleteRequest, WorkflowExecutor,
};
use corral::AutomationConfig;

/// Container networking automation over an external playbook runner
#[derive(Parser)]
#[command(name = "corral")]
#[command(about = "Drive container networking workflows through Ansible playbooks", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create load-balancer rules for a container
    LbRules {
        /// Container the rules apply to
        #[arg(long)]
        container: String,

        /// Load-balancer frontend IP
        #[arg(long)]
        lb_ip: String,

        /// Source-NAT IP used by the load balancer
        #[arg(long)]
        snat_ip: String,

        /// Tenant IP behind the rule (repeat for each tenant)
        #[arg(long = "tenant-ip", required = true)]
        tenant_ips: Vec<String>,
    },
    /// Create or delete containers
    Container {
        #[command(subcommand)]
        command: ContainerCommands,
    },
    /// Create or delete subnets inside a VPC container
    Subnet {
        #[command(subcommand)]
        command: SubnetCommands,
    },
    /// Attach a container to a bridge with a veth pair
    Bridge {
        /// Container end of the veth pair
        #[arg(long)]
        container: String,

        /// Bridge end of the veth pair
        #[arg(long)]
        bridge: String,

        /// Which link semantics the attachment carries
        #[arg(long, value_enum)]
        intent: BridgeIntentArg,

        /// Address assigned to the container end (private/subnet intents)
        #[arg(long)]
        ip: Option<String>,

        /// Gateway for the container end (private/subnet intents)
        #[arg(long)]
        gateway: Option<String>,
    },
    /// Verify the playbook runner binary is reachable
    Check,
}

#[derive(Subcommand)]
enum ContainerCommands {
    /// Create a container, optionally VM-backed with explicit sizing
    Create {
        /// Container name
        #[arg(long)]
        name: String,

        /// Container image
        #[arg(long)]
        image: String,

        /// vCPU count for VM-backed containers
        #[arg(long, requires = "memory")]
        vcpu: Option<u32>,

        /// Memory in MiB for VM-backed containers
        #[arg(long, requires = "vcpu")]
        memory: Option<u64>,
    },
    /// Delete a container
    Delete {
        /// Container name
        #[arg(long)]
        name: String,
    },
}

#[derive(Subcommand)]
enum SubnetCommands {
    /// Create a subnet inside a VPC container
    Create {
        /// VPC container hosting the subnet
        #[arg(long)]
        container: String,

        /// Subnet name
        #[arg(long)]
        name: String,

        /// Subnet CIDR
        #[arg(long)]
        cidr: String,

        /// Subnet gateway address
        #[arg(long)]
        gateway: String,

        /// VXLAN network identifier
        #[arg(long)]
        vni: u32,

        /// Local VTEP address
        #[arg(long)]
        local_ip: String,

        /// Remote VTEP address
        #[arg(long)]
        remote_ip: String,
    },
    /// Delete a subnet from a VPC container
    Delete {
        /// VPC container hosting the subnet
        #[arg(long)]
        container: String,

        /// Subnet name
        #[arg(long)]
        name: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BridgeIntentArg {
    /// Container acting as VPC router, linked to a private bridge
    VpcToPrivate,
    /// VPC router acting as LB, linked to a public bridge
    VpcToPublic,
    /// Container acting as LB, linked to a public bridge
    LbToPublic,
    /// LB or VM container joining a subnet bridge
    LbToSubnet,
}

fn bridge_intent(
    intent: BridgeIntentArg,
    ip: Option<String>,
    gateway: Option<String>,
) -> Result<BridgeIntent> {
    match intent {
        BridgeIntentArg::VpcToPrivate => {
            let (ip_address, gateway) = require_address("vpc-to-private", ip, gateway)?;
            Ok(BridgeIntent::VpcToPrivate {
                ip_address,
                gateway,
            })
        }
        BridgeIntentArg::LbToSubnet => {
            let (ip_address, gateway) = require_address("lb-to-subnet", ip, gateway)?;
            Ok(BridgeIntent::LbToSubnet {
                ip_address,
                gateway,
            })
        }
        BridgeIntentArg::VpcToPublic => {
            forbid_address("vpc-to-public", &ip, &gateway)?;
            Ok(BridgeIntent::VpcToPublic)
        }
        BridgeIntentArg::LbToPublic => {
            forbid_address("lb-to-public", &ip, &gateway)?;
            Ok(BridgeIntent::LbToPublic)
        }
    }
}

fn require_address(
    intent: &str,
    ip: Option<String>,
    gateway: Option<String>,
) -> Result<(String, String)> {
    match (ip, gateway) {
        (Some(ip), Some(gateway)) => Ok((ip, gateway)),
        _ => bail!("intent '{intent}' requires both --ip and --gateway"),
    }
}

fn forbid_address(intent: &str, ip: &Option<String>, gateway: &Option<String>) -> Result<()> {
    if ip.is_some() || gateway.is_some() {
        bail!("intent '{intent}' does not take --ip or --gateway");
    }
    Ok(())
}

fn build_request(command: Commands) -> Result<Option<OperationRequest>> {
    let request = match command {
        Commands::Check => return Ok(None),
        Commands::LbRules {
            container,
            lb_ip,
            snat_ip,
            tenant_ips,
        } => OperationRequest::CreateLbRules(LoadBalancerRuleRequest {
            container_name: container,
            lb_ip,
            lb_snat_ip: snat_ip,
            tenant_ips,
        }),
        Commands::Container { command } => match command {
            ContainerCommands::Create {
                name,
                image,
                vcpu,
                memory,
            } => OperationRequest::CreateContainer(ContainerCreateRequest {
                container_name: name,
                image,
                resources: vcpu.zip(memory).map(|(vcpu, memory_mb)| ContainerResources {
                    vcpu,
                    memory_mb,
                }),
            }),
            ContainerCommands::Delete { name } => {
                OperationRequest::DeleteContainer(ContainerDeleteRequest {
                    container_name: name,
                })
            }
        },
        Commands::Subnet { command } => match command {
            SubnetCommands::Create {
                container,
                name,
                cidr,
                gateway,
                vni,
                local_ip,
                remote_ip,
            } => OperationRequest::CreateSubnet(SubnetCreateRequest {
                container_name: container,
                subnet_name: name,
                cidr,
                gateway,
                vni_id: vni,
                local_ip,
                remote_ip,
            }),
            SubnetCommands::Delete { container, name } => {
                OperationRequest::DeleteSubnet(SubnetDeleteRequest {
                    container_name: container,
                    subnet_name: name,
                })
            }
        },
        Commands::Bridge {
            container,
            bridge,
            intent,
            ip,
            gateway,
        } => OperationRequest::AttachBridge(BridgeVethRequest {
            container_name: container,
            bridge_name: bridge,
            intent: bridge_intent(intent, ip, gateway)?,
        }),
    };
    Ok(Some(request))
}

async fn run(cli: Cli) -> Result<i32> {
    let config = AutomationConfig::load(cli.config.as_deref())?;
    debug!("Using runner binary: {}", config.runner_binary);

    let runner_binary = config.runner_binary.clone();
    let executor = WorkflowExecutor::production(config);

    match build_request(cli.command)? {
        None => {
            if executor.check_runner().await? {
                println!("{runner_binary}: available");
                Ok(0)
            } else {
                println!("{runner_binary}: not found on PATH");
                Ok(1)
            }
        }
        Some(request) => Ok(if executor.run(&request).await { 0 } else { 1 }),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_target(cli.verbose >= 2)
        .init();

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("{error:#}");
            1
        }
    };

    std::process::exit(exit_code);
}
