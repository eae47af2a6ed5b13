//! # Corral
//!
//! A thin automation layer that drives container networking workflows
//! (load-balancer rules, subnets, veth bridge pairs, container lifecycle)
//! through an external playbook runner against a fixed inventory.
//!
//! ## Usage
//!
//! ```bash
//! corral subnet create --container c1 --name s1 --cidr 10.0.0.0/24 \
//!     --gateway 10.0.0.1 --vni 100 --local-ip 1.1.1.1 --remote-ip 2.2.2.2
//! ```
//!
//! ## Modules
//!
//! - `config` - Runner binary, inventory, playbook, and vars-dir settings
//! - `subprocess` - Unified subprocess abstraction layer for testing
//! - `vars` - Typed vars-file generation consumed by the playbooks
//! - `workflow` - Operation requests and the workflow executor
pub mod config;
pub mod error;
pub mod subprocess;
pub mod vars;
pub mod workflow;

pub use config::AutomationConfig;
pub use error::{Error, Result};
