use std::sync::Arc;

use crate::config::AutomationConfig;
use crate::subprocess::{
    PlaybookRunner, PlaybookSpec, ProcessError, SubprocessManager, TargetGroup,
};
use crate::vars::{
    BridgeVars, ContainerVars, FileVarsWriter, LbRuleVars, SubnetVars, VarsError, VarsWriter,
};

use super::progress::{ProgressReporter, TracingReporter};
use super::{
    BridgeVethRequest, ContainerCreateRequest, ContainerDeleteRequest, LoadBalancerRuleRequest,
    OperationRequest, SubnetCreateRequest, SubnetDeleteRequest,
};

const CREATE_LB_RULES_PLAYBOOK: &str = "create_rules_LB.yml";
const CREATE_CONTAINER_PLAYBOOK: &str = "create_container.yml";
const CREATE_SUBNET_PLAYBOOK: &str = "create_subnet.yml";
const DELETE_SUBNET_PLAYBOOK: &str = "delete_subnet.yml";
const DELETE_CONTAINER_PLAYBOOK: &str = "delete_container.yml";
const CREATE_VETH_BRIDGE_PLAYBOOK: &str = "create_veth_container_bridge.yml";

/// The two ways an operation can fail: before the runner (vars generation)
/// or in the runner itself.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Vars file generation failed: {0}")]
    Vars(#[from] VarsError),

    #[error("Playbook run failed: {0}")]
    Runner(#[from] ProcessError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Vars,
    Runner,
}

impl WorkflowError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WorkflowError::Vars(_) => FailureKind::Vars,
            WorkflowError::Runner(_) => FailureKind::Runner,
        }
    }
}

/// Executes infrastructure operations against the playbook runner.
///
/// Collaborators are trait objects so tests can substitute the vars writer,
/// the runner, and the progress sink independently.
pub struct WorkflowExecutor {
    config: AutomationConfig,
    vars: Arc<dyn VarsWriter>,
    runner: Arc<dyn PlaybookRunner>,
    progress: Arc<dyn ProgressReporter>,
}

impl WorkflowExecutor {
    pub fn new(
        config: AutomationConfig,
        vars: Arc<dyn VarsWriter>,
        runner: Arc<dyn PlaybookRunner>,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            config,
            vars,
            runner,
            progress,
        }
    }

    /// Production wiring: tokio-backed runner, filesystem vars writer,
    /// tracing progress output.
    pub fn production(config: AutomationConfig) -> Self {
        let subprocess = SubprocessManager::production();
        let runner = Arc::new(subprocess.playbook(&config.runner_binary));
        let vars = Arc::new(FileVarsWriter::new(&config.vars_dir));
        Self::new(config, vars, runner, Arc::new(TracingReporter))
    }

    /// Run one operation, absorbing any failure into a boolean after the
    /// diagnostics have been emitted. Never panics and never propagates.
    pub async fn run(&self, request: &OperationRequest) -> bool {
        self.dispatch(request).await.is_ok()
    }

    /// Run one operation with a typed outcome. Progress notifications are
    /// emitted here: exactly one `triggered`, then `completed` or `failed`.
    pub async fn dispatch(&self, request: &OperationRequest) -> Result<(), WorkflowError> {
        let operation = request.describe();
        let subject = request.subject().to_string();

        self.progress.triggered(operation, &subject);

        let result = match request {
            OperationRequest::CreateLbRules(r) => self.apply_lb_rules(r).await,
            OperationRequest::CreateContainer(r) => self.apply_container_create(r).await,
            OperationRequest::CreateSubnet(r) => self.apply_subnet_create(r).await,
            OperationRequest::DeleteSubnet(r) => self.apply_subnet_delete(r).await,
            OperationRequest::DeleteContainer(r) => self.apply_container_delete(r).await,
            OperationRequest::AttachBridge(r) => self.apply_bridge_attach(r).await,
        };

        match &result {
            Ok(()) => self.progress.completed(operation, &subject),
            Err(error) => self.progress.failed(operation, &subject, error),
        }

        result
    }

    pub async fn create_lb_rules(
        &self,
        request: &LoadBalancerRuleRequest,
    ) -> Result<(), WorkflowError> {
        self.dispatch(&OperationRequest::CreateLbRules(request.clone()))
            .await
    }

    pub async fn create_container(
        &self,
        request: &ContainerCreateRequest,
    ) -> Result<(), WorkflowError> {
        self.dispatch(&OperationRequest::CreateContainer(request.clone()))
            .await
    }

    pub async fn create_subnet(
        &self,
        request: &SubnetCreateRequest,
    ) -> Result<(), WorkflowError> {
        self.dispatch(&OperationRequest::CreateSubnet(request.clone()))
            .await
    }

    pub async fn delete_subnet(
        &self,
        request: &SubnetDeleteRequest,
    ) -> Result<(), WorkflowError> {
        self.dispatch(&OperationRequest::DeleteSubnet(request.clone()))
            .await
    }

    pub async fn delete_container(
        &self,
        request: &ContainerDeleteRequest,
    ) -> Result<(), WorkflowError> {
        self.dispatch(&OperationRequest::DeleteContainer(request.clone()))
            .await
    }

    pub async fn attach_bridge(&self, request: &BridgeVethRequest) -> Result<(), WorkflowError> {
        self.dispatch(&OperationRequest::AttachBridge(request.clone()))
            .await
    }

    /// Probe the runner binary (`--version`).
    pub async fn check_runner(&self) -> Result<bool, WorkflowError> {
        Ok(self.runner.check_availability().await?)
    }

    async fn apply_lb_rules(&self, request: &LoadBalancerRuleRequest) -> Result<(), WorkflowError> {
        self.vars.write_lb_rules(&LbRuleVars {
            container_name: request.container_name.clone(),
            lb_ip: request.lb_ip.clone(),
            lb_snat_ip: request.lb_snat_ip.clone(),
            tenant_ips: request.tenant_ips.clone(),
        })?;
        self.apply_playbook(CREATE_LB_RULES_PLAYBOOK, TargetGroup::Creation, Vec::new())
            .await
    }

    async fn apply_container_create(
        &self,
        request: &ContainerCreateRequest,
    ) -> Result<(), WorkflowError> {
        self.vars.write_container(&ContainerVars {
            container_name: request.container_name.clone(),
            container_image: request.image.clone(),
            vcpu: request.resources.map(|r| r.vcpu),
            memory_mb: request.resources.map(|r| r.memory_mb),
        })?;
        self.apply_playbook(CREATE_CONTAINER_PLAYBOOK, TargetGroup::Creation, Vec::new())
            .await
    }

    async fn apply_subnet_create(
        &self,
        request: &SubnetCreateRequest,
    ) -> Result<(), WorkflowError> {
        self.vars.write_subnet(&SubnetVars {
            container_name: request.container_name.clone(),
            subnet_name: request.subnet_name.clone(),
            subnet: request.cidr.clone(),
            gateway: request.gateway.clone(),
            vni_id: request.vni_id,
            local_ip: request.local_ip.clone(),
            remote_ip: request.remote_ip.clone(),
        })?;
        self.apply_playbook(CREATE_SUBNET_PLAYBOOK, TargetGroup::Creation, Vec::new())
            .await
    }

    async fn apply_subnet_delete(
        &self,
        request: &SubnetDeleteRequest,
    ) -> Result<(), WorkflowError> {
        let extra_vars = vec![
            ("container_name".to_string(), request.container_name.clone()),
            ("subnet_name".to_string(), request.subnet_name.clone()),
        ];
        self.apply_playbook(DELETE_SUBNET_PLAYBOOK, TargetGroup::Deletion, extra_vars)
            .await
    }

    async fn apply_container_delete(
        &self,
        request: &ContainerDeleteRequest,
    ) -> Result<(), WorkflowError> {
        let extra_vars = vec![("container_name".to_string(), request.container_name.clone())];
        self.apply_playbook(DELETE_CONTAINER_PLAYBOOK, TargetGroup::Deletion, extra_vars)
            .await
    }

    async fn apply_bridge_attach(&self, request: &BridgeVethRequest) -> Result<(), WorkflowError> {
        let address = request.intent.address();
        self.vars.write_bridge(&BridgeVars {
            container_name: request.container_name.clone(),
            bridge_name: request.bridge_name.clone(),
            link_intent: request.intent.label().to_string(),
            ip_address: address.map(|(ip, _)| ip.to_string()),
            gateway: address.map(|(_, gw)| gw.to_string()),
        })?;
        self.apply_playbook(
            CREATE_VETH_BRIDGE_PLAYBOOK,
            TargetGroup::Creation,
            Vec::new(),
        )
        .await
    }

    async fn apply_playbook(
        &self,
        playbook: &str,
        limit: TargetGroup,
        extra_vars: Vec<(String, String)>,
    ) -> Result<(), WorkflowError> {
        let spec = PlaybookSpec {
            playbook: self.config.playbook_path(playbook),
            inventory: self.config.inventory.clone(),
            limit,
            extra_vars,
            extra_args: self.config.runner_args.clone(),
        };
        self.runner.apply(&spec).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subprocess::MockProcessRunner;
    use crate::workflow::progress::testing::RecordingReporter;
    use crate::workflow::{BridgeIntent, ContainerResources};
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Debug)]
    enum RecordedVars {
        Lb(LbRuleVars),
        Container(ContainerVars),
        Subnet(SubnetVars),
        Bridge(BridgeVars),
    }

    #[derive(Default)]
    struct StubVarsWriter {
        fail: bool,
        calls: Mutex<Vec<RecordedVars>>,
    }

    impl StubVarsWriter {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn record(&self, vars: RecordedVars) -> Result<PathBuf, VarsError> {
            if self.fail {
                return Err(VarsError::Io {
                    path: PathBuf::from("ansible/vars"),
                    source: std::io::Error::other("disk full"),
                });
            }
            self.calls.lock().unwrap().push(vars);
            Ok(PathBuf::from("ansible/vars/test.yml"))
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl VarsWriter for StubVarsWriter {
        fn write_lb_rules(&self, vars: &LbRuleVars) -> Result<PathBuf, VarsError> {
            self.record(RecordedVars::Lb(vars.clone()))
        }

        fn write_container(&self, vars: &ContainerVars) -> Result<PathBuf, VarsError> {
            self.record(RecordedVars::Container(vars.clone()))
        }

        fn write_subnet(&self, vars: &SubnetVars) -> Result<PathBuf, VarsError> {
            self.record(RecordedVars::Subnet(vars.clone()))
        }

        fn write_bridge(&self, vars: &BridgeVars) -> Result<PathBuf, VarsError> {
            self.record(RecordedVars::Bridge(vars.clone()))
        }
    }

    struct Harness {
        executor: WorkflowExecutor,
        mock: MockProcessRunner,
        reporter: Arc<RecordingReporter>,
        vars: Arc<StubVarsWriter>,
    }

    fn harness(vars: StubVarsWriter, runner_exit: i32) -> Harness {
        let (manager, mut mock) = SubprocessManager::mock();
        mock.expect_command("ansible-playbook")
            .returns_exit_code(runner_exit)
            .finish();

        let vars = Arc::new(vars);
        let reporter = Arc::new(RecordingReporter::new());
        let config = AutomationConfig::default();
        let runner = Arc::new(manager.playbook(&config.runner_binary));
        let executor = WorkflowExecutor::new(
            config,
            Arc::clone(&vars) as Arc<dyn VarsWriter>,
            runner,
            Arc::clone(&reporter) as Arc<dyn ProgressReporter>,
        );

        Harness {
            executor,
            mock,
            reporter,
            vars,
        }
    }

    fn subnet_request() -> SubnetCreateRequest {
        SubnetCreateRequest {
            container_name: "c1".to_string(),
            subnet_name: "s1".to_string(),
            cidr: "10.0.0.0/24".to_string(),
            gateway: "10.0.0.1".to_string(),
            vni_id: 100,
            local_ip: "1.1.1.1".to_string(),
            remote_ip: "2.2.2.2".to_string(),
        }
    }

    #[tokio::test]
    async fn test_success_emits_one_triggered_and_one_completed() {
        let h = harness(StubVarsWriter::default(), 0);

        h.executor.create_subnet(&subnet_request()).await.unwrap();

        let events = h.reporter.events();
        assert_eq!(
            events,
            vec![
                (
                    "triggered".to_string(),
                    "Subnet creation".to_string(),
                    "c1".to_string()
                ),
                (
                    "completed".to_string(),
                    "Subnet creation".to_string(),
                    "c1".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_subnet_creation_invokes_runner_with_odd_limit() {
        let h = harness(StubVarsWriter::default(), 0);

        let ok = h
            .executor
            .run(&OperationRequest::CreateSubnet(subnet_request()))
            .await;
        assert!(ok);

        let history = h.mock.get_call_history();
        assert_eq!(history.len(), 1);
        let args = &history[0].args;
        assert!(args
            .iter()
            .any(|a| a.ends_with("create_subnet.yml")));
        let limit_pos = args.iter().position(|a| a == "-l").unwrap();
        assert_eq!(args[limit_pos + 1], "odd");
        assert_eq!(h.vars.call_count(), 1);
    }

    #[tokio::test]
    async fn test_vars_failure_returns_before_runner() {
        let h = harness(StubVarsWriter::failing(), 0);

        let result = h
            .executor
            .create_lb_rules(&LoadBalancerRuleRequest {
                container_name: "c1".to_string(),
                lb_ip: "10.1.0.5".to_string(),
                lb_snat_ip: "10.1.0.6".to_string(),
                tenant_ips: vec!["10.2.0.2".to_string(), "10.2.0.3".to_string()],
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), FailureKind::Vars);
        assert!(h.mock.verify_called("ansible-playbook", 0));
        assert_eq!(h.reporter.count("triggered"), 1);
        assert_eq!(h.reporter.count("failed"), 1);
        assert_eq!(h.reporter.count("completed"), 0);
    }

    #[tokio::test]
    async fn test_runner_failure_is_classified() {
        let h = harness(StubVarsWriter::default(), 2);

        let result = h
            .executor
            .create_container(&ContainerCreateRequest {
                container_name: "c1".to_string(),
                image: "alpine:3".to_string(),
                resources: Some(ContainerResources {
                    vcpu: 2,
                    memory_mb: 2048,
                }),
            })
            .await;

        assert_eq!(result.unwrap_err().kind(), FailureKind::Runner);
        assert_eq!(h.vars.call_count(), 1);
        assert_eq!(h.reporter.count("failed"), 1);
    }

    #[tokio::test]
    async fn test_container_deletion_uses_even_group_and_inline_vars() {
        let h = harness(StubVarsWriter::default(), 0);

        h.executor
            .delete_container(&ContainerDeleteRequest {
                container_name: "c2".to_string(),
            })
            .await
            .unwrap();

        let args = &h.mock.get_call_history()[0].args;
        assert!(args.contains(&"container_name=c2".to_string()));
        let limit_pos = args.iter().position(|a| a == "-l").unwrap();
        assert_eq!(args[limit_pos + 1], "even");
        assert!(args.iter().any(|a| a.ends_with("delete_container.yml")));
        // Deletion paths never generate a vars file.
        assert_eq!(h.vars.call_count(), 0);
    }

    #[tokio::test]
    async fn test_subnet_deletion_passes_both_names_inline() {
        let h = harness(StubVarsWriter::default(), 0);

        h.executor
            .delete_subnet(&SubnetDeleteRequest {
                container_name: "c1".to_string(),
                subnet_name: "s1".to_string(),
            })
            .await
            .unwrap();

        let args = &h.mock.get_call_history()[0].args;
        assert!(args.contains(&"container_name=c1".to_string()));
        assert!(args.contains(&"subnet_name=s1".to_string()));
        assert!(args.iter().any(|a| a.ends_with("delete_subnet.yml")));
    }

    #[tokio::test]
    async fn test_container_deletion_with_failing_runner_returns_false() {
        let h = harness(StubVarsWriter::default(), 1);

        let ok = h
            .executor
            .run(&OperationRequest::DeleteContainer(ContainerDeleteRequest {
                container_name: "c2".to_string(),
            }))
            .await;

        assert!(!ok);
        assert_eq!(h.reporter.count("failed"), 1);
    }

    #[tokio::test]
    async fn test_bridge_attach_maps_intent_into_vars() {
        let h = harness(StubVarsWriter::default(), 0);

        h.executor
            .attach_bridge(&BridgeVethRequest {
                container_name: "vpc1".to_string(),
                bridge_name: "br-pvt0".to_string(),
                intent: BridgeIntent::VpcToPrivate {
                    ip_address: "192.168.10.2".to_string(),
                    gateway: "192.168.10.1".to_string(),
                },
            })
            .await
            .unwrap();

        let calls = h.vars.calls.lock().unwrap();
        match &calls[0] {
            RecordedVars::Bridge(vars) => {
                assert_eq!(vars.link_intent, "vpc_to_private");
                assert_eq!(vars.ip_address.as_deref(), Some("192.168.10.2"));
                assert_eq!(vars.gateway.as_deref(), Some("192.168.10.1"));
            }
            other => panic!("Expected bridge vars, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_public_bridge_intents_carry_no_address() {
        let h = harness(StubVarsWriter::default(), 0);

        h.executor
            .attach_bridge(&BridgeVethRequest {
                container_name: "lb1".to_string(),
                bridge_name: "br-pub0".to_string(),
                intent: BridgeIntent::LbToPublic,
            })
            .await
            .unwrap();

        let calls = h.vars.calls.lock().unwrap();
        match &calls[0] {
            RecordedVars::Bridge(vars) => {
                assert_eq!(vars.link_intent, "lb_to_public");
                assert!(vars.ip_address.is_none());
                assert!(vars.gateway.is_none());
            }
            other => panic!("Expected bridge vars, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_configured_runner_args_are_passed_through() {
        let (manager, mut mock) = SubprocessManager::mock();
        mock.expect_command("ansible-playbook")
            .returns_success()
            .finish();

        let mut config = AutomationConfig::default();
        config.runner_args = vec!["--check".to_string()];
        let runner = Arc::new(manager.playbook(&config.runner_binary));
        let executor = WorkflowExecutor::new(
            config,
            Arc::new(StubVarsWriter::default()),
            runner,
            Arc::new(RecordingReporter::new()),
        );

        executor.create_subnet(&subnet_request()).await.unwrap();

        let args = &mock.get_call_history()[0].args;
        assert!(args.contains(&"--check".to_string()));
    }

    #[tokio::test]
    async fn test_lb_rules_vars_capture_tenant_set() {
        let h = harness(StubVarsWriter::default(), 0);

        h.executor
            .create_lb_rules(&LoadBalancerRuleRequest {
                container_name: "lb1".to_string(),
                lb_ip: "10.1.0.5".to_string(),
                lb_snat_ip: "10.1.0.6".to_string(),
                tenant_ips: vec!["10.2.0.2".to_string(), "10.2.0.3".to_string()],
            })
            .await
            .unwrap();

        let calls = h.vars.calls.lock().unwrap();
        match &calls[0] {
            RecordedVars::Lb(vars) => {
                assert_eq!(vars.tenant_ips.len(), 2);
                assert_eq!(vars.lb_snat_ip, "10.1.0.6");
            }
            other => panic!("Expected LB vars, got {other:?}"),
        }

        let args = &h.mock.get_call_history()[0].args;
        assert!(args.iter().any(|a| a.ends_with("create_rules_LB.yml")));
    }
}
