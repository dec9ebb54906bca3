mod common;

use common::{pod, strings, FakeCluster};
use topology::{ClusterSpec, MeshError, Role, TlsSpec};

#[tokio::test]
async fn test_create_cluster_runs_tool_on_leader_zero() {
    let fake = FakeCluster::new(ClusterSpec::new(3, 0));
    let orchestrator = fake.orchestrator();

    orchestrator
        .formation()
        .create_cluster(&fake.context())
        .await
        .unwrap();

    let execs = fake.execs();
    assert_eq!(execs.len(), 1);
    let (target, container, argv) = &execs[0];
    assert_eq!(target, "cache-leader-0");
    assert_eq!(container, "cache-leader");
    assert_eq!(
        *argv,
        strings(&[
            "redis-cli",
            "--cluster",
            "create",
            "10.0.0.10:6379",
            "10.0.0.11:6379",
            "10.0.0.12:6379",
            "--cluster-yes",
        ])
    );
}

#[tokio::test]
async fn test_create_cluster_with_auth_and_tls() {
    let spec = ClusterSpec::new(3, 0)
        .with_password("cache-auth", "password")
        .with_tls(TlsSpec::default());
    let fake = FakeCluster::new(spec).with_secret("cache-auth", "password", "s3cret");
    let orchestrator = fake.orchestrator();

    orchestrator
        .formation()
        .create_cluster(&fake.context())
        .await
        .unwrap();

    let (_, _, argv) = &fake.execs()[0];
    assert_eq!(
        argv[argv.len() - 7..],
        strings(&["-a", "s3cret", "--tls", "--cacert", "/tls/ca.crt", "-h", "cache-leader-0"])[..]
    );
}

#[tokio::test]
async fn test_create_cluster_without_leaders_is_rejected() {
    let fake = FakeCluster::new(ClusterSpec::new(0, 0));
    let orchestrator = fake.orchestrator();

    let err = orchestrator
        .formation()
        .create_cluster(&fake.context())
        .await
        .unwrap_err();

    assert!(matches!(err, MeshError::InvalidSpec(_)));
    assert!(fake.calls().is_empty());
}

#[tokio::test]
async fn test_missing_control_container_is_execution_error() {
    let fake = FakeCluster::new(ClusterSpec::new(3, 0));
    fake.set_containers("cache-leader-0", &["redis-exporter"]);
    let orchestrator = fake.orchestrator();

    let err = orchestrator
        .formation()
        .create_cluster(&fake.context())
        .await
        .unwrap_err();

    assert!(matches!(err, MeshError::Execution(_)));
    assert!(fake.execs().is_empty());
}

#[tokio::test]
async fn test_attach_followers_pairs_by_ordinal() {
    let fake = FakeCluster::new(ClusterSpec::new(3, 3));
    fake.mesh_leaders();
    let orchestrator = fake.orchestrator();

    let attached = orchestrator
        .formation()
        .attach_followers(&fake.context())
        .await
        .unwrap();

    let names: Vec<String> = attached.iter().map(|n| n.pod_name()).collect();
    assert_eq!(names, vec!["cache-follower-0", "cache-follower-1", "cache-follower-2"]);

    let argvs: Vec<Vec<String>> = fake.execs().into_iter().map(|(_, _, argv)| argv).collect();
    assert_eq!(
        argvs,
        vec![
            strings(&["redis-cli", "--cluster", "add-node", "10.0.0.13:6379", "10.0.0.10:6379", "--cluster-slave"]),
            strings(&["redis-cli", "--cluster", "add-node", "10.0.0.14:6379", "10.0.0.11:6379", "--cluster-slave"]),
            strings(&["redis-cli", "--cluster", "add-node", "10.0.0.15:6379", "10.0.0.12:6379", "--cluster-slave"]),
        ]
    );
    // every attachment runs from leader 0, after a fresh table read
    assert!(fake.execs().iter().all(|(target, _, _)| target == "cache-leader-0"));
    assert_eq!(fake.commands_starting_with("CLUSTER NODES").len(), 3);
}

#[tokio::test]
async fn test_attach_followers_uses_paired_leader_for_tls_host() {
    let spec = ClusterSpec::new(2, 2).with_tls(TlsSpec::default());
    let fake = FakeCluster::new(spec);
    fake.mesh_leaders();
    let orchestrator = fake.orchestrator();

    orchestrator
        .formation()
        .attach_followers(&fake.context())
        .await
        .unwrap();

    let hosts: Vec<String> = fake
        .execs()
        .into_iter()
        .map(|(_, _, argv)| argv[argv.len() - 1].clone())
        .collect();
    assert_eq!(hosts, vec!["cache-leader-0", "cache-leader-1"]);
}

#[tokio::test]
async fn test_attach_followers_is_idempotent() {
    let fake = FakeCluster::new(ClusterSpec::new(3, 3));
    fake.mesh_leaders();
    let orchestrator = fake.orchestrator();
    let ctx = fake.context();

    orchestrator.formation().attach_followers(&ctx).await.unwrap();
    fake.clear_calls();

    let attached = orchestrator.formation().attach_followers(&ctx).await.unwrap();

    assert!(attached.is_empty());
    assert!(fake.execs().is_empty());
}

#[tokio::test]
async fn test_attach_skips_followers_already_present() {
    let fake = FakeCluster::new(ClusterSpec::new(3, 3));
    fake.mesh_leaders();
    fake.add_replica(&pod(Role::Follower, 1), &pod(Role::Leader, 1));
    let orchestrator = fake.orchestrator();

    let attached = orchestrator
        .formation()
        .attach_followers(&fake.context())
        .await
        .unwrap();

    let names: Vec<String> = attached.iter().map(|n| n.pod_name()).collect();
    assert_eq!(names, vec!["cache-follower-0", "cache-follower-2"]);
    assert_eq!(fake.execs().len(), 2);
}

#[tokio::test]
async fn test_attach_continues_after_failed_attachment() {
    let fake = FakeCluster::new(ClusterSpec::new(3, 3));
    fake.mesh_leaders();
    let follower_zero = format!("{}:6379", fake.ip(&pod(Role::Follower, 0)));
    fake.fail_exec(&follower_zero);
    let orchestrator = fake.orchestrator();

    let err = orchestrator
        .formation()
        .attach_followers(&fake.context())
        .await
        .unwrap_err();

    assert!(matches!(err, MeshError::Execution(_)));
    // all three were attempted, the last two landed
    assert_eq!(fake.execs().len(), 3);

    fake.clear_calls();
    let status = orchestrator.status(&common::cluster_id()).await.unwrap();
    assert_eq!(status.followers, 2);
}

#[tokio::test]
async fn test_attach_aborts_on_unresolvable_follower() {
    let fake = FakeCluster::new(ClusterSpec::new(3, 3));
    fake.mesh_leaders();
    fake.clear_ip(&pod(Role::Follower, 1));
    let orchestrator = fake.orchestrator();

    let err = orchestrator
        .formation()
        .attach_followers(&fake.context())
        .await
        .unwrap_err();

    assert!(matches!(err, MeshError::Resolution(_)));
    assert_eq!(fake.execs().len(), 1);
}

#[tokio::test]
async fn test_ensure_formed_creates_then_attaches_once() {
    let fake = FakeCluster::new(ClusterSpec::new(3, 1));
    let orchestrator = fake.orchestrator();
    let ctx = fake.context();

    let report = orchestrator.formation().ensure_formed(&ctx).await.unwrap();
    assert!(report.created);
    assert_eq!(report.attached, vec!["cache-follower-0"]);

    let report = orchestrator.formation().ensure_formed(&ctx).await.unwrap();
    assert!(!report.created);
    assert!(report.attached.is_empty());

    let creates = fake
        .execs()
        .into_iter()
        .filter(|(_, _, argv)| argv[2] == "create")
        .count();
    assert_eq!(creates, 1);
}

#[tokio::test]
async fn test_ensure_formed_single_leader_creates_once() {
    let fake = FakeCluster::new(ClusterSpec::new(1, 0));
    let orchestrator = fake.orchestrator();
    let ctx = fake.context();

    let report = orchestrator.formation().ensure_formed(&ctx).await.unwrap();
    assert!(report.created);

    // leader 0 is still alone but now owns slots
    let report = orchestrator.formation().ensure_formed(&ctx).await.unwrap();
    assert!(!report.created);
    assert_eq!(fake.execs().len(), 1);
}
