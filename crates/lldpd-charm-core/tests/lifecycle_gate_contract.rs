//! Contract Test: Lifecycle gate and deferred hooks
//!
//! Constraints verified:
//! - config-changed before install writes nothing and is deferred
//! - Deferred hooks are re-delivered, not dropped, once install completes
//! - Readiness and the deferred queue survive a process restart
//! - A failed install leaves the operator uninitialized
//! - Install readiness does not depend on the configuration snapshot

mod common;

use common::*;
use lldpd_charm_core::config::{CharmConfig, CharmSettings};
use lldpd_charm_core::traits::StateStore;
use lldpd_charm_core::{
    CharmEvent, DispatchOutcome, FileStateStore, Hook, LldpdCharm, MemoryStateStore,
    StaticDeviceLister, UnitStatus,
};
use tempfile::tempdir;
use tokio::sync::mpsc;

fn charm_with(
    settings: CharmSettings,
    config: CharmConfig,
    recorders: &Recorders,
    store: Box<dyn StateStore>,
) -> (LldpdCharm, mpsc::Receiver<CharmEvent>) {
    LldpdCharm::new(
        settings,
        config,
        plain_identity(),
        recorders.capabilities(StaticDeviceLister::default()),
        store,
    )
    .expect("charm construction succeeds")
}

fn drain(rx: &mut mpsc::Receiver<CharmEvent>) -> Vec<CharmEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn config_changed_before_install_is_deferred_without_writes() {
    let dir = tempdir().unwrap();
    let recorders = Recorders::new();
    let store = MemoryStateStore::new();
    let config = CharmConfig::default().with_short_name(true).with_enable_snmp(true);

    let (charm, mut rx) = charm_with(
        settings_in(dir.path()),
        config,
        &recorders,
        Box::new(store.clone()),
    );

    let outcome = charm.dispatch(Hook::ConfigChanged).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::Deferred);
    assert!(!dir.path().join("lldpd.default").exists());
    assert!(!dir.path().join("lldpd.conf").exists());
    assert!(recorders.services.reloads().is_empty());
    assert_eq!(store.deferred_len().await, 1);
    assert!(drain(&mut rx).contains(&CharmEvent::HookDeferred {
        hook: Hook::ConfigChanged,
        deliveries: 0,
    }));
}

#[tokio::test]
async fn install_sets_ready_and_installs_packages() {
    let dir = tempdir().unwrap();
    let recorders = Recorders::new();
    let store = MemoryStateStore::new();

    let (charm, mut rx) = charm_with(
        settings_in(dir.path()),
        CharmConfig::default(),
        &recorders,
        Box::new(store.clone()),
    );

    let outcome = charm.dispatch(Hook::Install).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::Handled);
    assert!(store.is_ready().await.unwrap());
    assert_eq!(recorders.packages.update_count(), 1);
    assert_eq!(recorders.packages.installed(), vec!["lldpd"]);

    let events = drain(&mut rx);
    assert_eq!(
        events.first(),
        Some(&CharmEvent::StatusChanged(UnitStatus::Maintenance(
            "Installing packages".to_string()
        )))
    );
}

#[tokio::test]
async fn deferred_config_changed_redelivered_after_install() {
    let dir = tempdir().unwrap();
    let recorders = Recorders::new();
    let store = MemoryStateStore::new();

    let (charm, mut rx) = charm_with(
        settings_in(dir.path()),
        CharmConfig::default().with_interfaces_regex("eth*"),
        &recorders,
        Box::new(store.clone()),
    );

    assert_eq!(
        charm.dispatch(Hook::ConfigChanged).await.unwrap(),
        DispatchOutcome::Deferred
    );

    // Install: the queued hook is offered first and is still gated
    charm.dispatch(Hook::Install).await.unwrap();
    assert!(!dir.path().join("lldpd.default").exists());
    assert_eq!(store.deferred_len().await, 1);

    // The next hook re-delivers config-changed before running itself
    charm
        .dispatch(Hook::NrpeExternalMasterRelationJoined)
        .await
        .unwrap();

    assert_eq!(store.deferred_len().await, 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("lldpd.default")).unwrap(),
        "DAEMON_ARGS=\"-I eth*\"\n"
    );
    assert!(drain(&mut rx).contains(&CharmEvent::HookHandled {
        hook: Hook::ConfigChanged,
        redelivered: true,
    }));
}

#[tokio::test]
async fn repeated_config_changed_is_queued_once() {
    let dir = tempdir().unwrap();
    let recorders = Recorders::new();
    let store = MemoryStateStore::new();

    let (charm, _rx) = charm_with(
        settings_in(dir.path()),
        CharmConfig::default(),
        &recorders,
        Box::new(store.clone()),
    );

    charm.dispatch(Hook::ConfigChanged).await.unwrap();
    charm.dispatch(Hook::ConfigChanged).await.unwrap();
    charm.dispatch(Hook::ConfigChanged).await.unwrap();

    let queue = store.state().await.unwrap().deferred;
    assert_eq!(queue.len(), 1);
    assert_eq!(queue[0].deliveries, 2);
}

#[tokio::test]
async fn config_changed_when_ready_reconciles() {
    let dir = tempdir().unwrap();
    let recorders = Recorders::new();

    let (charm, mut rx) = charm_with(
        settings_in(dir.path()),
        CharmConfig::default().with_enable_snmp(true),
        &recorders,
        Box::new(MemoryStateStore::ready()),
    );

    let outcome = charm.dispatch(Hook::ConfigChanged).await.unwrap();

    assert_eq!(outcome, DispatchOutcome::Handled);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("lldpd.default")).unwrap(),
        "DAEMON_ARGS=\"-x\"\n"
    );
    assert!(drain(&mut rx).contains(&CharmEvent::StatusChanged(UnitStatus::Active(
        "ready".to_string()
    ))));
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempdir().unwrap();
    let settings = settings_in(dir.path());
    let recorders = Recorders::new();

    // First process: config-changed arrives early
    {
        let store = FileStateStore::new(&settings.state_file).await.unwrap();
        let (charm, _rx) = charm_with(
            settings.clone(),
            CharmConfig::default(),
            &recorders,
            Box::new(store),
        );
        charm.dispatch(Hook::ConfigChanged).await.unwrap();
    }

    // Second process: install
    {
        let store = FileStateStore::new(&settings.state_file).await.unwrap();
        let (charm, _rx) = charm_with(
            settings.clone(),
            CharmConfig::default(),
            &recorders,
            Box::new(store),
        );
        charm.dispatch(Hook::Install).await.unwrap();
    }

    // Third process: the deferred hook finally runs
    let store = FileStateStore::new(&settings.state_file).await.unwrap();
    let state = store.state().await.unwrap();
    assert!(state.ready);
    assert_eq!(state.deferred.len(), 1);

    let (charm, _rx) = charm_with(
        settings.clone(),
        CharmConfig::default(),
        &recorders,
        Box::new(store),
    );
    charm.dispatch(Hook::UpgradeCharm).await.unwrap();

    assert!(settings.defaults_file.exists());
    let reopened = FileStateStore::new(&settings.state_file).await.unwrap();
    assert!(reopened.state().await.unwrap().deferred.is_empty());
}

#[tokio::test]
async fn failed_install_stays_uninitialized() {
    let dir = tempdir().unwrap();
    let recorders = Recorders {
        packages: RecordingPackageManager::failing(),
        ..Recorders::new()
    };
    let store = MemoryStateStore::new();

    let (charm, _rx) = charm_with(
        settings_in(dir.path()),
        CharmConfig::default(),
        &recorders,
        Box::new(store.clone()),
    );

    assert!(charm.dispatch(Hook::Install).await.is_err());
    assert!(!store.is_ready().await.unwrap());

    // config-changed is still gated
    assert_eq!(
        charm.dispatch(Hook::ConfigChanged).await.unwrap(),
        DispatchOutcome::Deferred
    );
}

#[tokio::test]
async fn unsafe_config_does_not_block_install() {
    let dir = tempdir().unwrap();
    let recorders = Recorders::new();
    let store = MemoryStateStore::new();
    let config = CharmConfig::default().with_interfaces_regex("eth$0");

    let (charm, _rx) = charm_with(
        settings_in(dir.path()),
        config,
        &recorders,
        Box::new(store.clone()),
    );

    assert_eq!(
        charm.dispatch(Hook::Install).await.unwrap(),
        DispatchOutcome::Handled
    );
    assert!(store.is_ready().await.unwrap());
    assert_eq!(recorders.packages.installed(), vec!["lldpd".to_string()]);

    // The snapshot is rejected only when it is applied
    let result = charm.dispatch(Hook::ConfigChanged).await;
    assert!(matches!(result, Err(lldpd_charm_core::Error::Config(_))));
    assert!(!dir.path().join("lldpd.default").exists());
}

#[tokio::test]
async fn nrpe_hooks_run_before_install() {
    let dir = tempdir().unwrap();
    let recorders = Recorders::new();

    let (charm, _rx) = charm_with(
        settings_in(dir.path()),
        CharmConfig::default(),
        &recorders,
        Box::new(MemoryStateStore::new()),
    );

    assert_eq!(
        charm
            .dispatch(Hook::NrpeExternalMasterRelationChanged)
            .await
            .unwrap(),
        DispatchOutcome::Handled
    );
    assert_eq!(recorders.runner.invocation_count(), 0);
}
