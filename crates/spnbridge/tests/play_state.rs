//! Play-state mirroring: idempotence, the forwarding gate, release waits.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use spnbridge::loopback::{LoopbackContextFactory, LoopbackHost};
use spnbridge::{
    AudioContext, ContextState, EngineHandle, Phase, PublicEvents, RealmContext, ReleaseLatch,
    SessionController, SessionOptions, Side,
};
use spnconf::RealmConfig;
use spnproto::{IpcMessagePorts, MessageChannel, PlayState};
use tokio::time::timeout;

#[derive(Default)]
struct EventLog {
    entries: Mutex<Vec<&'static str>>,
}

impl EventLog {
    fn entries(&self) -> Vec<&'static str> {
        self.entries.lock().unwrap().clone()
    }

    fn push(&self, entry: &'static str) {
        self.entries.lock().unwrap().push(entry);
    }
}

impl PublicEvents for EventLog {
    fn performance_started(&self) {
        self.push("started");
    }

    fn performance_paused(&self) {
        self.push("paused");
    }

    fn performance_resumed(&self) {
        self.push("resumed");
    }
}

fn ports() -> IpcMessagePorts {
    IpcMessagePorts::new(
        MessageChannel::pair().0,
        MessageChannel::pair().0,
        MessageChannel::pair().0,
    )
}

struct Rig {
    host: Arc<LoopbackHost>,
    factory: Arc<LoopbackContextFactory>,
    latch: Arc<ReleaseLatch>,
    events: Arc<EventLog>,
    ctl: SessionController,
}

fn rig_with(host: LoopbackHost, with_releases: bool) -> Rig {
    let host = Arc::new(host);
    let realm = Arc::new(RealmContext::new(host.clone(), &RealmConfig::default()));
    let factory = Arc::new(LoopbackContextFactory::new());
    let latch = Arc::new(ReleaseLatch::new());
    let events = Arc::new(EventLog::default());

    let mut engine = EngineHandle::new().with_events(events.clone());
    if with_releases {
        engine = engine.with_releases(latch.clone());
    }
    let ctl = SessionController::new(realm, factory.clone(), SessionOptions::default())
        .with_engine(engine)
        .with_ipc_ports(ports());

    Rig {
        host,
        factory,
        latch,
        events,
        ctl,
    }
}

fn rig() -> Rig {
    rig_with(LoopbackHost::new(), true)
}

fn forwarded(rig: &Rig) -> Vec<PlayState> {
    rig.host
        .journal()
        .set_play_state_calls()
        .into_iter()
        .map(|c| c.new_state)
        .collect()
}

#[tokio::test]
async fn started_initializes_and_is_not_forwarded() {
    let mut rig = rig();
    rig.latch.release_start();

    rig.ctl.on_play_state_change(PlayState::PerformanceStarted).await;

    let calls = rig.host.journal().initialize_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].initial_play_state, Some(PlayState::PerformanceStarted));
    assert!(forwarded(&rig).is_empty());
    assert_eq!(rig.events.entries(), vec!["started"]);
    assert_eq!(rig.ctl.phase(), Phase::Started);
    assert_eq!(rig.ctl.play_state(), Some(PlayState::PerformanceStarted));
}

#[tokio::test]
async fn started_waits_for_the_start_release() {
    let mut rig = rig();

    let pending = timeout(
        Duration::from_millis(50),
        rig.ctl.on_play_state_change(PlayState::PerformanceStarted),
    )
    .await;
    assert!(pending.is_err());
    assert!(rig.events.entries().is_empty());
}

#[tokio::test]
async fn repeated_pause_is_a_no_op() {
    let mut rig = rig();
    rig.ctl.try_initialize().await.unwrap();

    rig.latch.release_pause();
    rig.ctl.on_play_state_change(PlayState::PerformancePaused).await;

    // No pause permit is left; a second wait would hang.
    timeout(
        Duration::from_secs(1),
        rig.ctl.on_play_state_change(PlayState::PerformancePaused),
    )
    .await
    .expect("repeated pause must not wait");

    assert_eq!(forwarded(&rig), vec![PlayState::PerformancePaused]);
    assert_eq!(rig.events.entries(), vec!["paused"]);
    assert_eq!(rig.ctl.phase(), Phase::Paused);
}

#[tokio::test]
async fn pause_and_resume_wait_for_their_releases() {
    let mut rig = rig();
    rig.ctl.try_initialize().await.unwrap();

    let blocked = timeout(
        Duration::from_millis(50),
        rig.ctl.on_play_state_change(PlayState::PerformancePaused),
    )
    .await;
    assert!(blocked.is_err());

    rig.latch.release_resume();
    rig.ctl.on_play_state_change(PlayState::PerformanceResumed).await;

    assert_eq!(rig.events.entries(), vec!["paused", "resumed"]);
    assert_eq!(forwarded(&rig), vec![PlayState::PerformanceResumed]);
    assert_eq!(rig.ctl.phase(), Phase::Started);
}

#[tokio::test]
async fn without_release_hooks_pause_only_forwards() {
    let mut rig = rig_with(LoopbackHost::new(), false);
    rig.ctl.try_initialize().await.unwrap();

    rig.ctl.on_play_state_change(PlayState::PerformancePaused).await;
    rig.ctl.on_play_state_change(PlayState::PerformanceResumed).await;

    assert!(rig.events.entries().is_empty());
    assert_eq!(
        forwarded(&rig),
        vec![PlayState::PerformancePaused, PlayState::PerformanceResumed]
    );
}

#[tokio::test]
async fn render_started_stays_local_and_render_ended_is_forwarded() {
    let mut rig = rig_with(LoopbackHost::new(), false);
    rig.ctl.try_initialize().await.unwrap();

    rig.ctl.on_play_state_change(PlayState::RenderStarted).await;
    rig.ctl.on_play_state_change(PlayState::RenderEnded).await;

    assert_eq!(forwarded(&rig), vec![PlayState::RenderEnded]);
    assert_eq!(rig.ctl.phase(), Phase::Ended);
}

#[tokio::test]
async fn forwarded_states_carry_the_session_id() {
    let mut rig = rig_with(LoopbackHost::new(), false);
    rig.ctl.try_initialize().await.unwrap();
    rig.ctl.on_play_state_change(PlayState::PerformancePaused).await;

    let calls = rig.host.journal().set_play_state_calls();
    assert_eq!(calls[0].session_id.as_str(), "audioWorklet0");
}

#[tokio::test]
async fn only_real_changes_reach_the_realm() {
    let mut rig = rig_with(LoopbackHost::new(), false);
    rig.ctl.try_initialize().await.unwrap();

    let sequence = [
        PlayState::PerformancePaused,
        PlayState::PerformancePaused,
        PlayState::PerformanceResumed,
        PlayState::PerformanceResumed,
        PlayState::PerformanceResumed,
        PlayState::RenderStarted,
        PlayState::RenderStarted,
        PlayState::RenderEnded,
        PlayState::RenderEnded,
        PlayState::PerformanceEnded,
    ];
    for state in sequence {
        rig.ctl.on_play_state_change(state).await;
    }

    assert_eq!(
        forwarded(&rig),
        vec![
            PlayState::PerformancePaused,
            PlayState::PerformanceResumed,
            PlayState::RenderEnded,
            PlayState::PerformanceEnded,
        ]
    );
}

#[tokio::test]
async fn ended_releases_the_parent_node_but_keeps_the_session() {
    let mut rig = rig_with(LoopbackHost::new().with_node_side(Side::Parent), false);
    rig.ctl.try_initialize().await.unwrap();
    let uid = rig.ctl.session_id().cloned().unwrap();
    assert!(rig.ctl.realm().scope().lookup_node(&uid).is_some());

    rig.ctl.on_play_state_change(PlayState::PerformanceEnded).await;

    let scope = rig.ctl.realm().scope();
    assert!(!scope.contains(Side::Parent, &uid.parent_node_key()));
    assert!(scope.context(&uid).is_some());
    assert_eq!(rig.factory.created()[0].state(), ContextState::Running);
    assert!(rig.ctl.realm().is_live().await);
    assert_eq!(forwarded(&rig), vec![PlayState::PerformanceEnded]);
}

#[tokio::test]
async fn changes_before_initialize_stay_local() {
    let mut rig = rig_with(LoopbackHost::new(), false);

    rig.ctl.on_play_state_change(PlayState::PerformancePaused).await;

    assert_eq!(rig.ctl.play_state(), Some(PlayState::PerformancePaused));
    assert_eq!(rig.ctl.phase(), Phase::Uninitialized);
    assert_eq!(rig.host.mount_count(), 0);
    assert!(forwarded(&rig).is_empty());
}

#[tokio::test]
async fn failed_start_does_not_wait_or_notify() {
    let mut rig = rig_with(LoopbackHost::headless(), true);

    timeout(
        Duration::from_secs(1),
        rig.ctl.on_play_state_change(PlayState::PerformanceStarted),
    )
    .await
    .expect("failed start must not wait for release");

    assert!(rig.events.entries().is_empty());
    assert_eq!(rig.ctl.phase(), Phase::Uninitialized);
}
