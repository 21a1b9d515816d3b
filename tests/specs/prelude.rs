//! Shared fixture: a full room stack on memory storage and a fake clock.

use masc_adapters::FakeExecutor;
use masc_core::{AgentMeta, FakeClock, RoomConfig, TokenStore};
use masc_daemon::auth::AuthStore;
use masc_daemon::protocol::{Command, Request, Response};
use masc_daemon::Gate;
use masc_engine::{EventFabric, RoomEngine, Shutdown, WalphSupervisor};
use masc_storage::{MemoryAudit, MemoryBackend};
use std::sync::Arc;

pub struct Stack {
    pub gate: Arc<Gate<FakeClock>>,
    pub engine: Arc<RoomEngine<FakeClock>>,
    pub walph: Arc<WalphSupervisor<FakeClock>>,
    pub fabric: Arc<EventFabric>,
    pub clock: FakeClock,
    pub backend: Arc<MemoryBackend<FakeClock>>,
    pub audit: Arc<MemoryAudit>,
    pub executor: FakeExecutor,
    pub shutdown: Arc<Shutdown>,
}

/// Default stack: rate limiting off so scenarios control their own load.
pub fn stack() -> Stack {
    stack_with(RoomConfig {
        rate: 0.0,
        ..RoomConfig::default()
    })
}

pub fn stack_with(config: RoomConfig) -> Stack {
    let clock = FakeClock::new();
    clock.set_epoch_ms(1_700_000_000_000);
    let backend = Arc::new(MemoryBackend::with_clock(clock.clone()));
    let audit = Arc::new(MemoryAudit::new());
    let fabric = Arc::new(EventFabric::new(config.max_pending_sends));
    let engine = Arc::new(RoomEngine::new(
        backend.clone(),
        audit.clone(),
        Arc::clone(&fabric),
        clock.clone(),
        "/spec/room",
        config.clone(),
    ));
    engine.init(Some("spec-room".to_string())).unwrap();

    let executor = FakeExecutor::new();
    let walph = Arc::new(WalphSupervisor::new(
        Arc::clone(&engine),
        Arc::new(executor.clone()),
    ));
    let auth = AuthStore::load(backend.clone(), config.token_ttl_secs);
    let shutdown = Arc::new(Shutdown::new());
    let gate = Arc::new(Gate::new(
        Arc::clone(&engine),
        Arc::clone(&walph),
        auth,
        Arc::new(TokenStore::new()),
        Arc::clone(&shutdown),
    ));

    Stack {
        gate,
        engine,
        walph,
        fabric,
        clock,
        backend,
        audit,
        executor,
        shutdown,
    }
}

impl Stack {
    pub fn send(&self, command: Command) -> Response {
        self.gate.dispatch(Request::bare(command)).response
    }

    pub fn join(&self, agents: &[&str]) {
        for agent in agents {
            let response = self.send(Command::Join {
                agent: agent.to_string(),
                capabilities: Vec::new(),
                meta: AgentMeta::default(),
            });
            assert!(
                matches!(response, Response::Agent { .. }),
                "join {agent} failed: {response:?}"
            );
        }
    }

    pub fn add_task(&self, agent: &str, title: &str, priority: u8) -> String {
        match self.send(Command::AddTask {
            agent: agent.to_string(),
            title: title.to_string(),
            description: String::new(),
            priority,
            files: Vec::new(),
            required_caps: Vec::new(),
        }) {
            Response::Task { task } => task.id.to_string(),
            other => panic!("add_task failed: {other:?}"),
        }
    }
}

/// Unwrap an error response into (kind, message).
pub fn expect_error(response: Response) -> (String, String) {
    match response {
        Response::Error { kind, message, .. } => (kind, message),
        other => panic!("expected error, got {other:?}"),
    }
}
