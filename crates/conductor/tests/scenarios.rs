//! End-to-end scenarios, driven the same way the real server would:
//! through the onboarding/dispatcher/workflow functions against a
//! `Database` opened on a fresh temp directory, with a stub
//! `BoardBusService` standing in for a connected bus agent's tarpc client.

use std::sync::Arc;

use chrono::Utc;
use iotronic_common::ids::{BoardUuid, BusAgentHostname, RequestUuid, SessionId, ServiceUuid};
use iotronic_common::rpc::bus::{BoardBusService, ConnectionInfo, DispatchOutcome, WampResult};
use iotronic_common::rpc::error::DispatchError;
use iotronic_common::state::{
    Board, BoardStatus, BusAgent, RequestStatus, ResultValue, Service, ServiceAction, ServiceProtocol,
};
use serde_json::Value as Json;
use tarpc::context;
use tarpc::server::Channel;
use futures::StreamExt;
use tempfile::TempDir;
use url::Url;

use iotronic_conductor::cli::{Config, ConductorSection, NginxSection, WampSection};
use iotronic_conductor::db::Database;
use iotronic_conductor::gateway::dns::InMemoryDnsGateway;
use iotronic_conductor::gateway::DnsGateway;
use iotronic_conductor::state::{session_manager, GlobalState};
use iotronic_conductor::{dispatcher, onboarding, workflow};

fn test_state(port_min: u16, port_max: u16) -> (TempDir, Arc<GlobalState>) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(&dir.path().join("store")).expect("open database");
    let config = Config {
        conductor: ConductorSection {
            heartbeat_timeout: 30,
            service_port_min: port_min,
            service_port_max: port_max,
        },
        wamp: WampSection {
            wamp_transport_url: "ws://localhost:8181/ws".to_string(),
            wamp_realm: "s4t".to_string(),
            register_agent: "iotronic-agent-1".to_string(),
            auto_ping_interval: 60,
            auto_ping_timeout: 30,
            skip_cert_verify: false,
            service_allow_list_path: "/tmp/allowed_client.json".into(),
        },
        nginx: NginxSection {
            nginx_path: "/etc/nginx".into(),
            wstun_endpoint: "wss://localhost:8812".to_string(),
        },
    };
    let dns: Arc<dyn DnsGateway> = Arc::new(InMemoryDnsGateway::default());
    let (_layer, reload_handler) =
        tracing_subscriber::reload::Layer::new(tracing_subscriber::EnvFilter::new("error"));
    let state = GlobalState::load(config, db, dns, reload_handler).expect("load state");
    (dir, state)
}

fn register_bus_agent(state: &GlobalState, hostname: &str, ragent: bool) -> BusAgentHostname {
    let hostname = BusAgentHostname::new(hostname);
    let wsurl: Url = format!("ws://{hostname}/bus").parse().expect("valid wsurl");
    let row = BusAgent::new(hostname.clone(), wsurl, ragent, Utc::now());
    state.agents.register(row.clone()).expect("register agent");
    state.db.bus_agents.insert(&hostname, &row).expect("persist agent row");
    hostname
}

/// A `BoardBusService` that acknowledges every call with an immediate
/// `SUCCESS`, standing in for a connected bus agent in tests that don't
/// exercise the asynchronous `notify_result` path.
#[derive(Debug, Clone, Default)]
struct StubBoardAgent;

impl BoardBusService for StubBoardAgent {
    async fn dispatch(
        self,
        _: context::Context,
        _session_id: SessionId,
        _board_uuid: BoardUuid,
        _req_id: RequestUuid,
        _call: String,
        _params: Json,
    ) -> Result<DispatchOutcome, DispatchError> {
        Ok(DispatchOutcome {
            result: ResultValue::Success,
            message: None,
        })
    }

    async fn create_tap_interface(self, _: context::Context, _board_uuid: BoardUuid, _tcp_port: u16) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn addin_allowlist(self, _: context::Context, _board_uuid: BoardUuid, _port: u16) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn remove_from_allowlist(self, _: context::Context, _board_uuid: BoardUuid, _port: u16) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn enable_webservice(
        self,
        _: context::Context,
        _board_uuid: BoardUuid,
        _zone: String,
        _fqdn: String,
        _http_port: u16,
        _https_port: u16,
    ) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn disable_webservice(self, _: context::Context, _board_uuid: BoardUuid) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn add_redirect(self, _: context::Context, _board_uuid: BoardUuid, _host: String) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn remove_redirect(self, _: context::Context, _board_uuid: BoardUuid, _host: String) -> Result<(), DispatchError> {
        Ok(())
    }

    async fn reload_proxy(self, _: context::Context) -> Result<(), DispatchError> {
        Ok(())
    }
}

fn spawn_stub_client() -> iotronic_common::rpc::bus::BoardBusServiceClient {
    let (client_transport, server_transport) = tarpc::transport::channel::unbounded();
    tokio::spawn(
        tarpc::server::BaseChannel::with_defaults(server_transport)
            .execute(StubBoardAgent.serve())
            .for_each(|r| async move {
                tokio::spawn(r);
            }),
    );
    iotronic_common::rpc::bus::BoardBusServiceClient::new(tarpc::client::Config::default(), client_transport).spawn()
}

/// Brings a freshly created board online on a connected (stubbed) bus
/// agent: registers the agent, attaches its tarpc client, and runs the
/// same `session_manager::on_connection` the real `connection` RPC uses.
async fn connect_board(state: &GlobalState, board: &mut Board, session_id: SessionId) {
    let hostname = register_bus_agent(state, &format!("agent-for-{}", board.uuid), false);
    state.agents.attach_client(hostname.clone(), spawn_stub_client());
    session_manager::on_connection(&state.db, board, session_id, hostname, ConnectionInfo::default(), Utc::now())
        .expect("on_connection");
}

#[tokio::test]
async fn first_time_registration() {
    let (_dir, state) = test_state(50000, 50010);
    register_bus_agent(&state, "iotronic-agent-1", true);
    let other = register_bus_agent(&state, "iotronic-agent-2", false);

    let board = Board::new("board-1", "ABC123", Utc::now());
    let board_uuid = board.uuid;
    state.db.boards.insert(&board_uuid, &board).unwrap();

    let cfg = onboarding::register(&state, "ABC123", SessionId(42)).await.unwrap();

    let stored = state.db.boards.get(&board_uuid).unwrap().unwrap();
    assert_eq!(stored.status, BoardStatus::Offline);
    assert_eq!(stored.agent.as_ref(), Some(&other));

    let session = state.db.sessions.get(&SessionId(42)).unwrap().unwrap();
    assert!(session.valid);
    assert_eq!(session.board_uuid, board_uuid);

    let other_row = state.agents.get(&other).unwrap();
    assert_eq!(cfg["iotronic"]["wamp"]["main-agent"]["url"], other_row.wsurl.as_str());
}

#[tokio::test]
async fn reregistration_after_crash_keeps_existing_config() {
    let (_dir, state) = test_state(50000, 50010);
    register_bus_agent(&state, "iotronic-agent-1", true);
    register_bus_agent(&state, "iotronic-agent-2", false);

    let board = Board::new("board-1", "ABC123", Utc::now());
    let board_uuid = board.uuid;
    state.db.boards.insert(&board_uuid, &board).unwrap();

    let first_cfg = onboarding::register(&state, "ABC123", SessionId(42)).await.unwrap();

    let second_cfg = onboarding::register(&state, "ABC123", SessionId(99)).await.unwrap();
    assert_eq!(first_cfg, second_cfg);

    let prior = state.db.sessions.get(&SessionId(42)).unwrap().unwrap();
    assert!(!prior.valid);
    let fresh = state.db.sessions.get(&SessionId(99)).unwrap().unwrap();
    assert!(fresh.valid);
    assert_eq!(fresh.board_uuid, board_uuid);

    let stored = state.db.boards.get(&board_uuid).unwrap().unwrap();
    assert_eq!(stored.config, first_cfg);
}

#[tokio::test]
async fn service_enable_exhausts_the_port_pool() {
    // The allocatable range excludes both endpoints, leaving exactly two
    // ports (50001, 50002); one is already claimed by an `ExposedService`
    // elsewhere, so only one free port remains once the allocator is
    // seeded at `GlobalState::load` time.
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open(&dir.path().join("store")).expect("open database");
    let other_board = BoardUuid::new();
    db.exposed_services
        .insert(
            &iotronic_common::ids::ExposedServiceUuid::new(),
            &iotronic_common::state::ExposedService {
                uuid: iotronic_common::ids::ExposedServiceUuid::new(),
                board_uuid: other_board,
                service_uuid: ServiceUuid::new(),
                public_port: 50001,
            },
        )
        .unwrap();

    let config = Config {
        conductor: ConductorSection {
            heartbeat_timeout: 30,
            service_port_min: 50000,
            service_port_max: 50003,
        },
        wamp: WampSection {
            wamp_transport_url: "ws://localhost:8181/ws".to_string(),
            wamp_realm: "s4t".to_string(),
            register_agent: "iotronic-agent-1".to_string(),
            auto_ping_interval: 60,
            auto_ping_timeout: 30,
            skip_cert_verify: false,
            service_allow_list_path: "/tmp/allowed_client.json".into(),
        },
        nginx: NginxSection {
            nginx_path: "/etc/nginx".into(),
            wstun_endpoint: "wss://localhost:8812".to_string(),
        },
    };
    let dns: Arc<dyn DnsGateway> = Arc::new(InMemoryDnsGateway::default());
    let (_layer, reload_handler) =
        tracing_subscriber::reload::Layer::new(tracing_subscriber::EnvFilter::new("error"));
    let state = GlobalState::load(config, db, dns, reload_handler).expect("load state");

    let mut board = Board::new("board-1", "CODE1", Utc::now());
    let board_uuid = board.uuid;
    state.db.boards.insert(&board_uuid, &board).unwrap();
    connect_board(&state, &mut board, SessionId(1)).await;

    let service_a = Service {
        uuid: ServiceUuid::new(),
        name: "ssh".to_string(),
        protocol: ServiceProtocol::Tcp,
        port: 22,
    };
    let service_b = Service {
        uuid: ServiceUuid::new(),
        name: "http".to_string(),
        protocol: ServiceProtocol::Tcp,
        port: 80,
    };
    state.db.services.insert(&service_a.uuid, &service_a).unwrap();
    state.db.services.insert(&service_b.uuid, &service_b).unwrap();

    workflow::service::action_service(&state, board_uuid, service_a.uuid, ServiceAction::ServiceEnable)
        .await
        .expect("first enable succeeds from the lone remaining port");

    let err = workflow::service::action_service(&state, board_uuid, service_b.uuid, ServiceAction::ServiceEnable)
        .await
        .expect_err("pool is exhausted");
    assert!(matches!(err, iotronic_conductor::error::ConductorError::NotEnoughPortForService));
}

#[tokio::test]
async fn webservice_enable_happy_path() {
    let (_dir, state) = test_state(50000, 50010);
    let mut board = Board::new("board-1", "CODE1", Utc::now());
    let board_uuid = board.uuid;
    state.db.boards.insert(&board_uuid, &board).unwrap();
    connect_board(&state, &mut board, SessionId(1)).await;

    let enabled = workflow::webservice::enable_webservice(&state, state.dns.as_ref(), board_uuid, "foo", "ex.com", "a@b")
        .await
        .expect("enable succeeds");

    assert_eq!(enabled.dns, "foo");
    assert_eq!(enabled.zone, "ex.com");

    let exposed: Vec<_> = state
        .db
        .exposed_services
        .read_all()
        .filter(|(_, svc)| svc.board_uuid == board_uuid)
        .collect();
    assert_eq!(exposed.len(), 2);

    let requests: Vec<_> = state
        .db
        .requests
        .read_all()
        .filter(|(_, r)| r.destination_uuid == board_uuid)
        .collect();
    let parent = requests
        .iter()
        .find(|(_, r)| r.main_request_uuid.is_none())
        .expect("one parent request");
    assert_eq!(parent.1.pending_requests, 0, "all three children settled synchronously");
    assert_eq!(parent.1.status, RequestStatus::Completed);
    let children: Vec<_> = requests
        .iter()
        .filter(|(_, r)| r.main_request_uuid == Some(parent.1.uuid))
        .collect();
    assert_eq!(children.len(), 3);
}

#[tokio::test]
async fn webservice_enable_dns_collision() {
    let (_dir, state) = test_state(50000, 50010);

    let mut first_board = Board::new("board-1", "CODE1", Utc::now());
    let first_uuid = first_board.uuid;
    state.db.boards.insert(&first_uuid, &first_board).unwrap();
    connect_board(&state, &mut first_board, SessionId(1)).await;
    workflow::webservice::enable_webservice(&state, state.dns.as_ref(), first_uuid, "foo", "ex.com", "a@b")
        .await
        .expect("first board claims the dns name");

    let mut second_board = Board::new("board-2", "CODE2", Utc::now());
    let second_uuid = second_board.uuid;
    state.db.boards.insert(&second_uuid, &second_board).unwrap();
    connect_board(&state, &mut second_board, SessionId(2)).await;

    let exposed_before = state.db.exposed_services.read_all().count();

    let err = workflow::webservice::enable_webservice(&state, state.dns.as_ref(), second_uuid, "foo", "ex.com", "a@b")
        .await
        .expect_err("dns name is already in use");
    let parent_request = match err {
        iotronic_conductor::error::ConductorError::DnsWebserviceAlreadyExists { parent_request } => parent_request,
        other => panic!("expected DnsWebserviceAlreadyExists, got {other:?}"),
    };
    let parent_uuid: RequestUuid = parent_request.parse().unwrap();
    let parent = state.db.requests.get(&parent_uuid).unwrap().unwrap();
    assert_eq!(parent.pending_requests, 0);
    let result = state.db.results.get(&parent_uuid).unwrap().unwrap();
    assert_eq!(result.result, ResultValue::Warning);
    assert_eq!(result.message.as_deref(), Some("DNS already exists!"));

    assert_eq!(state.db.exposed_services.read_all().count(), exposed_before, "no new ExposedService rows");
    assert!(state
        .db
        .enabled_webservices
        .read_all()
        .all(|(_, w)| w.board_uuid != second_uuid));
}

#[tokio::test]
async fn async_notify_completes_the_parent_as_children_settle() {
    let (_dir, state) = test_state(50000, 50010);
    let board = Board::new("board-1", "CODE1", Utc::now());
    let board_uuid = board.uuid;
    state.db.boards.insert(&board_uuid, &board).unwrap();

    let parent = RequestUuid::new();
    let mut parent_request = iotronic_common::state::Request::new_root(
        parent,
        board_uuid,
        iotronic_common::state::RequestType::Board,
        "Batch",
    );
    parent_request.pending_requests = 2;
    state.db.requests.insert(&parent, &parent_request).unwrap();

    let child_a = RequestUuid::new();
    let child_b = RequestUuid::new();
    for child in [child_a, child_b] {
        state
            .db
            .requests
            .insert(
                &child,
                &iotronic_common::state::Request::new_child(child, board_uuid, parent, "Step"),
            )
            .unwrap();
        state
            .db
            .results
            .insert(&child, &iotronic_common::state::ResultRow::new_running(child, board_uuid))
            .unwrap();
    }

    dispatcher::notify_result(
        &state,
        board_uuid,
        WampResult {
            req_id: child_a,
            result: ResultValue::Success,
            message: None,
        },
    )
    .await
    .expect("success is not an error");

    let after_first = state.db.requests.get(&parent).unwrap().unwrap();
    assert_eq!(after_first.pending_requests, 1);
    assert_eq!(after_first.status, RequestStatus::Pending);

    let err = dispatcher::notify_result(
        &state,
        board_uuid,
        WampResult {
            req_id: child_b,
            result: ResultValue::Error,
            message: Some("device rejected the call".to_string()),
        },
    )
    .await
    .expect_err("an ERROR result is always raised to the caller");
    assert!(matches!(
        err,
        iotronic_conductor::error::ConductorError::ErrorExecutionOnBoard { .. }
    ));

    let after_second = state.db.requests.get(&parent).unwrap().unwrap();
    assert_eq!(after_second.pending_requests, 0);
    assert_eq!(after_second.status, RequestStatus::Completed);

    let child_b_result = state.db.results.get(&child_b).unwrap().unwrap();
    assert_eq!(child_b_result.result, ResultValue::Error);

    // Idempotent retry: a second delivery for the already-terminal child is
    // a silent no-op, not a second error.
    dispatcher::notify_result(
        &state,
        board_uuid,
        WampResult {
            req_id: child_b,
            result: ResultValue::Error,
            message: Some("retry".to_string()),
        },
    )
    .await
    .expect("retry of an already-settled result is a no-op");
}
