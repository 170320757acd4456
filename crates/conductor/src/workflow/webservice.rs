//! `enable_webservice`, `disable_webservice`, `renew_webservice`,
//! `create_webservice`, `destroy_webservice`.
//!
//! The DNS backend is injected so callers can swap the production
//! `ClientDnsGateway` for `InMemoryDnsGateway` in tests; the reverse-proxy
//! gateway is always the bus-relayed production implementation, built per
//! call from `state.db`/`state.agents` (it borrows both, so it can't be
//! stored on `GlobalState` itself).
//!
//! The two ports `EnableWebService` allocates are recorded as
//! `ExposedService` rows; since `ExposedService.service_uuid` must
//! reference a real `Service`, two placeholder `Service` rows
//! (`"webservice"`, `"webservice_ssl"`) are created alongside them and torn
//! down together in `disable_webservice`.

use iotronic_common::ids::{BoardUuid, EnabledWebserviceUuid, ExposedServiceUuid, ServiceUuid, WebserviceUuid};
use iotronic_common::state::{EnabledWebservice, ExposedService, Service, ServiceProtocol, Webservice};
use serde_json::json;

use super::{new_parent_request, require_online, warning_parent};
use crate::dispatcher;
use crate::error::ConductorError;
use crate::gateway::proxy_bus::BusProxyGateway;
use crate::gateway::{DnsGateway, ProxyGateway};
use crate::state::GlobalState;

fn find_enabled(
    state: &GlobalState,
    board_uuid: BoardUuid,
) -> Result<Option<(EnabledWebserviceUuid, EnabledWebservice)>, ConductorError> {
    Ok(state
        .db
        .enabled_webservices
        .read_all()
        .find(|(_, w)| w.board_uuid == board_uuid))
}

fn find_webservice(
    state: &GlobalState,
    board_uuid: BoardUuid,
    name: &str,
) -> Result<Option<(WebserviceUuid, Webservice)>, ConductorError> {
    Ok(state
        .db
        .webservices
        .read_all()
        .find(|(_, w)| w.board_uuid == board_uuid && w.name == name))
}

fn dns_in_use(state: &GlobalState, dns: &str) -> Result<bool, ConductorError> {
    Ok(state.db.enabled_webservices.read_all().any(|(_, w)| w.dns == dns))
}

fn board_endpoint(board: &iotronic_common::state::Board) -> String {
    board
        .connectivity
        .mac_addr
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string())
}

/// Rejects with `DnsWebserviceAlreadyExists` (also recording a WARNING
/// Result on the zero-pending parent) or `EnabledWebserviceAlreadyExists`;
/// otherwise creates the DNS record, allocates two public ports, dispatches
/// the three-step enable sequence under one parent Request, records the
/// `ExposedService` rows, and tells the agent to write and reload the
/// proxy.
pub async fn enable_webservice(
    state: &GlobalState,
    dns_gateway: &dyn DnsGateway,
    board_uuid: BoardUuid,
    dns: &str,
    zone: &str,
    email: &str,
) -> Result<EnabledWebservice, ConductorError> {
    let board = require_online(state, board_uuid)?;

    if dns_in_use(state, dns)? {
        let parent = warning_parent(state, board_uuid, "EnableWebService", "DNS already exists!")?;
        return Err(ConductorError::DnsWebserviceAlreadyExists {
            parent_request: parent.to_string(),
        });
    }
    if find_enabled(state, board_uuid)?.is_some() {
        return Err(ConductorError::EnabledWebserviceAlreadyExists);
    }

    let fqdn = format!("{dns}.{zone}");
    let endpoint = board_endpoint(&board);
    dns_gateway.create_record(&fqdn, &endpoint).await?;

    let http_port = state
        .ports
        .allocate()
        .await
        .map_err(|_| ConductorError::NotEnoughPortForService)?;
    let https_port = match state.ports.allocate().await {
        Ok(p) => p,
        Err(_) => {
            state.ports.release(http_port).await;
            return Err(ConductorError::NotEnoughPortForService);
        }
    };

    let enabled = EnabledWebservice {
        uuid: EnabledWebserviceUuid::new(),
        board_uuid,
        http_port,
        https_port,
        dns: dns.to_string(),
        zone: zone.to_string(),
    };
    state.db.enabled_webservices.insert(&enabled.uuid, &enabled)?;

    let parent = new_parent_request(state, board_uuid, "EnableWebService", 3)?;
    dispatcher::execute_on_board(
        state,
        board_uuid,
        "ServiceEnable",
        json!({ "service": "webservice", "public_port": http_port }),
        Some(parent),
    )
    .await?;
    dispatcher::execute_on_board(
        state,
        board_uuid,
        "ServiceEnable",
        json!({ "service": "webservice_ssl", "public_port": https_port }),
        Some(parent),
    )
    .await?;
    dispatcher::execute_on_board(
        state,
        board_uuid,
        "EnableWebService",
        json!({ "fqdn": fqdn, "email": email }),
        Some(parent),
    )
    .await?;

    for (name, port) in [("webservice", http_port), ("webservice_ssl", https_port)] {
        let service = Service {
            uuid: ServiceUuid::new(),
            name: name.to_string(),
            protocol: ServiceProtocol::Tcp,
            port,
        };
        state.db.services.insert(&service.uuid, &service)?;
        let exposed = ExposedService {
            uuid: ExposedServiceUuid::new(),
            board_uuid,
            service_uuid: service.uuid,
            public_port: port,
        };
        state.db.exposed_services.insert(&exposed.uuid, &exposed)?;
    }

    let proxy = BusProxyGateway::new(&state.db, &state.agents);
    proxy
        .enable_webservice(board_uuid, zone, &fqdn, http_port, https_port, &endpoint)
        .await?;
    proxy.reload_proxy().await?;

    Ok(enabled)
}

/// Mirror image of `enable_webservice`: each device call is skipped (but
/// cloud-side state still cleaned up) if the board is offline.
pub async fn disable_webservice(
    state: &GlobalState,
    dns_gateway: &dyn DnsGateway,
    board_uuid: BoardUuid,
) -> Result<(), ConductorError> {
    let board = state
        .db
        .boards
        .get(&board_uuid)?
        .ok_or_else(|| ConductorError::BoardNotFound(board_uuid.to_string()))?;
    let Some((uuid, enabled)) = find_enabled(state, board_uuid)? else {
        return Err(ConductorError::EnabledWebserviceNotFound);
    };

    if board.is_online() {
        let parent = new_parent_request(state, board_uuid, "DisableWebService", 3)?;
        dispatcher::execute_on_board(
            state,
            board_uuid,
            "ServiceDisable",
            json!({ "service": "webservice" }),
            Some(parent),
        )
        .await?;
        dispatcher::execute_on_board(
            state,
            board_uuid,
            "ServiceDisable",
            json!({ "service": "webservice_ssl" }),
            Some(parent),
        )
        .await?;
        dispatcher::execute_on_board(state, board_uuid, "DisableWebService", json!({}), Some(parent)).await?;
    }

    let exposed: Vec<_> = state
        .db
        .exposed_services
        .read_all()
        .filter(|(_, svc)| {
            svc.board_uuid == board_uuid && (svc.public_port == enabled.http_port || svc.public_port == enabled.https_port)
        })
        .collect();
    for (exp_uuid, exp) in exposed {
        state.ports.release(exp.public_port).await;
        state.db.exposed_services.remove(&exp_uuid)?;
        state.db.services.remove(&exp.service_uuid)?;
    }

    dns_gateway.delete_record(&enabled.fqdn()).await?;
    state.db.enabled_webservices.remove(&uuid)?;

    if board.is_online() {
        let proxy = BusProxyGateway::new(&state.db, &state.agents);
        proxy.disable_webservice(board_uuid).await?;
        proxy.reload_proxy().await?;
    }

    Ok(())
}

pub async fn renew_webservice(state: &GlobalState, board_uuid: BoardUuid) -> Result<(), ConductorError> {
    require_online(state, board_uuid)?;
    if find_enabled(state, board_uuid)?.is_none() {
        return Err(ConductorError::EnabledWebserviceNotFound);
    }
    let parent = new_parent_request(state, board_uuid, "RenewWebservice", 1)?;
    dispatcher::execute_on_board(state, board_uuid, "RenewWebservice", json!({}), Some(parent)).await?;
    Ok(())
}

/// If `(board, name)` already exists, records a zero-pending parent plus a
/// WARNING Result and returns the existing row without dispatching
/// anything. Otherwise creates the per-name DNS entry, dispatches
/// `ExposeWebservice` with the comma-separated list of every DNS name
/// already exposed on the board, and asks the agent to add the redirect
/// and reload.
pub async fn create_webservice(
    state: &GlobalState,
    dns_gateway: &dyn DnsGateway,
    board_uuid: BoardUuid,
    name: &str,
    port: u16,
    secure: bool,
) -> Result<Webservice, ConductorError> {
    let board = require_online(state, board_uuid)?;

    if let Some((_, existing)) = find_webservice(state, board_uuid, name)? {
        warning_parent(state, board_uuid, "ExposeWebservice", "Webservice already exposed")?;
        return Ok(existing);
    }

    let Some((_, enabled)) = find_enabled(state, board_uuid)? else {
        return Err(ConductorError::EnabledWebserviceNotFound);
    };
    let fqdn = format!("{name}.{}", enabled.fqdn());
    let endpoint = board_endpoint(&board);
    dns_gateway.create_record(&fqdn, &endpoint).await?;

    let all_dns: Vec<String> = state
        .db
        .webservices
        .read_all()
        .filter(|(_, w)| w.board_uuid == board_uuid)
        .map(|(_, w)| format!("{}.{}", w.name, enabled.fqdn()))
        .chain(std::iter::once(fqdn.clone()))
        .collect();

    dispatcher::execute_on_board(
        state,
        board_uuid,
        "ExposeWebservice",
        json!({
            "zone_domain": enabled.zone,
            "fqdn": fqdn,
            "port": port,
            "dns_list": all_dns.join(","),
        }),
        None,
    )
    .await?;

    let proxy = BusProxyGateway::new(&state.db, &state.agents);
    proxy.add_redirect(board_uuid, &fqdn).await?;
    proxy.reload_proxy().await?;

    let webservice = Webservice {
        uuid: WebserviceUuid::new(),
        board_uuid,
        name: name.to_string(),
        port,
        secure,
    };
    state.db.webservices.insert(&webservice.uuid, &webservice)?;
    Ok(webservice)
}

/// Dispatches `UnexposeWebservice` with the remaining DNS list (self
/// excluded) and asks the agent to remove the redirect, but only when the
/// board is online; always deletes the row and the DNS record.
pub async fn destroy_webservice(
    state: &GlobalState,
    dns_gateway: &dyn DnsGateway,
    board_uuid: BoardUuid,
    webservice_uuid: WebserviceUuid,
) -> Result<(), ConductorError> {
    let board = state
        .db
        .boards
        .get(&board_uuid)?
        .ok_or_else(|| ConductorError::BoardNotFound(board_uuid.to_string()))?;
    let webservice = state
        .db
        .webservices
        .get(&webservice_uuid)?
        .ok_or_else(|| ConductorError::WebserviceNotFound(webservice_uuid.to_string()))?;
    let Some((_, enabled)) = find_enabled(state, board_uuid)? else {
        return Err(ConductorError::EnabledWebserviceNotFound);
    };
    let fqdn = format!("{}.{}", webservice.name, enabled.fqdn());

    if board.is_online() {
        let remaining: Vec<String> = state
            .db
            .webservices
            .read_all()
            .filter(|(uuid, w)| *uuid != webservice_uuid && w.board_uuid == board_uuid)
            .map(|(_, w)| format!("{}.{}", w.name, enabled.fqdn()))
            .collect();
        dispatcher::execute_on_board(
            state,
            board_uuid,
            "UnexposeWebservice",
            json!({ "fqdn": fqdn, "dns_list": remaining.join(",") }),
            None,
        )
        .await?;

        let proxy = BusProxyGateway::new(&state.db, &state.agents);
        proxy.remove_redirect(board_uuid, &fqdn).await?;
        proxy.reload_proxy().await?;
    }

    dns_gateway.delete_record(&fqdn).await?;
    state.db.webservices.remove(&webservice_uuid)?;
    Ok(())
}
