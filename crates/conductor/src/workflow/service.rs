//! `create_service`, `update_service`, `destroy_service`, `action_service`,
//! `restore_services_on_board`.

use iotronic_common::ids::{BoardUuid, ExposedServiceUuid, ServiceUuid};
use iotronic_common::state::{ExposedService, Service, ServiceAction, ServiceProtocol};
use serde_json::json;
use tarpc::context;

use super::{board_client, require_online};
use crate::dispatcher;
use crate::error::ConductorError;
use crate::state::GlobalState;

pub async fn create_service(
    state: &GlobalState,
    name: &str,
    protocol: ServiceProtocol,
    port: u16,
) -> Result<Service, ConductorError> {
    let service = Service {
        uuid: ServiceUuid::new(),
        name: name.to_string(),
        protocol,
        port,
    };
    state.db.services.insert(&service.uuid, &service)?;
    Ok(service)
}

pub async fn update_service(
    state: &GlobalState,
    service_uuid: ServiceUuid,
    name: Option<String>,
    port: Option<u16>,
) -> Result<Service, ConductorError> {
    let mut service = state
        .db
        .services
        .get(&service_uuid)?
        .ok_or_else(|| ConductorError::ServiceNotFound(service_uuid.to_string()))?;
    if let Some(name) = name {
        service.name = name;
    }
    if let Some(port) = port {
        service.port = port;
    }
    state.db.services.insert(&service_uuid, &service)?;
    Ok(service)
}

pub async fn destroy_service(state: &GlobalState, service_uuid: ServiceUuid) -> Result<(), ConductorError> {
    state
        .db
        .services
        .get(&service_uuid)?
        .ok_or_else(|| ConductorError::ServiceNotFound(service_uuid.to_string()))?;
    state.db.services.remove(&service_uuid)?;
    Ok(())
}

fn find_exposed(
    state: &GlobalState,
    board_uuid: BoardUuid,
    service_uuid: ServiceUuid,
) -> Result<Option<(ExposedServiceUuid, ExposedService)>, ConductorError> {
    Ok(state
        .db
        .exposed_services
        .read_all()
        .find(|(_, svc)| svc.board_uuid == board_uuid && svc.service_uuid == service_uuid))
}

/// Online precondition; `action ∈ {ServiceEnable, ServiceDisable,
/// ServiceRestore}`
pub async fn action_service(
    state: &GlobalState,
    board_uuid: BoardUuid,
    service_uuid: ServiceUuid,
    action: ServiceAction,
) -> Result<(), ConductorError> {
    let board = require_online(state, board_uuid)?;
    let service = state
        .db
        .services
        .get(&service_uuid)?
        .ok_or_else(|| ConductorError::ServiceNotFound(service_uuid.to_string()))?;

    match action {
        ServiceAction::ServiceEnable => {
            if find_exposed(state, board_uuid, service_uuid)?.is_some() {
                return Err(ConductorError::ServiceAlreadyExposed);
            }
            let public_port = state
                .ports
                .allocate()
                .await
                .map_err(|_| ConductorError::NotEnoughPortForService)?;

            if let Ok(client) = board_client(state, &board) {
                if let Err(e) = client
                    .addin_allowlist(context::current(), board_uuid, public_port)
                    .await
                {
                    state.ports.release(public_port).await;
                    return Err(ConductorError::Dispatch(
                        iotronic_common::rpc::error::DispatchError::Transport(e.to_string()),
                    ));
                }
            }

            if let Err(e) = dispatcher::execute_on_board(
                state,
                board_uuid,
                action.as_str(),
                json!({ "service": service.name, "public_port": public_port }),
                None,
            )
            .await
            {
                state.ports.release(public_port).await;
                return Err(e);
            }

            let exposed = ExposedService {
                uuid: ExposedServiceUuid::new(),
                board_uuid,
                service_uuid,
                public_port,
            };
            state.db.exposed_services.insert(&exposed.uuid, &exposed)?;
            Ok(())
        }
        ServiceAction::ServiceDisable => {
            let Some((uuid, exposed)) = find_exposed(state, board_uuid, service_uuid)? else {
                return Err(ConductorError::ExposedServiceNotFound(service_uuid.to_string()));
            };
            dispatcher::execute_on_board(
                state,
                board_uuid,
                action.as_str(),
                json!({ "service": service.name }),
                None,
            )
            .await?;
            state.ports.release(exposed.public_port).await;
            state.db.exposed_services.remove(&uuid)?;
            if let Ok(client) = board_client(state, &board) {
                let _ = client
                    .remove_from_allowlist(context::current(), board_uuid, exposed.public_port)
                    .await;
            }
            Ok(())
        }
        ServiceAction::ServiceRestore => {
            let Some((_, exposed)) = find_exposed(state, board_uuid, service_uuid)? else {
                return Err(ConductorError::ExposedServiceNotFound(service_uuid.to_string()));
            };
            dispatcher::execute_on_board(
                state,
                board_uuid,
                action.as_str(),
                json!({ "service": service.name, "public_port": exposed.public_port }),
                None,
            )
            .await?;
            Ok(())
        }
    }
}

pub async fn restore_services_on_board(state: &GlobalState, board_uuid: BoardUuid) -> Result<(), ConductorError> {
    require_online(state, board_uuid)?;
    let exposed: Vec<_> = state
        .db
        .exposed_services
        .read_all()
        .filter(|(_, svc)| svc.board_uuid == board_uuid)
        .collect();
    for (_, exposed) in exposed {
        let Some(service) = state.db.services.get(&exposed.service_uuid)? else {
            continue;
        };
        dispatcher::execute_on_board(
            state,
            board_uuid,
            "ServiceRestore",
            json!({ "service": service.name, "public_port": exposed.public_port }),
            None,
        )
        .await?;
    }
    Ok(())
}
