//! `create_port_on_board` / `remove_vif_from_board`: attach
//! and detach a virtual network interface, tunnelled through a socat TCP
//! port in `[10000, 20000]` (`state.socat_ports`, distinct from the public
//! service-exposure port pool).

use std::net::IpAddr;

use iotronic_common::ids::{BoardUuid, PortUuid};
use iotronic_common::state::Port;
use serde_json::json;
use tarpc::context;

use super::{board_client, require_online};
use crate::dispatcher;
use crate::error::ConductorError;
use crate::state::GlobalState;

/// Allocates a socat port, dispatches `Create_VIF(tcp_port)`, asks the
/// agent to `create_tap_interface`, persists the `Port` row, then
/// dispatches `Configure_VIF(port, cidr_prefix_len)`.
pub async fn create_port_on_board(
    state: &GlobalState,
    board_uuid: BoardUuid,
    vif_name: &str,
    mac: &str,
    ip: IpAddr,
    network: &str,
    cidr_prefix_len: u8,
) -> Result<Port, ConductorError> {
    let board = require_online(state, board_uuid)?;

    let tcp_port = state
        .socat_ports
        .allocate()
        .await
        .map_err(|_| ConductorError::NotEnoughPortForService)?;

    if let Err(e) = dispatcher::execute_on_board(state, board_uuid, "Create_VIF", json!({ "tcp_port": tcp_port }), None).await {
        state.socat_ports.release(tcp_port).await;
        return Err(e);
    }

    if let Ok(client) = board_client(state, &board) {
        if let Err(e) = client
            .create_tap_interface(context::current(), board_uuid, tcp_port)
            .await
        {
            state.socat_ports.release(tcp_port).await;
            return Err(ConductorError::Dispatch(
                iotronic_common::rpc::error::DispatchError::Transport(e.to_string()),
            ));
        }
    }

    let port = Port {
        uuid: PortUuid::new(),
        vif_name: vif_name.to_string(),
        mac: mac.to_string(),
        ip,
        network: network.to_string(),
        board_uuid,
    };
    state.db.ports.insert(&port.uuid, &port)?;
    state.set_socat_assignment(port.uuid, tcp_port);

    dispatcher::execute_on_board(
        state,
        board_uuid,
        "Configure_VIF",
        json!({ "port": port.vif_name, "cidr_prefix_len": cidr_prefix_len }),
        None,
    )
    .await?;

    Ok(port)
}

/// Reverses `create_port_on_board`: dispatches `Remove_VIF(vif_name)`,
/// releases the socat port, then deletes the row.
pub async fn remove_vif_from_board(state: &GlobalState, port_uuid: PortUuid) -> Result<(), ConductorError> {
    let port = state
        .db
        .ports
        .get(&port_uuid)?
        .ok_or_else(|| ConductorError::PortNotFound(port_uuid.to_string()))?;

    require_online(state, port.board_uuid)?;
    dispatcher::execute_on_board(
        state,
        port.board_uuid,
        "Remove_VIF",
        json!({ "vif_name": port.vif_name }),
        None,
    )
    .await?;

    if let Some(tcp_port) = state.clear_socat_assignment(port_uuid) {
        state.socat_ports.release(tcp_port).await;
    }
    state.db.ports.remove(&port_uuid)?;
    Ok(())
}
