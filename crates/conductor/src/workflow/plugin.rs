//! `create_plugin`, `update_plugin`, `destroy_plugin`, `inject`, `remove`,
//! `action`. Plugin code is stored as a byte-serialized payload; `inject`
//! is idempotent on an existing `InjectionPlugin` row.

use iotronic_common::ids::{BoardUuid, PluginUuid};
use iotronic_common::rpc::bus::DispatchOutcome;
use iotronic_common::state::{InjectionPlugin, InjectionStatus, Plugin, PluginAction};
use serde_json::{json, Value as Json};

use super::require_online;
use crate::dispatcher;
use crate::error::ConductorError;
use crate::state::GlobalState;

pub async fn create_plugin(
    state: &GlobalState,
    name: &str,
    owner: &str,
    code: Vec<u8>,
    public: bool,
    callable: bool,
    parameters: Json,
) -> Result<Plugin, ConductorError> {
    let plugin = Plugin {
        uuid: PluginUuid::new(),
        name: name.to_string(),
        owner: owner.to_string(),
        code,
        public,
        callable,
        parameters,
    };
    state.db.plugins.insert(&plugin.uuid, &plugin)?;
    Ok(plugin)
}

pub async fn update_plugin(
    state: &GlobalState,
    plugin_uuid: PluginUuid,
    code: Option<Vec<u8>>,
    public: Option<bool>,
    callable: Option<bool>,
    parameters: Option<Json>,
) -> Result<Plugin, ConductorError> {
    let mut plugin = state
        .db
        .plugins
        .get(&plugin_uuid)?
        .ok_or_else(|| ConductorError::PluginNotFound(plugin_uuid.to_string()))?;
    if let Some(code) = code {
        plugin.code = code;
    }
    if let Some(public) = public {
        plugin.public = public;
    }
    if let Some(callable) = callable {
        plugin.callable = callable;
    }
    if let Some(parameters) = parameters {
        plugin.parameters = parameters;
    }
    state.db.plugins.insert(&plugin_uuid, &plugin)?;
    Ok(plugin)
}

pub async fn destroy_plugin(state: &GlobalState, plugin_uuid: PluginUuid) -> Result<(), ConductorError> {
    state
        .db
        .plugins
        .get(&plugin_uuid)?
        .ok_or_else(|| ConductorError::PluginNotFound(plugin_uuid.to_string()))?;

    for (key, _) in state
        .db
        .injections
        .read_all()
        .filter(|((_, p), _)| *p == plugin_uuid)
        .collect::<Vec<_>>()
    {
        state.db.injections.remove(&key)?;
    }
    state.db.plugins.remove(&plugin_uuid)?;
    Ok(())
}

/// Dispatches `PluginInject(plugin, onboot)`, then upserts the
/// `InjectionPlugin` row: `status=Updated` if one already exists for this
/// `(board, plugin)` pair, otherwise a fresh row with `status=Injected`.
pub async fn inject(
    state: &GlobalState,
    board_uuid: BoardUuid,
    plugin_uuid: PluginUuid,
    onboot: bool,
) -> Result<(), ConductorError> {
    require_online(state, board_uuid)?;
    let plugin = state
        .db
        .plugins
        .get(&plugin_uuid)?
        .ok_or_else(|| ConductorError::PluginNotFound(plugin_uuid.to_string()))?;

    dispatcher::execute_on_board(
        state,
        board_uuid,
        "PluginInject",
        json!({ "plugin": plugin.name, "onboot": onboot }),
        None,
    )
    .await?;

    let key = (board_uuid, plugin_uuid);
    let status = if state.db.injections.contains(&key)? {
        InjectionStatus::Updated
    } else {
        InjectionStatus::Injected
    };
    state.db.injections.insert(
        &key,
        &InjectionPlugin {
            board_uuid,
            plugin_uuid,
            onboot,
            status,
        },
    )?;
    Ok(())
}

pub async fn remove(state: &GlobalState, board_uuid: BoardUuid, plugin_uuid: PluginUuid) -> Result<(), ConductorError> {
    require_online(state, board_uuid)?;
    dispatcher::execute_on_board(
        state,
        board_uuid,
        "PluginRemove",
        json!({ "plugin_uuid": plugin_uuid }),
        None,
    )
    .await?;
    state.db.injections.remove(&(board_uuid, plugin_uuid))?;
    Ok(())
}

pub async fn action(
    state: &GlobalState,
    board_uuid: BoardUuid,
    plugin_uuid: PluginUuid,
    action: PluginAction,
) -> Result<DispatchOutcome, ConductorError> {
    require_online(state, board_uuid)?;
    let (_, outcome) = dispatcher::execute_on_board(
        state,
        board_uuid,
        action.as_str(),
        json!({ "plugin_uuid": plugin_uuid }),
        None,
    )
    .await?;
    Ok(outcome)
}
