//! Maps board <-> bus-session id; invalidates superseded sessions and
//! reconciles against a bus agent's live session list on reconnect.

use chrono::{DateTime, Utc};
use iotronic_common::ids::{BoardUuid, BusAgentHostname, SessionId};
use iotronic_common::rpc::bus::ConnectionInfo;
use iotronic_common::state::{Board, BoardStatus, Session};

use crate::db::Database;

/// Invalidates the board's current valid session (if any) and creates a new
/// one, merging connection info and flipping the board online. Returns the
/// updated board. Callers must hold the per-board lock across this call
/// (§5 concurrency model).
pub fn on_connection(
    db: &Database,
    board: &mut Board,
    session_id: SessionId,
    agent: BusAgentHostname,
    info: ConnectionInfo,
    now: DateTime<Utc>,
) -> Result<(), iotronic_common::db::DatabaseError> {
    invalidate_current_session(db, board.uuid)?;

    db.sessions.insert(
        &session_id,
        &Session {
            session_id,
            board_uuid: board.uuid,
            valid: true,
        },
    )?;

    board.status = BoardStatus::Online;
    board.agent = Some(agent);
    board.updated_at = now;
    if let Some(v) = info.lr_version {
        board.lr_version = Some(v);
    }
    if let Some(mac) = info.mac_addr {
        board.connectivity.mac_addr = Some(mac);
    }
    if let Some(kind) = info.connectivity_type {
        board.connectivity.kind = Some(kind);
    }
    db.boards.insert(&board.uuid, board)?;
    Ok(())
}

/// `session.on_leave(session_id)`: if the session is valid, invalidate it
/// and mark the referenced board offline. No-op if already invalid or
/// unknown.
pub fn on_leave(
    db: &Database,
    session_id: SessionId,
    now: DateTime<Utc>,
) -> Result<(), iotronic_common::db::DatabaseError> {
    let Some(mut session) = db.sessions.get(&session_id)? else {
        return Ok(());
    };
    if !session.valid {
        return Ok(());
    }
    session.valid = false;
    db.sessions.insert(&session_id, &session)?;

    if let Some(mut board) = db.boards.get(&session.board_uuid)? {
        board.status = BoardStatus::Offline;
        board.agent = None;
        board.updated_at = now;
        db.boards.insert(&board.uuid, &board)?;
    }
    Ok(())
}

/// Called once per bus-agent (re)connection: any DB session on this agent
/// that is still `valid=true` but absent from the broker's live session
/// list is stale and is invalidated, offlining its board.
pub fn reconcile(
    db: &Database,
    live_ids: &[SessionId],
    agent_host: &BusAgentHostname,
    now: DateTime<Utc>,
) -> Result<(), iotronic_common::db::DatabaseError> {
    for (session_id, session) in db.sessions.read_all().collect::<Vec<_>>() {
        if !session.valid || live_ids.contains(&session_id) {
            continue;
        }
        let Some(board) = db.boards.get(&session.board_uuid)? else {
            continue;
        };
        if board.agent.as_ref() != Some(agent_host) {
            continue;
        }
        on_leave(db, session_id, now)?;
    }
    Ok(())
}

/// Invalidates the board's current valid session, if any, without creating
/// a replacement. Shared with the onboarding service, which inserts its own
/// session row afterward rather than going through `on_connection` (a
/// freshly registered board stays `OFFLINE`, not `ONLINE`).
pub(crate) fn invalidate_current_session(
    db: &Database,
    board_uuid: BoardUuid,
) -> Result<(), iotronic_common::db::DatabaseError> {
    for (id, mut session) in db.sessions.read_all().collect::<Vec<_>>() {
        if session.board_uuid == board_uuid && session.valid {
            session.valid = false;
            db.sessions.insert(&id, &session)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use iotronic_common::ids::BusAgentHostname;
    use iotronic_common::rpc::bus::ConnectionInfo;
    use iotronic_common::state::Board;

    use super::*;
    use crate::db::Database;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().expect("tempdir");
        let db = Database::open(dir.path()).expect("open database");
        (dir, db)
    }

    fn agent(host: &str) -> (BusAgentHostname, ConnectionInfo) {
        (BusAgentHostname::new(host), ConnectionInfo::default())
    }

    #[test]
    fn reconnect_invalidates_the_prior_session() {
        let (_dir, db) = test_db();
        let mut board = Board::new("board-1".into(), "code-1".into(), Utc::now());
        db.boards.insert(&board.uuid, &board).unwrap();

        let (host, info) = agent("agent-a");
        on_connection(&db, &mut board, SessionId(1), host.clone(), info.clone(), Utc::now()).unwrap();
        let first = db.sessions.get(&SessionId(1)).unwrap().unwrap();
        assert!(first.valid);

        on_connection(&db, &mut board, SessionId(2), host, info, Utc::now()).unwrap();
        let first_after = db.sessions.get(&SessionId(1)).unwrap().unwrap();
        let second = db.sessions.get(&SessionId(2)).unwrap().unwrap();
        assert!(!first_after.valid, "superseded session must be invalidated");
        assert!(second.valid);
        assert_eq!(board.status, BoardStatus::Online);
    }

    #[test]
    fn on_leave_offlines_the_board_once() {
        let (_dir, db) = test_db();
        let mut board = Board::new("board-2".into(), "code-2".into(), Utc::now());
        db.boards.insert(&board.uuid, &board).unwrap();
        let (host, info) = agent("agent-b");
        on_connection(&db, &mut board, SessionId(7), host, info, Utc::now()).unwrap();

        on_leave(&db, SessionId(7), Utc::now()).unwrap();
        let board = db.boards.get(&board.uuid).unwrap().unwrap();
        assert_eq!(board.status, BoardStatus::Offline);
        assert!(board.agent.is_none());

        // Second call on an already-invalid session is a no-op, not an error.
        on_leave(&db, SessionId(7), Utc::now()).unwrap();
    }

    #[test]
    fn reconcile_only_touches_sessions_on_the_given_agent() {
        let (_dir, db) = test_db();
        let mut board_a = Board::new("board-a".into(), "code-a".into(), Utc::now());
        let mut board_b = Board::new("board-b".into(), "code-b".into(), Utc::now());
        db.boards.insert(&board_a.uuid, &board_a).unwrap();
        db.boards.insert(&board_b.uuid, &board_b).unwrap();

        let (host_a, info) = agent("agent-shared");
        on_connection(&db, &mut board_a, SessionId(10), host_a.clone(), info.clone(), Utc::now()).unwrap();
        on_connection(&db, &mut board_b, SessionId(11), host_a.clone(), info, Utc::now()).unwrap();

        // Agent reconnects reporting only session 10 as still live.
        reconcile(&db, &[SessionId(10)], &host_a, Utc::now()).unwrap();

        let session_10 = db.sessions.get(&SessionId(10)).unwrap().unwrap();
        let session_11 = db.sessions.get(&SessionId(11)).unwrap().unwrap();
        assert!(session_10.valid, "live session must survive reconcile");
        assert!(!session_11.valid, "absent session must be invalidated");

        let board_b = db.boards.get(&board_b.uuid).unwrap().unwrap();
        assert_eq!(board_b.status, BoardStatus::Offline);
    }
}
