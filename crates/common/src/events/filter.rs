use serde::Deserialize;

use super::Event;
use crate::ids::{BoardUuid, RequestUuid};

/// A flat event subscription filter, built from `GET /api/v1/events` query
/// params. Every set field must match; an unset field matches anything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub board: Option<BoardUuid>,
    pub request: Option<RequestUuid>,
}

impl EventFilter {
    pub fn matches(&self, event: &Event) -> bool {
        if let Some(board) = self.board {
            if event.board != Some(board) {
                return false;
            }
        }
        if let Some(request) = self.request {
            if event.request != Some(request) {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;
    use crate::events::EventKind;

    #[test]
    fn empty_filter_matches_everything() {
        let event = Event::new(Utc::now(), EventKind::BoardOnline).with_board(BoardUuid::new());
        assert!(EventFilter::default().matches(&event));
    }

    #[test]
    fn board_filter_excludes_other_boards() {
        let board = BoardUuid::new();
        let event = Event::new(Utc::now(), EventKind::BoardOnline).with_board(BoardUuid::new());
        let filter = EventFilter {
            board: Some(board),
            request: None,
        };
        assert!(!filter.matches(&event));
    }
}
