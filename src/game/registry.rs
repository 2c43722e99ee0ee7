//! Room registry
//!
//! Owns every live [`RoomState`]. Each room sits behind its own async mutex so
//! one room's event handling (including slow oracle calls) never blocks
//! another room; the outer map lock is only held for lookups.

use crate::game::room::RoomState;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Shared handle to one room
pub type RoomHandle = Arc<Mutex<RoomState>>;

/// Mapping from room id to owned room state
#[derive(Debug, Default)]
pub struct RoomRegistry {
    rooms: RwLock<HashMap<String, RoomHandle>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a room
    pub fn get(&self, room_id: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().unwrap_or_else(|e| e.into_inner());
        rooms.get(room_id).cloned()
    }

    /// Look up a room, creating it in `WAITING` if absent
    pub fn get_or_create(&self, room_id: &str, now: DateTime<Utc>) -> RoomHandle {
        if let Some(room) = self.get(room_id) {
            return room;
        }

        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        rooms
            .entry(room_id.to_string())
            .or_insert_with(|| {
                info!(room_id, "room created");
                Arc::new(Mutex::new(RoomState::new(room_id, now)))
            })
            .clone()
    }

    /// Discard a room
    pub fn remove(&self, room_id: &str) -> Option<RoomHandle> {
        let mut rooms = self.rooms.write().unwrap_or_else(|e| e.into_inner());
        let removed = rooms.remove(room_id);
        if removed.is_some() {
            debug!(room_id, "room discarded");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.rooms.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of all live rooms, sorted
    pub fn room_ids(&self) -> Vec<String> {
        let rooms = self.rooms.read().unwrap_or_else(|e| e.into_inner());
        let mut ids: Vec<String> = rooms.keys().cloned().collect();
        ids.sort();
        ids
    }
}
