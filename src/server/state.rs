use axum::extract::FromRef;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use crate::ministry_platform::MinistryPlatformClient;
use crate::schedule::ScheduleStore;
use crate::user::UserStore;

use super::ServerConfig;

pub type SharedUserStore = Arc<dyn UserStore>;
pub type SharedScheduleStore = Arc<dyn ScheduleStore>;

#[derive(Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub start_time: Instant,
    pub user_store: SharedUserStore,
    pub schedule_store: SharedScheduleStore,
    pub event_source: Arc<MinistryPlatformClient>,
    pub tracked_rooms: Arc<BTreeMap<i64, String>>,
}

impl FromRef<ServerState> for SharedUserStore {
    fn from_ref(input: &ServerState) -> Self {
        input.user_store.clone()
    }
}

impl FromRef<ServerState> for SharedScheduleStore {
    fn from_ref(input: &ServerState) -> Self {
        input.schedule_store.clone()
    }
}

impl FromRef<ServerState> for ServerConfig {
    fn from_ref(input: &ServerState) -> Self {
        input.config.clone()
    }
}
