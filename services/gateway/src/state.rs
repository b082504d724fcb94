use persistence::GlobalLeaderboardStore;
use session::SessionHandle;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    /// The one game session served by this process
    pub session: SessionHandle,
    pub leaderboard: Arc<GlobalLeaderboardStore>,
}

impl AppState {
    pub fn new(session: SessionHandle, leaderboard: Arc<GlobalLeaderboardStore>) -> Self {
        Self {
            session,
            leaderboard,
        }
    }
}
