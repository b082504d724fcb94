pub mod leaderboard;
pub mod stocks;
pub mod ws;
