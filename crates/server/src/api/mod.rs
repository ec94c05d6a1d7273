pub mod audit;
pub mod counters;
pub mod display;
pub mod handlers;
pub mod middleware;
pub mod queue;
pub mod routes;
pub mod services;
pub mod stats;
pub mod tickets;
pub mod users;
pub mod ws;

pub use routes::create_router;
pub use ws::{WsBroadcaster, WsMessage};
