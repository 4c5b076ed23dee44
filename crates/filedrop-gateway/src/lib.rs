pub mod connection;
pub mod dispatcher;
pub mod pending;
pub mod rate_limit;
pub mod registry;

pub use connection::{GatewayState, handle_connection};
pub use dispatcher::Dispatcher;
pub use pending::PendingJoins;
pub use rate_limit::{PayloadGuard, RateLimiter};
pub use registry::{CreateOutcome, JoinOutcome, RoomRegistry, run_sweep_loop};
