mod driver;
mod guard;
mod session_runtime;

pub use driver::{run_agent_turn, AgentStep, AgentTransport, TransportError, TurnError, TurnReport};
pub use guard::{FlightToken, SingleFlight, TurnPhase};
pub use session_runtime::{RuntimeOptions, SessionRuntime, TurnPermit};
