//! Declarative GitHub API simulator scenarios and the process that serves them.
//!
//! - [`scenario`]: entity models, validation, token resolution, composition.
//! - [`sim_config`]: the simulator's JSON configuration and raw-config parsing.
//! - [`orchestration`]: spawning, handshaking with, and stopping the simulator.
//! - [`session`]: a started simulator plus an authenticated HTTP client.

pub mod error;
pub mod orchestration;
pub mod scenario;
pub mod session;
pub mod sim_config;

pub use error::{ProcessError, SessionError, ValidationError};
pub use orchestration::{
    start_sim_process, stop_sim_process, SimulatorProcess, SimulatorState, StartOptions,
};
pub use scenario::{merge_scenarios, Scenario};
pub use session::{SimClient, SimSource, SimulatorSession};
pub use sim_config::SimConfig;
