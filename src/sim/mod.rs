/// Single-writer task owning the simulator.
#[cfg(feature = "api")]
pub mod actor;
/// Simulation clock for tick timestamps and local wall-clock rendering.
pub mod clock;
pub mod history;
pub mod simulator;
pub mod summary;
pub mod types;
/// Export budget and runtime alert.
pub mod usage;

pub use simulator::{PowerSimulator, SimCommand, SimulatorSnapshot};
pub use types::{
    BatterySnapshot, BatterySpec, Channel, SimConfig, Terminal, TerminalSpec, TickReport,
};
