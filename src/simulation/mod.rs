mod signal;
mod source;

pub use signal::{SimulationConfig, ToneConfig, generate_iq, to_cs16};
pub use source::SimulatedSource;
