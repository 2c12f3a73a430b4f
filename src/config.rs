use crate::error::{QsimError, Result};
use crate::MAX_QUBITS;

/// Settings for a [`Simulator`](crate::simulator::Simulator) run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Largest circuit the simulator accepts. Never above [`MAX_QUBITS`].
    pub max_qubits: usize,

    /// Allowed drift of the state norm from 1 before it is reported.
    pub tolerance: f64,

    /// Seed for sampled measurements. `None` draws a seed from the OS.
    pub seed: Option<u64>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            max_qubits: MAX_QUBITS,
            tolerance: 1e-9,
            seed: None,
        }
    }
}

impl SimConfig {
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_qubits == 0 || self.max_qubits > MAX_QUBITS {
            return Err(QsimError::domain(self.max_qubits, MAX_QUBITS));
        }
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(QsimError::format(format!(
                "tolerance must be positive, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}
