//! Dense state-vector simulation of layered quantum circuits.
//!
//! A [`Circuit`] is a list of layers, each naming gates on qubits, possibly
//! controlled by other qubits or encoding a classical boolean function as
//! an oracle. The [`Compiler`] turns every layer into a full-width
//! [`Operator`], and the [`Simulator`] applies them in declared order and
//! answers [`MeasurementQuery`]s on the final [`QState`].
//!
//! ```
//! use layered_qsim::{Circuit, GateKind, LayerEntry, MeasurementQuery, Simulator};
//!
//! let circuit = Circuit::new(2)
//!     .gate(LayerEntry::new(GateKind::Hadamard, ["q0"]))
//!     .gate(LayerEntry::new(GateKind::Not, ["q1"]).controlled_by(["q0"]))
//!     .query(MeasurementQuery::AllProbability);
//!
//! let result = Simulator::default().run(&circuit).unwrap();
//! assert!((result.state.joint_probability("11").unwrap() - 0.5).abs() < 1e-9);
//! ```

pub mod circuit;
pub mod config;
pub mod control;
pub mod error;
pub mod gates;
pub mod operator;
pub mod oracle;
pub mod qstate;
pub mod simulator;

#[cfg(test)]
mod test_util;

use num_complex::Complex;

pub use circuit::{Circuit, CircuitLayer, Compiler, LayerEntry, MeasurementQuery, QubitMap};
pub use config::SimConfig;
pub use error::{QsimError, Result};
pub use gates::{GateKind, HadamardCache};
pub use operator::Operator;
pub use oracle::BooleanFunction;
pub use qstate::QState;
pub use simulator::{MeasurementOutcome, SimulationResult, Simulator};

pub type Qbit = Complex<f64>;

/// Largest register the dense matrices are built for.
pub const MAX_QUBITS: usize = 10;
