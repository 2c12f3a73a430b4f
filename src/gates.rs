use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

use nalgebra::DMatrix;
use num_complex::Complex;
use tracing::trace;

use crate::error::{QsimError, Result};
use crate::operator::Operator;
use crate::{Qbit, MAX_QUBITS};

/// The primitive gates a circuit layer can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GateKind {
    Identity,
    Not,
    Hadamard,
    PauliZ,
    Swap,
    /// Reversible encoding of the circuit's boolean function.
    Oracle,
}

impl GateKind {
    /// Whether a run of adjacent single-bit slots of this kind can be built
    /// as one multi-bit gate.
    pub fn merges_runs(self) -> bool {
        matches!(self, GateKind::Identity | GateKind::Not | GateKind::Hadamard)
    }

    /// Operator for a contiguous block of `width` bits.
    pub fn block(self, width: usize, cache: &HadamardCache) -> Result<Operator> {
        if width > cache.max_qubits() {
            return Err(QsimError::domain(width, cache.max_qubits()));
        }
        match self {
            GateKind::Identity => Ok(Operator::identity(width)),
            GateKind::Not => Ok(Operator::full_not(width)),
            GateKind::Hadamard => cache.hadamard(width),
            GateKind::PauliZ => {
                let z = Operator::pauli_z();
                Ok(Operator::tensor_all(std::iter::repeat(&z).take(width)))
            }
            GateKind::Swap if width == 2 => Ok(Operator::swap()),
            GateKind::Swap => Err(QsimError::dimension("SWAP width", 2, width)),
            GateKind::Oracle => Err(QsimError::layout(
                "an oracle block needs the circuit's boolean function",
            )),
        }
    }
}

impl FromStr for GateKind {
    type Err = QsimError;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "I" => Ok(GateKind::Identity),
            "NOT" | "X" => Ok(GateKind::Not),
            "H" => Ok(GateKind::Hadamard),
            "PAULIz" | "Z" => Ok(GateKind::PauliZ),
            "SWAP" => Ok(GateKind::Swap),
            "Uf" | "UF" | "f" => Ok(GateKind::Oracle),
            other => Err(QsimError::format(format!("unknown gate '{other}'"))),
        }
    }
}

impl Display for GateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            GateKind::Identity => "I",
            GateKind::Not => "NOT",
            GateKind::Hadamard => "H",
            GateKind::PauliZ => "PAULIz",
            GateKind::Swap => "SWAP",
            GateKind::Oracle => "Uf",
        };
        f.write_str(name)
    }
}

fn h_unscaled_matrix() -> DMatrix<Qbit> {
    let one = Complex::new(1.0, 0.0);
    DMatrix::from_row_slice(2, 2, &[one, one, one, -one])
}

/// Memo of the unscaled Hadamard matrices H₁^{⊗k} with ±1 entries.
///
/// Entry k is built from entry k-1 on first use and then kept. Each slot
/// is a [`OnceLock`], so the cache can be shared between threads.
pub struct HadamardCache {
    slots: Vec<OnceLock<DMatrix<Qbit>>>,
}

impl HadamardCache {
    pub fn new(max_qubits: usize) -> Self {
        Self {
            slots: (0..=max_qubits).map(|_| OnceLock::new()).collect(),
        }
    }

    /// Process-wide cache sized to [`MAX_QUBITS`].
    pub fn global() -> &'static HadamardCache {
        static CACHE: OnceLock<HadamardCache> = OnceLock::new();
        CACHE.get_or_init(|| HadamardCache::new(MAX_QUBITS))
    }

    pub fn max_qubits(&self) -> usize {
        self.slots.len() - 1
    }

    /// Number of entries built so far.
    pub fn populated(&self) -> usize {
        self.slots.iter().filter(|slot| slot.get().is_some()).count()
    }

    /// `num_of_qbits`-qubit Hadamard gate, 2^(-k/2) H₁^{⊗k}.
    pub fn hadamard(&self, num_of_qbits: usize) -> Result<Operator> {
        if num_of_qbits > self.max_qubits() {
            return Err(QsimError::domain(num_of_qbits, self.max_qubits()));
        }
        let factor = Complex::new(2f64.powf(-(num_of_qbits as f64) / 2.0), 0.0);
        Ok(Operator {
            matrix: self.unscaled(num_of_qbits) * factor,
        })
    }

    // Callers keep k within max_qubits.
    fn unscaled(&self, k: usize) -> &DMatrix<Qbit> {
        self.slots[k].get_or_init(|| {
            trace!("building {k}-qubit Hadamard");
            match k {
                0 => DMatrix::identity(1, 1),
                1 => h_unscaled_matrix(),
                _ => self.unscaled(k - 1).kronecker(self.unscaled(1)),
            }
        })
    }
}
