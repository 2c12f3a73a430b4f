use nalgebra::DMatrix;

use crate::error::{QsimError, Result};
use crate::operator::Operator;
use crate::qstate::bit_is_set;
use crate::MAX_QUBITS;

/// Builds the `bits`-qubit operator that applies `gate` at bit `target`
/// when every bit in `control` is 1, and leaves the basis state alone
/// otherwise.
///
/// The gate is first placed as `I(target) ⊗ gate ⊗ I(rest)`. Column `x` of
/// the result is that operator's column `x` if all control bits of label
/// `x` are set, else the unit vector `e_x`. An empty `control` is always
/// satisfied, giving the plain placed gate.
///
/// Bit 0 is the most significant (leftmost) bit of a basis label.
pub fn controlled(
    gate: &Operator,
    bits: usize,
    target: usize,
    control: &[usize],
) -> Result<Operator> {
    if bits > MAX_QUBITS {
        return Err(QsimError::domain(bits, MAX_QUBITS));
    }
    let width = gate.num_of_qbits();
    if target + width > bits {
        return Err(QsimError::dimension(
            "controlled gate placement",
            bits,
            target + width,
        ));
    }
    if let Some(&c) = control.iter().find(|&&c| c >= bits) {
        return Err(QsimError::dimension("control bit", bits, c + 1));
    }
    if let Some(&c) = control.iter().find(|&&c| (target..target + width).contains(&c)) {
        return Err(QsimError::layout(format!(
            "control bit {c} lies inside the target block {target}..{}",
            target + width
        )));
    }

    let placed = Operator::tensor_all([
        &Operator::identity(target),
        gate,
        &Operator::identity(bits - target - width),
    ]);

    let dim = 1 << bits;
    let mut matrix = DMatrix::identity(dim, dim);
    for index in 0..dim {
        if control.iter().all(|&c| bit_is_set(index, bits, c)) {
            matrix.set_column(index, &placed.matrix.column(index));
        }
    }

    Ok(Operator { matrix })
}

/// Bit 0 controlling a NOT on bit 1.
pub fn cnot() -> Result<Operator> {
    controlled(&Operator::full_not(1), 2, 1, &[0])
}

/// Bits 0 and 1 controlling a NOT on bit 2.
pub fn toffoli() -> Result<Operator> {
    controlled(&Operator::full_not(1), 3, 2, &[0, 1])
}
