use std::fmt::Display;

use nalgebra::DMatrix;
use nalgebra_sparse::convert::serial::convert_coo_dense;
use nalgebra_sparse::coo::CooMatrix;
use num_complex::Complex;

use crate::error::{QsimError, Result};
use crate::qstate::QState;
use crate::Qbit;

/// Unitary transform on k qubits, stored as a dense 2^k x 2^k matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    pub(crate) matrix: DMatrix<Qbit>,
}

/// Right-hand side of [`Operator::act`].
pub enum Operand<'a> {
    Scalar(Qbit),
    Operator(&'a Operator),
    State(&'a QState),
}

/// Result of [`Operator::act`].
#[derive(Debug, Clone, PartialEq)]
pub enum Product {
    Operator(Operator),
    State(QState),
}

impl Operator {
    pub fn new(matrix: DMatrix<Qbit>) -> Result<Self> {
        if matrix.nrows() != matrix.ncols() {
            return Err(QsimError::dimension(
                "operator columns",
                matrix.nrows(),
                matrix.ncols(),
            ));
        }
        if !matrix.nrows().is_power_of_two() {
            return Err(QsimError::format(format!(
                "operator side must be a power of 2, got {}",
                matrix.nrows()
            )));
        }
        Ok(Self { matrix })
    }

    /// Builds a permutation operator from `(row, col)` pairs of ones.
    pub(crate) fn from_permutation(
        dim: usize,
        ones: impl IntoIterator<Item = (usize, usize)>,
    ) -> Self {
        let mut coo = CooMatrix::new(dim, dim);
        for (row, col) in ones {
            coo.push(row, col, Complex::new(1.0, 0.0));
        }
        Self {
            matrix: convert_coo_dense(&coo),
        }
    }

    pub fn identity(num_of_qbits: usize) -> Self {
        let dim = 1 << num_of_qbits;
        Self {
            matrix: DMatrix::identity(dim, dim),
        }
    }

    /// Flips all k bits at once: |x> -> |~x>, the antidiagonal matrix.
    pub fn full_not(num_of_qbits: usize) -> Self {
        let dim = 1 << num_of_qbits;
        Self::from_permutation(dim, (0..dim).map(|i| (i, dim - 1 - i)))
    }

    pub fn pauli_z() -> Self {
        let mut z_coo = CooMatrix::new(2, 2);
        z_coo.push(0, 0, Complex::new(1.0, 0.0));
        z_coo.push(1, 1, Complex::new(-1.0, 0.0));
        Self {
            matrix: convert_coo_dense(&z_coo),
        }
    }

    /// Exchanges two adjacent qubits.
    pub fn swap() -> Self {
        Self::from_permutation(4, [(0, 0), (1, 2), (2, 1), (3, 3)])
    }

    pub fn matrix(&self) -> &DMatrix<Qbit> {
        &self.matrix
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn num_of_qbits(&self) -> usize {
        self.dim().ilog2() as usize
    }

    /// Matrix product `self * rhs`, i.e. `rhs` acts first.
    pub fn compose(&self, rhs: &Operator) -> Result<Operator> {
        if self.matrix.ncols() != rhs.matrix.nrows() {
            return Err(QsimError::dimension(
                "compose",
                self.matrix.ncols(),
                rhs.matrix.nrows(),
            ));
        }
        Ok(Operator {
            matrix: &self.matrix * &rhs.matrix,
        })
    }

    /// Applies the operator to a state. The result is not renormalized.
    pub fn apply(&self, state: &QState) -> Result<QState> {
        if self.matrix.ncols() != state.dim() {
            return Err(QsimError::dimension(
                "apply",
                self.matrix.ncols(),
                state.dim(),
            ));
        }
        Ok(QState::from_vector(&self.matrix * &state.state))
    }

    pub fn scale(&self, c: Qbit) -> Operator {
        Operator {
            matrix: &self.matrix * c,
        }
    }

    /// Kronecker product, `self` acting on the most significant bits.
    pub fn tensor(&self, rhs: &Operator) -> Operator {
        Operator {
            matrix: self.matrix.kronecker(&rhs.matrix),
        }
    }

    /// Kronecker product of all operators in order. Empty input gives the
    /// 1x1 identity.
    pub fn tensor_all<'a>(ops: impl IntoIterator<Item = &'a Operator>) -> Operator {
        ops.into_iter()
            .fold(Operator::identity(0), |acc, op| acc.tensor(op))
    }

    /// Integer matrix power (not a tensor power).
    pub fn power(&self, exponent: u32) -> Result<Operator> {
        let mut result = Operator::identity(self.num_of_qbits());
        let mut base = self.clone();
        let mut exponent = exponent;
        while exponent > 0 {
            if exponent & 1 == 1 {
                result = result.compose(&base)?;
            }
            exponent >>= 1;
            if exponent > 0 {
                base = base.compose(&base)?;
            }
        }
        Ok(result)
    }

    /// Explicit dispatch of the three kinds of multiplication.
    pub fn act(&self, operand: Operand<'_>) -> Result<Product> {
        match operand {
            Operand::Scalar(c) => Ok(Product::Operator(self.scale(c))),
            Operand::Operator(rhs) => self.compose(rhs).map(Product::Operator),
            Operand::State(state) => self.apply(state).map(Product::State),
        }
    }

    /// Square and U†U = I within `tolerance`. Meant for assertions.
    pub fn is_valid(&self, tolerance: f64) -> bool {
        if self.matrix.nrows() != self.matrix.ncols() {
            return false;
        }
        let product = self.matrix.adjoint() * &self.matrix;
        let identity = DMatrix::<Qbit>::identity(self.dim(), self.dim());
        product
            .iter()
            .zip(identity.iter())
            .all(|(a, b)| (a - b).norm() <= tolerance)
    }

    pub fn approx_eq(&self, other: &Operator, tolerance: f64) -> bool {
        self.matrix.shape() == other.matrix.shape()
            && self
                .matrix
                .iter()
                .zip(other.matrix.iter())
                .all(|(a, b)| (a - b).norm() <= tolerance)
    }

    /// Real parts as a LaTeX `bmatrix`.
    pub fn latex(&self) -> String {
        let mut latex = String::from("\\begin{bmatrix}\n");
        for row in self.matrix.row_iter() {
            let cells = row
                .iter()
                .map(|value| format!("{}", value.re))
                .collect::<Vec<_>>();
            latex.push_str(&format!("  {} \\\\\n", cells.join(" & ")));
        }
        latex.push_str("\\end{bmatrix}");
        latex
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for row in self.matrix.row_iter() {
            write!(f, "|")?;
            for value in row.iter() {
                write!(f, " {:6.3}", value.re)?;
                if value.im != 0.0 {
                    write!(f, "{:+.3}i", value.im)?;
                }
            }
            writeln!(f, " |")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nalgebra::DMatrix;

    use super::*;
    use crate::assert_approx_complex_eq;

    fn c(re: f64) -> Qbit {
        Complex::new(re, 0.0)
    }

    #[test]
    fn test_new_rejects_non_square() {
        let matrix = DMatrix::from_element(2, 4, c(0.0));
        assert!(matches!(
            Operator::new(matrix),
            Err(QsimError::Dimension { .. })
        ));

        let matrix = DMatrix::identity(3, 3);
        assert!(matches!(Operator::new(matrix), Err(QsimError::Format(_))));
    }

    #[test]
    fn test_full_not() {
        let not = Operator::full_not(2);
        let result = not.apply(&QState::from_str("01").unwrap()).unwrap();
        assert_eq!(QState::from_str("10").unwrap(), result);

        for n in 1..=5 {
            let not = Operator::full_not(n);
            assert!(not.is_valid(1e-12));
            assert!(not.compose(&not).unwrap().approx_eq(&Operator::identity(n), 1e-12));
        }
    }

    #[test]
    fn test_full_not_is_tensor_of_single_nots() {
        let single = Operator::full_not(1);
        let expected = Operator::tensor_all([&single, &single, &single]);
        assert_eq!(expected, Operator::full_not(3));
    }

    #[test]
    fn test_swap() {
        let swap = Operator::swap();
        assert!(swap.is_valid(1e-12));
        let result = swap.apply(&QState::from_str("01").unwrap()).unwrap();
        assert_eq!(QState::from_str("10").unwrap(), result);
        let result = swap.apply(&QState::from_str("11").unwrap()).unwrap();
        assert_eq!(QState::from_str("11").unwrap(), result);
    }

    #[test]
    fn test_pauli_z() {
        let z = Operator::pauli_z();
        let result = z.apply(&QState::from_spec("[1, 1]").unwrap()).unwrap();
        assert_approx_complex_eq!(1.0 / 2f64.sqrt(), 0.0, result.state[0]);
        assert_approx_complex_eq!(-1.0 / 2f64.sqrt(), 0.0, result.state[1]);
    }

    #[test]
    fn test_compose_dimension_mismatch() {
        let err = Operator::identity(1).compose(&Operator::identity(2));
        assert_eq!(Err(QsimError::dimension("compose", 2, 4)), err);

        let err = Operator::identity(2).apply(&QState::from_str("0").unwrap());
        assert_eq!(Err(QsimError::dimension("apply", 4, 2)), err);
    }

    #[test]
    fn test_tensor_order() {
        let not = Operator::full_not(1);
        let id = Operator::identity(1);
        let op = not.tensor(&id);
        let result = op.apply(&QState::from_str("00").unwrap()).unwrap();
        assert_eq!(QState::from_str("10").unwrap(), result);

        assert_eq!(Operator::identity(0), Operator::tensor_all([]));
        let left = not.tensor(&id).tensor(&not);
        let right = not.tensor(&id.tensor(&not));
        assert_eq!(left, right);
    }

    #[test]
    fn test_power() {
        let not = Operator::full_not(1);
        assert_eq!(Operator::identity(1), not.power(0).unwrap());
        assert_eq!(not, not.power(3).unwrap());
        assert_eq!(Operator::identity(1), not.power(4).unwrap());
    }

    #[test]
    fn test_scale_and_act() {
        let id = Operator::identity(1);
        let Product::Operator(scaled) = id.act(Operand::Scalar(c(2.0))).unwrap() else {
            panic!("scalar product should be an operator");
        };
        assert_approx_complex_eq!(2.0, 0.0, scaled.matrix[(0, 0)]);
        assert!(!scaled.is_valid(1e-9));

        let not = Operator::full_not(1);
        let Product::State(state) = not
            .act(Operand::State(&QState::from_str("0").unwrap()))
            .unwrap()
        else {
            panic!("state product should be a state");
        };
        assert_eq!(QState::from_str("1").unwrap(), state);

        assert_eq!(
            Product::Operator(Operator::identity(1)),
            not.act(Operand::Operator(&not)).unwrap()
        );
    }

    #[test]
    fn test_latex() {
        let latex = Operator::full_not(1).latex();
        assert_eq!("\\begin{bmatrix}\n  0 & 1 \\\\\n  1 & 0 \\\\\n\\end{bmatrix}", latex);
    }
}
