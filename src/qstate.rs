use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

use nalgebra::DVector;
use num_complex::Complex;
use rand::Rng;

use crate::error::{QsimError, Result};
use crate::{Qbit, MAX_QUBITS};

/// Norm drift tolerated by [`QState::normalize`] before it rescales.
pub const NORM_EPSILON: f64 = 1e-9;

/// Labels of the 2^n computational basis states in canonical order.
///
/// The width n list is every width n-1 label prefixed with "0", followed by
/// every one prefixed with "1". Every vector and matrix index in the crate
/// follows this order, so label `i` is the n digit binary form of `i`.
pub fn pure_states(n: usize) -> Vec<String> {
    if n == 0 {
        return vec![String::new()];
    }
    let tail = pure_states(n - 1);
    ["0", "1"]
        .iter()
        .flat_map(|head| tail.iter().map(move |rest| format!("{head}{rest}")))
        .collect()
}

/// Label of basis vector `index` in a `width` bit space.
pub fn basis_label(index: usize, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    format!("{:0width$b}", index, width = width)
}

/// Whether bit `position` (0 is the most significant) of basis vector
/// `index` is set in a `width` bit space.
pub(crate) fn bit_is_set(index: usize, width: usize, position: usize) -> bool {
    (index >> (width - 1 - position)) & 1 == 1
}

fn check_length(len: usize) -> Result<()> {
    if len == 0 || !len.is_power_of_two() {
        return Err(QsimError::format(format!(
            "State vector length must be a non-zero power of 2, got {len}"
        )));
    }
    Ok(())
}

/// Dense state vector over the 2^n computational basis.
#[derive(Debug, Clone, PartialEq)]
pub struct QState {
    pub(crate) state: DVector<Qbit>,
}

impl QState {
    /// Builds a normalized state from raw amplitudes.
    pub fn new(state: &[Qbit]) -> Result<Self> {
        Self::unnormalized(state)?.normalize()
    }

    /// Builds a state without rescaling, for intermediate results.
    pub fn unnormalized(state: &[Qbit]) -> Result<Self> {
        check_length(state.len())?;
        Ok(Self {
            state: DVector::from_row_slice(state),
        })
    }

    pub(crate) fn from_vector(state: DVector<Qbit>) -> Self {
        Self { state }
    }

    pub fn zero_state(num_of_qbits: usize) -> Self {
        let size = 2_usize.pow(num_of_qbits as u32);
        let mut state = DVector::zeros(size);
        state[0] = Complex::new(1.0, 0.0); // |0...0> state
        Self { state }
    }

    /// One-hot basis state for a label such as `"010"`.
    pub fn from_str(qbits: &str) -> Result<Self> {
        if qbits.is_empty() || !qbits.chars().all(|c| c == '0' || c == '1') {
            return Err(QsimError::format(format!(
                "'{qbits}' is not a basis state label"
            )));
        }
        if qbits.len() > MAX_QUBITS {
            return Err(QsimError::domain(qbits.len(), MAX_QUBITS));
        }
        let index = usize::from_str_radix(qbits, 2)
            .map_err(|e| QsimError::format(format!("'{qbits}': {e}")))?;
        let mut state = DVector::zeros(2_usize.pow(qbits.len() as u32));
        state[index] = Complex::new(1.0, 0.0);

        Ok(Self { state })
    }

    /// Parses an initial state spec: a sequence of `0`, `1` and `[a, b]`
    /// tokens tensored together left to right.
    ///
    /// `a` and `b` are complex literals (`0.6`, `1+2i`, `-3i`). Each bracket
    /// pair is normalized as a qubit of its own.
    ///
    /// ```
    /// use layered_qsim::QState;
    ///
    /// let psi = QState::from_spec("0[1, 1]").unwrap();
    /// assert_eq!(psi.num_of_qbits(), 2);
    /// ```
    pub fn from_spec(spec: &str) -> Result<Self> {
        let qbits = Self::parse_tokens(spec)?;
        if qbits.len() > MAX_QUBITS {
            return Err(QsimError::domain(qbits.len(), MAX_QUBITS));
        }
        Ok(Self::tensor_all(&qbits))
    }

    /// Like [`from_spec`](Self::from_spec), but fails with a format error
    /// unless the spec describes exactly `width` qubits. The width is checked
    /// before any amplitudes are expanded.
    pub fn from_spec_with_width(spec: &str, width: usize) -> Result<Self> {
        let qbits = Self::parse_tokens(spec)?;
        if qbits.len() != width {
            return Err(QsimError::format(format!(
                "initial state '{spec}' has {} qubits, the circuit has {width}",
                qbits.len()
            )));
        }
        Ok(Self::tensor_all(&qbits))
    }

    fn parse_tokens(spec: &str) -> Result<Vec<Self>> {
        let mut qbits = Vec::new();
        let mut chars = spec.char_indices();

        while let Some((start, c)) = chars.next() {
            match c {
                c if c.is_whitespace() => continue,
                '0' | '1' => qbits.push(Self::from_str(&c.to_string())?),
                '[' => {
                    let end = chars
                        .by_ref()
                        .find(|&(_, c)| c == ']')
                        .map(|(end, _)| end)
                        .ok_or_else(|| {
                            QsimError::format(format!("unterminated '[' at {start} in '{spec}'"))
                        })?;
                    qbits.push(Self::parse_qbit(&spec[start + 1..end])?);
                }
                other => {
                    return Err(QsimError::format(format!(
                        "unrecognized token '{other}' at {start} in '{spec}'"
                    )))
                }
            }
        }

        if qbits.is_empty() {
            return Err(QsimError::format("empty state spec"));
        }
        Ok(qbits)
    }

    /// [`from_spec`](Self::from_spec) with the spec repeated `n` times.
    pub fn from_spec_repeated(spec: &str, n: usize) -> Result<Self> {
        Self::from_spec(&spec.repeat(n))
    }

    fn parse_qbit(pair: &str) -> Result<Self> {
        let amplitudes = pair
            .split(',')
            .map(|part| {
                let part = part.trim();
                Complex::<f64>::from_str(part)
                    .map_err(|_| QsimError::format(format!("'{part}' is not a complex number")))
            })
            .collect::<Result<Vec<_>>>()?;

        if amplitudes.len() != 2 {
            return Err(QsimError::format(format!(
                "qubit '[{pair}]' needs exactly two amplitudes"
            )));
        }
        Self::new(&amplitudes)
    }

    pub fn num_of_qbits(&self) -> usize {
        self.state.len().ilog2() as usize
    }

    /// Number of amplitudes, 2^n.
    pub fn dim(&self) -> usize {
        self.state.len()
    }

    pub fn amplitudes(&self) -> &DVector<Qbit> {
        &self.state
    }

    pub fn norm(&self) -> f64 {
        self.state.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt()
    }

    pub fn is_normalized(&self, tolerance: f64) -> bool {
        (self.norm() - 1.0).abs() <= tolerance
    }

    /// Rescales by 1/‖v‖ unless the norm is already within [`NORM_EPSILON`]
    /// of 1.
    pub fn normalize(&self) -> Result<Self> {
        if self.is_normalized(NORM_EPSILON) {
            return Ok(self.clone());
        }
        self.rescaled()
    }

    /// Corrects numerical drift up to `tolerance`. Larger drift means the
    /// state was not produced by unitary evolution and is reported.
    pub fn renormalize(&self, tolerance: f64) -> Result<Self> {
        let norm = self.norm();
        if (norm - 1.0).abs() > tolerance {
            return Err(QsimError::format(format!(
                "state norm {norm} drifted more than {tolerance} from 1"
            )));
        }
        self.rescaled()
    }

    fn rescaled(&self) -> Result<Self> {
        let norm = self.norm();
        if norm == 0.0 {
            return Err(QsimError::format("cannot normalize the zero vector"));
        }
        Ok(Self {
            state: self.state.map(|a| a / norm),
        })
    }

    /// Kronecker product, `self` occupying the most significant bits.
    pub fn tensor(&self, other: &QState) -> QState {
        let mut state = Vec::with_capacity(self.dim() * other.dim());
        for x in self.state.iter() {
            for y in other.state.iter() {
                state.push(x * y);
            }
        }
        QState::from_vector(DVector::from_vec(state))
    }

    pub fn tensor_all<'a>(states: impl IntoIterator<Item = &'a QState>) -> QState {
        let unit = QState::from_vector(DVector::from_element(1, Complex::new(1.0, 0.0)));
        states.into_iter().fold(unit, |acc, state| acc.tensor(state))
    }

    /// Probability of each basis state, in canonical order.
    pub fn probabilities(&self) -> Vec<f64> {
        self.state.iter().map(|a| a.norm_sqr()).collect()
    }

    pub fn probability_map(&self) -> BTreeMap<String, f64> {
        let width = self.num_of_qbits();
        self.probabilities()
            .into_iter()
            .enumerate()
            .map(|(i, p)| (basis_label(i, width), p))
            .collect()
    }

    /// Total probability of the basis states matching `pattern`, where `x`
    /// matches either bit. `"x1"` on two qubits covers |01> and |11>.
    pub fn joint_probability(&self, pattern: &str) -> Result<f64> {
        let width = self.num_of_qbits();
        let pattern = pattern.chars().collect::<Vec<_>>();
        if pattern.len() != width {
            return Err(QsimError::format(format!(
                "pattern has {} characters but the state has {width} qubits",
                pattern.len()
            )));
        }
        if let Some(c) = pattern.iter().find(|c| !matches!(c, '0' | '1' | 'x')) {
            return Err(QsimError::format(format!("invalid pattern character '{c}'")));
        }

        let total = self
            .probabilities()
            .into_iter()
            .enumerate()
            .filter(|&(index, _)| {
                pattern.iter().enumerate().all(|(position, &c)| match c {
                    'x' => true,
                    bit => (bit == '1') == bit_is_set(index, width, position),
                })
            })
            .map(|(_, p)| p)
            .sum();
        Ok(total)
    }

    /// Probabilities of the leading `k` bits, summing over the rest.
    pub fn top_probabilities(&self, k: usize) -> Result<BTreeMap<String, f64>> {
        let width = self.num_of_qbits();
        if k == 0 || k > width {
            return Err(QsimError::format(format!(
                "cannot group {width} qubits by their top {k}"
            )));
        }

        let step = 1 << (width - k);
        Ok(self
            .probabilities()
            .chunks(step)
            .enumerate()
            .map(|(i, chunk)| (basis_label(i, k), chunk.iter().sum()))
            .collect())
    }

    /// Measures every qubit: picks a basis state by inverting the cumulative
    /// distribution at a uniform draw, collapses onto it and returns its
    /// label.
    pub fn sample_collapse<R: Rng + ?Sized>(&mut self, rng: &mut R) -> String {
        let probabilities = self.probabilities();
        let draw: f64 = rng.random();

        let mut cumulative = 0.0;
        let mut outcome = None;
        for (i, &p) in probabilities.iter().enumerate() {
            cumulative += p;
            if p > 0.0 && cumulative >= draw {
                outcome = Some(i);
                break;
            }
        }
        // Rounding can leave the total just under the draw.
        let index = outcome
            .or_else(|| probabilities.iter().rposition(|&p| p > 0.0))
            .unwrap_or(probabilities.len() - 1);

        let mut state = DVector::zeros(self.dim());
        state[index] = Complex::new(1.0, 0.0);
        self.state = state;

        basis_label(index, self.num_of_qbits())
    }
}

impl Display for QState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = self.num_of_qbits();

        for (i, value) in self.state.iter().enumerate() {
            writeln!(f, "|{}>: {}", basis_label(i, width), value)?;
        }

        Ok(())
    }
}

impl From<QState> for DVector<Qbit> {
    fn from(qstate: QState) -> Self {
        qstate.state
    }
}
