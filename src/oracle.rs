use crate::error::{QsimError, Result};
use crate::operator::Operator;
use crate::qstate::pure_states;
use crate::MAX_QUBITS;

/// Classical boolean predicate over basis labels, the `f` in `U_f`.
///
/// Implemented for any `Fn(&str) -> bool`. Predicates that only accept one
/// input width report it through [`arity`](BooleanFunction::arity).
pub trait BooleanFunction {
    fn apply(&self, label: &str) -> bool;

    /// Input width the predicate expects, `None` if it accepts any.
    fn arity(&self) -> Option<usize> {
        None
    }
}

impl<F> BooleanFunction for F
where
    F: Fn(&str) -> bool,
{
    fn apply(&self, label: &str) -> bool {
        self(label)
    }
}

/// Builds the `n`-qubit reversible operator `U_f |x, y> = |x, y ⊕ f(x)>`.
///
/// The last bit is the ancilla. For every `n-1` bit label `x` the block on
/// `{x0, x1}` is the identity when `f(x)` is false and a NOT otherwise.
pub fn unitary_f(n: usize, f: &dyn BooleanFunction) -> Result<Operator> {
    if n > MAX_QUBITS {
        return Err(QsimError::domain(n, MAX_QUBITS));
    }
    if n < 2 {
        return Err(QsimError::dimension("oracle width", 2, n));
    }
    if let Some(arity) = f.arity() {
        if arity != n - 1 {
            return Err(QsimError::dimension("oracle input width", n - 1, arity));
        }
    }

    let ones = pure_states(n - 1)
        .iter()
        .enumerate()
        .flat_map(|(i, x)| {
            let (zero, one) = (2 * i, 2 * i + 1);
            if f.apply(x) {
                [(one, zero), (zero, one)]
            } else {
                [(zero, zero), (one, one)]
            }
        })
        .collect::<Vec<_>>();

    Ok(Operator::from_permutation(1 << n, ones))
}
