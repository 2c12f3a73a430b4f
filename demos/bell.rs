use anyhow::Result;
use layered_qsim::control::cnot;
use layered_qsim::{HadamardCache, Operator, QState};

/// Builds the Bell state by hand from the operator algebra, without the
/// circuit compiler.
fn main() -> Result<()> {
    let h = HadamardCache::global().hadamard(1)?;
    let layer1 = h.tensor(&Operator::identity(1));
    let layer2 = cnot()?;

    println!("H x I =\n{layer1}");
    println!("CNOT =\n{layer2}");
    println!("{}", layer2.latex());

    let psi = QState::from_spec("00")?;
    let phi = layer2.apply(&layer1.apply(&psi)?)?;

    println!("Resulting state:\n{phi}");
    println!("P[x1] = {}", phi.joint_probability("x1")?);

    Ok(())
}
