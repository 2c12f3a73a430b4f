//! Grover search over three bits for a marked label, using an ancilla
//! prepared in |-> so the oracle flips the phase of the marked state.

use anyhow::Result;
use layered_qsim::{
    BooleanFunction, Circuit, GateKind, LayerEntry, MeasurementOutcome, MeasurementQuery,
    SimConfig, Simulator,
};

struct Marked {
    labels: Vec<String>,
}

impl BooleanFunction for Marked {
    fn apply(&self, label: &str) -> bool {
        self.labels.iter().any(|marked| marked == label)
    }

    fn arity(&self) -> Option<usize> {
        Some(3)
    }
}

fn grover_iteration(circuit: Circuit) -> Circuit {
    let search = ["q0", "q1", "q2"];
    circuit
        .gate(LayerEntry::new(GateKind::Oracle, ["q0", "q1", "q2", "q3"]))
        // 2|s><s| - I
        .gate(LayerEntry::new(GateKind::Hadamard, search))
        .gate(LayerEntry::new(GateKind::Not, search))
        .gate(LayerEntry::new(GateKind::PauliZ, ["q2"]).controlled_by(["q0", "q1"]))
        .gate(LayerEntry::new(GateKind::Not, search))
        .gate(LayerEntry::new(GateKind::Hadamard, search))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let marked = Marked {
        labels: vec!["101".to_string()],
    };

    let mut circuit = Circuit::new(4)
        .initial_state("0001")
        .oracle(marked)
        .gate(LayerEntry::new(GateKind::Hadamard, ["q0", "q1", "q2", "q3"]));
    // round(pi/4 * sqrt(8)) iterations
    for _ in 0..2 {
        circuit = grover_iteration(circuit);
    }
    let circuit = circuit
        .query(MeasurementQuery::TopKProbability(3))
        .query(MeasurementQuery::SampledMeasurement(100));

    let result = Simulator::new(SimConfig::with_seed(1))?.run(&circuit)?;

    for outcome in &result.outcomes {
        match outcome {
            MeasurementOutcome::Probabilities(probabilities) => {
                for (label, p) in probabilities {
                    println!("  ({p:.4}) |{label}>");
                }
            }
            MeasurementOutcome::Counts { trials, counts } => {
                for (label, count) in counts.iter().filter(|(_, count)| **count > 0) {
                    println!("  |{label}> --> {count}/{trials}");
                }
            }
            MeasurementOutcome::Pattern { .. } => {}
        }
    }

    Ok(())
}
