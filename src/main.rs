use anyhow::Result;
use layered_qsim::{
    Circuit, GateKind, LayerEntry, MeasurementOutcome, MeasurementQuery, SimConfig, Simulator,
};
use tracing_subscriber::EnvFilter;

fn print_outcome(outcome: &MeasurementOutcome) {
    match outcome {
        MeasurementOutcome::Probabilities(probabilities) => {
            println!("Probabilities of Pure State Measurements:");
            for (label, p) in probabilities {
                println!("  ({p:.10}) |{label}>");
            }
        }
        MeasurementOutcome::Pattern {
            pattern,
            probability,
        } => println!("  P[{pattern}] = {probability:.10}"),
        MeasurementOutcome::Counts { trials, counts } => {
            println!("Results of {trials} Measurements");
            for (label, count) in counts.iter().filter(|(_, count)| **count > 0) {
                println!("  |{label}> --> {count}/{trials}");
            }
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // GHZ state on three qubits
    let circuit = Circuit::new(3)
        .gate(LayerEntry::new(GateKind::Hadamard, ["q0"]))
        .gate(LayerEntry::new(GateKind::Not, ["q1"]).controlled_by(["q0"]))
        .gate(LayerEntry::new(GateKind::Not, ["q2"]).controlled_by(["q1"]))
        .query(MeasurementQuery::AllProbability)
        .query(MeasurementQuery::TopKProbability(1))
        .query(MeasurementQuery::PatternProbability("1x1".to_string()))
        .query(MeasurementQuery::SampledMeasurement(1000));

    let result = Simulator::new(SimConfig::with_seed(2022))?.run(&circuit)?;

    println!("Input State:\n{}", result.initial);
    println!("Final State:\n{}", result.state);
    for outcome in &result.outcomes {
        print_outcome(outcome);
    }

    Ok(())
}
