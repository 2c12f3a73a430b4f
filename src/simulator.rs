use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::circuit::{Circuit, MeasurementQuery};
use crate::config::SimConfig;
use crate::error::{QsimError, Result};
use crate::operator::Operator;
use crate::qstate::{pure_states, QState};

/// Answer to one [`MeasurementQuery`].
#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementOutcome {
    /// Basis label (or label prefix) to probability.
    Probabilities(BTreeMap<String, f64>),
    Pattern { pattern: String, probability: f64 },
    /// Basis label to the number of trials that collapsed onto it.
    Counts {
        trials: usize,
        counts: BTreeMap<String, usize>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationResult {
    pub initial: QState,
    pub state: QState,
    pub num_of_operators: usize,
    /// One entry per query, in query order.
    pub outcomes: Vec<MeasurementOutcome>,
}

/// Runs compiled circuits and answers measurement queries.
#[derive(Debug, Clone, Default)]
pub struct Simulator {
    config: SimConfig,
}

impl Simulator {
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Compiles and runs `circuit`, sampling with an RNG seeded from the
    /// config (or the OS when no seed is set).
    pub fn run(&self, circuit: &Circuit) -> Result<SimulationResult> {
        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        self.run_with_rng(circuit, &mut rng)
    }

    pub fn run_with_rng<R: Rng + ?Sized>(
        &self,
        circuit: &Circuit,
        rng: &mut R,
    ) -> Result<SimulationResult> {
        let num_of_qbits = circuit.num_of_qbits();
        if num_of_qbits == 0 {
            return Err(QsimError::format("a circuit needs at least one qubit"));
        }
        if num_of_qbits > self.config.max_qubits {
            return Err(QsimError::domain(num_of_qbits, self.config.max_qubits));
        }

        let initial = QState::from_spec_with_width(circuit.initial_state_spec(), num_of_qbits)?;

        let operators = circuit.compile()?;
        info!(
            qubits = num_of_qbits,
            layers = circuit.layers().len(),
            operators = operators.len(),
            queries = circuit.queries().len(),
            "compiled circuit"
        );

        let state = self.execute(&operators, &initial)?;
        let outcomes = circuit
            .queries()
            .iter()
            .map(|query| self.answer(query, &state, rng))
            .collect::<Result<Vec<_>>>()?;

        Ok(SimulationResult {
            initial,
            state,
            num_of_operators: operators.len(),
            outcomes,
        })
    }

    /// Applies `operators` in the order given, the first one first, then
    /// corrects numerical drift of the norm.
    pub fn execute(&self, operators: &[Operator], initial: &QState) -> Result<QState> {
        let mut state = initial.clone();
        for op in operators {
            state = op.apply(&state)?;
        }
        state.renormalize(self.config.tolerance)
    }

    /// Answers one query without touching `state`. Sampled measurements
    /// collapse an independent copy per trial.
    pub fn answer<R: Rng + ?Sized>(
        &self,
        query: &MeasurementQuery,
        state: &QState,
        rng: &mut R,
    ) -> Result<MeasurementOutcome> {
        debug!("answering {query:?}");
        match query {
            MeasurementQuery::TopKProbability(k) => {
                state.top_probabilities(*k).map(MeasurementOutcome::Probabilities)
            }
            MeasurementQuery::AllProbability => state
                .top_probabilities(state.num_of_qbits())
                .map(MeasurementOutcome::Probabilities),
            MeasurementQuery::PatternProbability(pattern) => Ok(MeasurementOutcome::Pattern {
                pattern: pattern.clone(),
                probability: state.joint_probability(pattern)?,
            }),
            MeasurementQuery::SampledMeasurement(trials) => {
                let mut counts = pure_states(state.num_of_qbits())
                    .into_iter()
                    .map(|label| (label, 0))
                    .collect::<BTreeMap<_, _>>();
                for _ in 0..*trials {
                    let label = state.clone().sample_collapse(rng);
                    *counts.entry(label).or_insert(0) += 1;
                }
                Ok(MeasurementOutcome::Counts {
                    trials: *trials,
                    counts,
                })
            }
        }
    }
}
