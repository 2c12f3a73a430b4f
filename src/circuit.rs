use std::collections::HashMap;
use std::fmt::Display;

use tracing::debug;

use crate::control::controlled;
use crate::error::{QsimError, Result};
use crate::gates::{GateKind, HadamardCache};
use crate::operator::Operator;
use crate::oracle::{unitary_f, BooleanFunction};

/// One gate of a layer: the gate, the qubits it acts on and the qubits
/// that must all be 1 for it to act.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerEntry {
    pub gate: GateKind,
    pub targets: Vec<String>,
    pub controls: Vec<String>,
}

impl LayerEntry {
    pub fn new<S: Into<String>>(gate: GateKind, targets: impl IntoIterator<Item = S>) -> Self {
        Self {
            gate,
            targets: targets.into_iter().map(Into::into).collect(),
            controls: Vec::new(),
        }
    }

    pub fn controlled_by<S: Into<String>>(mut self, controls: impl IntoIterator<Item = S>) -> Self {
        self.controls = controls.into_iter().map(Into::into).collect();
        self
    }

    pub fn is_controlled(&self) -> bool {
        !self.controls.is_empty()
    }

    /// Oracles and controlled gates need the whole register to build their
    /// matrix, so they cannot share a layer with other gates.
    fn needs_own_layer(&self) -> bool {
        self.gate == GateKind::Oracle || self.is_controlled()
    }
}

impl Display for LayerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}; {}", self.gate, self.targets.join(" "))?;
        if self.is_controlled() {
            write!(f, "; {}", self.controls.join(" "))?;
        }
        write!(f, "}}")
    }
}

/// Gates applied side by side in one time step.
pub type CircuitLayer = Vec<LayerEntry>;

#[derive(Debug, Clone, PartialEq)]
pub enum MeasurementQuery {
    /// Probabilities of the leading k qubits.
    TopKProbability(usize),
    AllProbability,
    /// Probability of matching a pattern such as `"x1x"`.
    PatternProbability(String),
    /// Counts over the given number of independent measurements.
    SampledMeasurement(usize),
}

/// Qubit names and their bit positions, 0 being the most significant.
#[derive(Debug, Clone, PartialEq)]
pub struct QubitMap {
    indices: HashMap<String, usize>,
}

impl QubitMap {
    /// `q0`, `q1`, ... `q{n-1}`.
    pub fn sequential(num_of_qbits: usize) -> Self {
        Self {
            indices: (0..num_of_qbits).map(|i| (format!("q{i}"), i)).collect(),
        }
    }

    pub fn from_names<S: Into<String>>(names: impl IntoIterator<Item = S>) -> Result<Self> {
        let mut indices = HashMap::new();
        for (index, name) in names.into_iter().enumerate() {
            let name = name.into();
            if indices.insert(name.clone(), index).is_some() {
                return Err(QsimError::format(format!("qubit '{name}' declared twice")));
            }
        }
        Ok(Self { indices })
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn index(&self, name: &str) -> Result<usize> {
        self.indices
            .get(name)
            .copied()
            .ok_or_else(|| QsimError::format(format!("unknown qubit '{name}'")))
    }

    fn indices_of(&self, names: &[String]) -> Result<Vec<usize>> {
        names.iter().map(|name| self.index(name)).collect()
    }
}

/// Structured description of a circuit, as handed over by a parser.
pub struct Circuit {
    qubits: QubitMap,
    initial_state: String,
    layers: Vec<CircuitLayer>,
    oracle: Option<Box<dyn BooleanFunction>>,
    queries: Vec<MeasurementQuery>,
}

impl Circuit {
    /// Circuit on qubits `q0..q{n-1}` starting from |0...0>.
    pub fn new(num_of_qbits: usize) -> Self {
        Self::with_qubits(QubitMap::sequential(num_of_qbits))
    }

    pub fn with_qubits(qubits: QubitMap) -> Self {
        Self {
            initial_state: "0".repeat(qubits.len()),
            qubits,
            layers: Vec::new(),
            oracle: None,
            queries: Vec::new(),
        }
    }

    pub fn initial_state(mut self, spec: impl Into<String>) -> Self {
        self.initial_state = spec.into();
        self
    }

    pub fn layer(mut self, layer: CircuitLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn gate(self, entry: LayerEntry) -> Self {
        self.layer(vec![entry])
    }

    pub fn oracle(mut self, f: impl BooleanFunction + 'static) -> Self {
        self.oracle = Some(Box::new(f));
        self
    }

    pub fn query(mut self, query: MeasurementQuery) -> Self {
        self.queries.push(query);
        self
    }

    pub fn num_of_qbits(&self) -> usize {
        self.qubits.len()
    }

    pub fn qubits(&self) -> &QubitMap {
        &self.qubits
    }

    pub fn initial_state_spec(&self) -> &str {
        &self.initial_state
    }

    pub fn layers(&self) -> &[CircuitLayer] {
        &self.layers
    }

    pub fn queries(&self) -> &[MeasurementQuery] {
        &self.queries
    }

    pub fn boolean_function(&self) -> Option<&dyn BooleanFunction> {
        self.oracle.as_deref()
    }

    /// Compiles every layer into a full-width operator.
    pub fn compile(&self) -> Result<Vec<Operator>> {
        Compiler::new(&self.qubits, self.boolean_function()).compile(&self.layers)
    }
}

/// Replaces every multi-gate layer holding an oracle or a controlled gate
/// with one layer per gate, keeping their order. Other layers are kept
/// as they are.
pub fn split_layers(layers: &[CircuitLayer]) -> Vec<CircuitLayer> {
    layers
        .iter()
        .flat_map(|layer| {
            if layer.len() > 1 && layer.iter().any(LayerEntry::needs_own_layer) {
                layer.iter().map(|entry| vec![entry.clone()]).collect()
            } else {
                vec![layer.clone()]
            }
        })
        .collect()
}

/// Turns circuit layers into full-width operators.
pub struct Compiler<'a> {
    qubits: &'a QubitMap,
    oracle: Option<&'a dyn BooleanFunction>,
    cache: &'a HadamardCache,
}

impl<'a> Compiler<'a> {
    pub fn new(qubits: &'a QubitMap, oracle: Option<&'a dyn BooleanFunction>) -> Self {
        Self {
            qubits,
            oracle,
            cache: HadamardCache::global(),
        }
    }

    pub fn with_cache(mut self, cache: &'a HadamardCache) -> Self {
        self.cache = cache;
        self
    }

    /// Splits the layers, then builds one operator per resulting layer.
    /// The first failing layer aborts the whole compilation.
    pub fn compile(&self, layers: &[CircuitLayer]) -> Result<Vec<Operator>> {
        let num_of_qbits = self.qubits.len();
        if num_of_qbits > self.cache.max_qubits() {
            return Err(QsimError::domain(num_of_qbits, self.cache.max_qubits()));
        }

        let layers = split_layers(layers);
        debug!("{} layers after splitting", layers.len());

        layers
            .iter()
            .enumerate()
            .map(|(i, layer)| {
                debug!(
                    "layer {i}: {}",
                    layer.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
                );
                self.compile_layer(layer)
            })
            .collect()
    }

    /// Builds the operator of a single, already split, layer.
    pub fn compile_layer(&self, layer: &[LayerEntry]) -> Result<Operator> {
        if let [entry] = layer {
            if entry.gate == GateKind::Oracle {
                return self.oracle_layer(entry);
            }
            if entry.is_controlled() {
                return self.controlled_layer(entry);
            }
        }
        if layer.len() > 1 && layer.iter().any(LayerEntry::needs_own_layer) {
            return Err(QsimError::layout(
                "oracles and controlled gates need a layer of their own",
            ));
        }
        self.tensor_layer(layer)
    }

    fn oracle_layer(&self, entry: &LayerEntry) -> Result<Operator> {
        let f = self.oracle.ok_or_else(|| {
            QsimError::layout("the circuit uses an oracle but has no boolean function")
        })?;
        let n = self.qubits.len();
        let (start, width) = self.target_block(entry)?;
        let uf = unitary_f(width, f)?;

        let controls = self.qubits.indices_of(&entry.controls)?;
        if !controls.is_empty() {
            return controlled(&uf, n, start, &controls);
        }
        Ok(Operator::tensor_all([
            &Operator::identity(start),
            &uf,
            &Operator::identity(n - start - width),
        ]))
    }

    fn controlled_layer(&self, entry: &LayerEntry) -> Result<Operator> {
        let (start, width) = self.target_block(entry)?;
        let gate = entry.gate.block(width, self.cache)?;
        let controls = self.qubits.indices_of(&entry.controls)?;
        controlled(&gate, self.qubits.len(), start, &controls)
    }

    /// Tensor product of uncontrolled gates, identity on idle bits.
    fn tensor_layer(&self, layer: &[LayerEntry]) -> Result<Operator> {
        let n = self.qubits.len();
        let mut slots = vec![GateKind::Identity; n];
        let mut claimed = vec![false; n];

        for entry in layer {
            let targets = if entry.gate == GateKind::Swap {
                let (start, width) = self.target_block(entry)?;
                (start..start + width).collect()
            } else {
                self.targets_of(entry)?
            };
            for bit in targets {
                if claimed[bit] {
                    return Err(QsimError::layout(format!(
                        "qubit {bit} is used by two gates in one layer"
                    )));
                }
                claimed[bit] = true;
                slots[bit] = entry.gate;
            }
        }

        let mut factors = Vec::new();
        let mut bit = 0;
        while bit < n {
            let kind = slots[bit];
            let run = match kind {
                GateKind::Swap => 2,
                kind if kind.merges_runs() => {
                    slots[bit..].iter().take_while(|&&other| other == kind).count()
                }
                _ => 1,
            };
            factors.push(kind.block(run, self.cache)?);
            bit += run;
        }

        Ok(Operator::tensor_all(&factors))
    }

    fn targets_of(&self, entry: &LayerEntry) -> Result<Vec<usize>> {
        if entry.targets.is_empty() {
            return Err(QsimError::format(format!("{entry} has no target qubits")));
        }
        self.qubits.indices_of(&entry.targets)
    }

    /// First bit and width of the entry's targets, which must form one
    /// contiguous block.
    fn target_block(&self, entry: &LayerEntry) -> Result<(usize, usize)> {
        let mut bits = self.targets_of(entry)?;
        bits.sort_unstable();
        bits.dedup();
        if bits.len() != entry.targets.len() {
            return Err(QsimError::layout(format!("{entry} names a qubit twice")));
        }

        let start = bits[0];
        let width = bits.len();
        if bits[width - 1] - start + 1 != width {
            return Err(QsimError::layout(format!(
                "{entry} targets qubits {bits:?}, which are not contiguous"
            )));
        }
        if entry.gate == GateKind::Swap && width != 2 {
            return Err(QsimError::layout(format!(
                "{entry} must target exactly two adjacent qubits"
            )));
        }
        Ok((start, width))
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::control::cnot;
    use crate::qstate::QState;

    fn h(targets: &[&str]) -> LayerEntry {
        LayerEntry::new(GateKind::Hadamard, targets.iter().copied())
    }

    fn not(targets: &[&str]) -> LayerEntry {
        LayerEntry::new(GateKind::Not, targets.iter().copied())
    }

    #[test]
    fn test_split_layers() {
        let layers = vec![
            vec![h(&["q0"]), h(&["q1"])],
            vec![not(&["q0"]).controlled_by(["q1"]), h(&["q2"])],
            vec![LayerEntry::new(GateKind::Oracle, ["q1", "q2"])],
            vec![LayerEntry::new(GateKind::Oracle, ["q0", "q1"]), not(&["q2"])],
        ];

        let split = split_layers(&layers);
        assert_eq!(
            vec![
                vec![h(&["q0"]), h(&["q1"])],
                vec![not(&["q0"]).controlled_by(["q1"])],
                vec![h(&["q2"])],
                vec![LayerEntry::new(GateKind::Oracle, ["q1", "q2"])],
                vec![LayerEntry::new(GateKind::Oracle, ["q0", "q1"])],
                vec![not(&["q2"])],
            ],
            split
        );
        // input untouched
        assert_eq!(4, layers.len());
    }

    #[test]
    fn test_single_hadamard_layer() -> Result<()> {
        let qubits = QubitMap::sequential(1);
        let ops = Compiler::new(&qubits, None).compile(&[vec![h(&["q0"])]])?;
        assert_eq!(1, ops.len());
        assert!(ops[0].approx_eq(&HadamardCache::global().hadamard(1)?, 1e-12));
        Ok(())
    }

    #[test]
    fn test_merged_layer_equals_unmerged_tensor() -> Result<()> {
        let qubits = QubitMap::sequential(5);
        let cache = HadamardCache::new(5);
        let compiler = Compiler::new(&qubits, None).with_cache(&cache);
        let layer = vec![h(&["q0", "q1"]), h(&["q2"]), not(&["q3", "q4"])];

        let h1 = cache.hadamard(1)?;
        let x = Operator::full_not(1);
        let expected = Operator::tensor_all([&h1, &h1, &h1, &x, &x]);

        assert!(compiler.compile_layer(&layer)?.approx_eq(&expected, 1e-12));
        Ok(())
    }

    #[test]
    fn test_tensor_layer_with_idle_bits_and_swap() -> Result<()> {
        let qubits = QubitMap::sequential(4);
        let compiler = Compiler::new(&qubits, None);
        let layer = vec![
            LayerEntry::new(GateKind::Swap, ["q2", "q1"]),
            LayerEntry::new(GateKind::PauliZ, ["q3"]),
        ];

        let expected = Operator::tensor_all([
            &Operator::identity(1),
            &Operator::swap(),
            &Operator::pauli_z(),
        ]);
        assert_eq!(expected, compiler.compile_layer(&layer)?);

        // two swaps side by side stay two swaps
        let layer = vec![
            LayerEntry::new(GateKind::Swap, ["q0", "q1"]),
            LayerEntry::new(GateKind::Swap, ["q2", "q3"]),
        ];
        let swap = Operator::swap();
        assert_eq!(swap.tensor(&swap), compiler.compile_layer(&layer)?);
        Ok(())
    }

    #[test]
    fn test_controlled_layer() -> Result<()> {
        let qubits = QubitMap::sequential(2);
        let layer = vec![not(&["q1"]).controlled_by(["q0"])];
        let ops = Compiler::new(&qubits, None).compile(&[layer])?;
        assert_eq!(vec![cnot()?], ops);
        Ok(())
    }

    #[test]
    fn test_controlled_multi_bit_block() -> Result<()> {
        let qubits = QubitMap::sequential(3);
        let compiler = Compiler::new(&qubits, None);
        let op = compiler.compile_layer(&[not(&["q1", "q2"]).controlled_by(["q0"])])?;
        assert_eq!(QState::from_str("110")?, op.apply(&QState::from_str("101")?)?);
        assert_eq!(QState::from_str("001")?, op.apply(&QState::from_str("001")?)?);
        Ok(())
    }

    #[test]
    fn test_oracle_layer_embedding() -> Result<()> {
        let qubits = QubitMap::sequential(3);
        let f = |x: &str| x == "1";
        let compiler = Compiler::new(&qubits, Some(&f));

        let op = compiler.compile_layer(&[LayerEntry::new(GateKind::Oracle, ["q2", "q1"])])?;
        let expected = Operator::identity(1).tensor(&unitary_f(2, &f)?);
        assert_eq!(expected, op);

        let op = compiler.compile_layer(&[LayerEntry::new(GateKind::Oracle, ["q0", "q1"])])?;
        let expected = unitary_f(2, &f)?.tensor(&Operator::identity(1));
        assert_eq!(expected, op);
        Ok(())
    }

    #[test]
    fn test_controlled_oracle() -> Result<()> {
        let qubits = QubitMap::sequential(3);
        let always = |_: &str| true;
        let compiler = Compiler::new(&qubits, Some(&always));
        let entry = LayerEntry::new(GateKind::Oracle, ["q1", "q2"]).controlled_by(["q0"]);
        let op = compiler.compile_layer(&[entry])?;

        assert_eq!(QState::from_str("011")?, op.apply(&QState::from_str("011")?)?);
        assert_eq!(QState::from_str("110")?, op.apply(&QState::from_str("111")?)?);
        Ok(())
    }

    #[test]
    fn test_layout_errors() {
        let qubits = QubitMap::sequential(3);
        let always = |_: &str| true;
        let compiler = Compiler::new(&qubits, Some(&always));

        let gapped = [LayerEntry::new(GateKind::Oracle, ["q0", "q2"])];
        assert!(matches!(
            compiler.compile_layer(&gapped),
            Err(QsimError::UnsupportedLayout(_))
        ));

        let twice = [h(&["q0"]), not(&["q0"])];
        assert!(matches!(
            compiler.compile_layer(&twice),
            Err(QsimError::UnsupportedLayout(_))
        ));

        let unsplit = [h(&["q0"]), not(&["q1"]).controlled_by(["q0"])];
        assert!(matches!(
            compiler.compile_layer(&unsplit),
            Err(QsimError::UnsupportedLayout(_))
        ));

        let wide_swap = [LayerEntry::new(GateKind::Swap, ["q0", "q1", "q2"])];
        assert!(matches!(
            compiler.compile_layer(&wide_swap),
            Err(QsimError::UnsupportedLayout(_))
        ));

        let no_oracle = Compiler::new(&qubits, None);
        assert!(matches!(
            no_oracle.compile_layer(&[LayerEntry::new(GateKind::Oracle, ["q0", "q1"])]),
            Err(QsimError::UnsupportedLayout(_))
        ));
    }

    #[test]
    fn test_compile_fails_fast() {
        let circuit = Circuit::new(2)
            .gate(h(&["q0"]))
            .gate(not(&["q7"]))
            .gate(h(&["q1"]));
        assert!(matches!(circuit.compile(), Err(QsimError::Format(_))));

        let no_targets = LayerEntry::new(GateKind::Hadamard, Vec::<String>::new());
        let circuit = Circuit::new(2).gate(no_targets);
        assert!(matches!(circuit.compile(), Err(QsimError::Format(_))));
    }

    #[test]
    fn test_qubit_map() -> Result<()> {
        let qubits = QubitMap::from_names(["a", "b", "c"])?;
        assert_eq!(3, qubits.len());
        assert_eq!(1, qubits.index("b")?);
        assert!(QubitMap::from_names(["a", "a"]).is_err());
        assert_eq!(2, QubitMap::sequential(3).index("q2")?);
        Ok(())
    }

    #[test]
    fn test_entry_display() {
        assert_eq!("{H; q0 q1}", h(&["q0", "q1"]).to_string());
        assert_eq!("{NOT; q1; q0}", not(&["q1"]).controlled_by(["q0"]).to_string());
    }
}
