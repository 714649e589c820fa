//! Fully connected feedforward network.
//!
//! A network is an ordered stack of layers. The first layer only holds the
//! input activations; every following layer owns its weights, biases and
//! activation buffer. Dropping a network releases everything it owns.

use rand::Rng;

use super::Matrix;

/// One layer of a network.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// `size × previous size`. Absent for the input layer.
    pub weights: Option<Matrix>,
    /// `size × 1`. Absent for the input layer.
    pub biases: Option<Matrix>,
    /// `size × 1`. Most recent input or output values.
    pub activations: Matrix,
}

impl Layer {
    fn input(size: usize) -> Self {
        Self {
            weights: None,
            biases: None,
            activations: Matrix::zeros(size, 1),
        }
    }

    fn random<R: Rng + ?Sized>(size: usize, prev_size: usize, rng: &mut R) -> Self {
        Self {
            weights: Some(Matrix::random(size, prev_size, rng)),
            biases: Some(Matrix::random(size, 1, rng)),
            activations: Matrix::zeros(size, 1),
        }
    }

    /// Number of neurons.
    #[inline]
    pub fn size(&self) -> usize {
        self.activations.rows()
    }

    /// Shapes of (weights, biases, activations), used to compare topologies.
    fn shapes(&self) -> (Option<(usize, usize)>, Option<(usize, usize)>, (usize, usize)) {
        (
            self.weights.as_ref().map(Matrix::shape),
            self.biases.as_ref().map(Matrix::shape),
            self.activations.shape(),
        )
    }
}

/// Feedforward network.
#[derive(Debug, Clone, PartialEq)]
pub struct Network {
    layers: Vec<Layer>,
}

impl Network {
    /// Build a network with randomized weights and biases.
    ///
    /// `layer_sizes[0]` is the input size, the last entry the output size.
    pub fn new<R: Rng + ?Sized>(layer_sizes: &[usize], rng: &mut R) -> Self {
        assert!(
            layer_sizes.len() >= 2,
            "a network needs an input and an output layer"
        );

        let mut layers = Vec::with_capacity(layer_sizes.len());
        layers.push(Layer::input(layer_sizes[0]));
        for pair in layer_sizes.windows(2) {
            layers.push(Layer::random(pair[1], pair[0], rng));
        }
        Self { layers }
    }

    /// Build a network from explicit layers, checking the chaining invariant.
    pub fn from_layers(layers: Vec<Layer>) -> Self {
        assert!(layers.len() >= 2, "a network needs an input and an output layer");
        assert!(
            layers[0].weights.is_none() && layers[0].biases.is_none(),
            "input layer must not carry weights"
        );
        for i in 1..layers.len() {
            let size = layers[i].size();
            let prev = layers[i - 1].size();
            let weights = layers[i].weights.as_ref().expect("hidden layer without weights");
            let biases = layers[i].biases.as_ref().expect("hidden layer without biases");
            assert_eq!(weights.shape(), (size, prev), "layer {i} weight shape");
            assert_eq!(biases.shape(), (size, 1), "layer {i} bias shape");
        }
        Self { layers }
    }

    #[inline]
    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// Layer sizes, input first.
    pub fn topology(&self) -> Vec<usize> {
        self.layers.iter().map(Layer::size).collect()
    }

    /// Total number of weights and biases.
    pub fn parameter_count(&self) -> usize {
        self.layers
            .iter()
            .skip(1)
            .map(|l| {
                l.weights.as_ref().map_or(0, |w| w.as_slice().len())
                    + l.biases.as_ref().map_or(0, |b| b.as_slice().len())
            })
            .sum()
    }

    /// Input activation buffer. Callers fill it before [`Network::forward`].
    #[inline]
    pub fn input_mut(&mut self) -> &mut [f32] {
        self.layers[0].activations.as_mut_slice()
    }

    #[inline]
    pub fn input(&self) -> &[f32] {
        self.layers[0].activations.as_slice()
    }

    /// Output activations from the most recent forward pass.
    #[inline]
    pub fn output(&self) -> &[f32] {
        self.layers[self.layers.len() - 1].activations.as_slice()
    }

    /// Propagate the input buffer through every layer.
    ///
    /// Only activation buffers change; calling this twice with the same
    /// input yields the same output.
    pub fn forward(&mut self) {
        for i in 1..self.layers.len() {
            let (done, rest) = self.layers.split_at_mut(i);
            let prev = &done[i - 1].activations;
            let layer = &mut rest[0];
            let (Some(weights), Some(biases)) = (&layer.weights, &layer.biases) else {
                unreachable!("non-input layer {i} without parameters");
            };

            Matrix::multiply_into(weights, prev, &mut layer.activations);
            layer.activations.add_assign(biases);
            layer.activations.activate();
        }
    }

    /// Build a child network by averaging two parents with bounded mutation.
    ///
    /// Both parents must share the exact same topology. The child owns fresh
    /// matrices and does not alias either parent.
    pub fn crossover<R: Rng + ?Sized>(
        a: &Network,
        b: &Network,
        mutation_max: f32,
        rng: &mut R,
    ) -> Network {
        assert_eq!(
            a.layers.len(),
            b.layers.len(),
            "crossover parents have different layer counts"
        );

        let mut layers = Vec::with_capacity(a.layers.len());
        layers.push(Layer::input(a.layers[0].size()));

        for (la, lb) in a.layers.iter().zip(&b.layers).skip(1) {
            assert_eq!(la.shapes(), lb.shapes(), "crossover parents have different shapes");
            let (Some(wa), Some(ba), Some(wb), Some(bb)) =
                (&la.weights, &la.biases, &lb.weights, &lb.biases)
            else {
                unreachable!("non-input layer without parameters");
            };

            layers.push(Layer {
                weights: Some(Matrix::average_with_mutation(wa, wb, mutation_max, rng)),
                biases: Some(Matrix::average_with_mutation(ba, bb, mutation_max, rng)),
                activations: Matrix::average_with_mutation(
                    &la.activations,
                    &lb.activations,
                    mutation_max,
                    rng,
                ),
            });
        }

        Network { layers }
    }
}
