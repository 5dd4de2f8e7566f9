use candle_core::{Result, Tensor};
use candle_nn::{Activation, Linear, Module, VarBuilder, linear};
use either::Either;

#[derive(Debug, Clone)]
pub struct LinearLayer(pub Linear);

impl LinearLayer {
    pub fn new(in_dim: usize, out_dim: usize, vb: &VarBuilder, prefix: &str) -> Result<Self> {
        Ok(Self(linear(in_dim, out_dim, vb.pp(prefix))?))
    }
}

impl Module for LinearLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.0.forward(xs)
    }
}

#[derive(Debug, Clone)]
pub struct ActivationLayer(pub Activation);

impl Module for ActivationLayer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        self.0.forward(xs)
    }
}

#[derive(Debug, Clone)]
pub struct Layer(pub Either<LinearLayer, ActivationLayer>);

impl Layer {
    pub fn linear(linear: LinearLayer) -> Self {
        Self(Either::Left(linear))
    }

    pub fn activation(activation: ActivationLayer) -> Self {
        Self(Either::Right(activation))
    }
}

impl Module for Layer {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        match &self.0 {
            Either::Left(linear) => linear.forward(xs),
            Either::Right(activation) => activation.forward(xs),
        }
    }
}

/// Cloning shares the parameters, the clone sees every optimizer step of the original.
#[derive(Default, Debug, Clone)]
pub struct Sequential {
    layers: Vec<Layer>,
}

impl Sequential {
    pub fn add_layer(mut self, layer: Layer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl Module for Sequential {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let mut xs = xs.clone();
        for layer in self.layers.iter() {
            xs = layer.forward(&xs)?
        }
        Ok(xs)
    }
}

/// Linear layers of the given sizes with `activation` between them, none after the last one.
/// Parameters are named `{prefix}{layer_idx}.weight` / `.bias`.
pub fn build_sequential(
    input_dim: usize,
    layers: &[usize],
    activation: Activation,
    vb: &VarBuilder,
    prefix: &str,
) -> Result<Sequential> {
    let mut last_dim = input_dim;
    let mut nn = Sequential::default();
    let num_layers = layers.len();
    for (layer_idx, layer_size) in layers.iter().enumerate() {
        let layer_pp = format!("{prefix}{layer_idx}");
        let lin_layer = LinearLayer::new(last_dim, *layer_size, vb, &layer_pp)?;
        nn = nn.add_layer(Layer::linear(lin_layer));
        if layer_idx != num_layers - 1 {
            nn = nn.add_layer(Layer::activation(ActivationLayer(activation)));
        }
        last_dim = *layer_size;
    }
    Ok(nn)
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn hidden_layers_get_activations() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let nn = build_sequential(6, &[4, 4, 3], Activation::Relu, &vb, "pi")?;
        assert_eq!(nn.len(), 5);
        let out = nn.forward(&Tensor::zeros((2, 6), DType::F32, &Device::Cpu)?)?;
        assert_eq!(out.dims(), &[2, 3]);
        let mut names: Vec<String> = varmap.data().lock().unwrap().keys().cloned().collect();
        names.sort();
        assert_eq!(names[0], "pi0.bias");
        assert_eq!(names.len(), 6);
        Ok(())
    }
}
