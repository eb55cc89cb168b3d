use super::MlpConfig;
use anyhow::Result;
use candle_core::{Module, Tensor};
use candle_nn::{linear, Linear, VarBuilder};

/// Returns vector of linear modules from [`MlpConfig`].
fn create_linear_layers(vb: &VarBuilder, config: &MlpConfig) -> Result<Vec<Linear>> {
    let dims: Vec<usize> = std::iter::once(config.in_dim)
        .chain(config.units.iter().copied())
        .chain(std::iter::once(config.out_dim))
        .collect();

    dims.windows(2)
        .enumerate()
        .map(|(i, d)| Ok(linear(d[0], d[1], vb.pp(format!("ln{}", i)))?))
        .collect()
}

/// Multilayer perceptron with ReLU activation function.
///
/// Hidden layers are given by `units`; with no hidden layer it is a single
/// linear map.
pub struct Mlp {
    config: MlpConfig,
    layers: Vec<Linear>,
}

impl Mlp {
    /// Builds the layers with the given [`VarBuilder`].
    pub fn build(vb: VarBuilder, config: MlpConfig) -> Result<Self> {
        let layers = create_linear_layers(&vb, &config)?;
        Ok(Self { config, layers })
    }

    /// Applies the layers on the last dimension of `xs`.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let n_layers = self.layers.len();
        let mut xs = xs.clone();

        for (i, layer) in self.layers.iter().enumerate() {
            xs = layer.forward(&xs)?;
            if i + 1 < n_layers || self.config.activation_out {
                xs = xs.relu()?;
            }
        }

        Ok(xs)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::VarMap;

    #[test]
    fn test_mlp_shapes_and_vars() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb.pp("actor"), MlpConfig::new(3, vec![8, 8], 2, false))?;

        let xs = Tensor::ones((5, 3), DType::F32, &Device::Cpu)?;
        assert_eq!(mlp.forward(&xs)?.dims(), &[5, 2]);

        let mut names: Vec<_> = varmap.data().lock().unwrap().keys().cloned().collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "actor.ln0.bias",
                "actor.ln0.weight",
                "actor.ln1.bias",
                "actor.ln1.weight",
                "actor.ln2.bias",
                "actor.ln2.weight",
            ]
        );
        Ok(())
    }

    #[test]
    fn test_activation_out() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let mlp = Mlp::build(vb, MlpConfig::new(4, vec![], 6, true))?;

        let xs = Tensor::randn(0f32, 1.0, (10, 4), &Device::Cpu)?;
        let ys: Vec<f32> = mlp.forward(&xs)?.flatten_all()?.to_vec1()?;
        assert!(ys.iter().all(|y| *y >= 0.0));
        Ok(())
    }
}
