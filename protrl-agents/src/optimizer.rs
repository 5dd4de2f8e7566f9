use candle_core::{Result, Tensor, backprop::GradStore};
use candle_nn::{AdamW, Optimizer, ParamsAdamW, VarMap};
use std::fmt::Debug;

/// Backpropagates `loss` and rescales the gradients of `varmap` so that their joint L2 norm does
/// not exceed `max_norm`.
pub fn clip_grad(loss: &Tensor, varmap: &VarMap, max_norm: f32) -> Result<GradStore> {
    let mut grad_store = loss.backward()?;
    let all_vars = varmap.all_vars();
    let mut total_norm_squared = 0f32;
    let mut clipped = vec![];
    for var in all_vars.iter() {
        if let Some(grad) = grad_store.get_id(var.id()) {
            total_norm_squared += grad.sqr()?.sum_all()?.to_scalar::<f32>()?;
            clipped.push((var, grad.clone()));
        }
    }
    let total_norm = total_norm_squared.sqrt();
    if total_norm > max_norm {
        let clip_coef = (max_norm / (total_norm + 1e-6)) as f64;
        for (var, grad) in clipped {
            grad_store.insert(var.as_tensor(), grad.affine(clip_coef, 0.)?);
        }
    }
    Ok(grad_store)
}

pub struct OptimizerWithMaxGrad {
    pub optimizer: AdamW,
    pub max_grad_norm: Option<f32>,
    pub varmap: VarMap,
}

impl Debug for OptimizerWithMaxGrad {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OptimizerWithMaxGrad")
            .field("learning_rate", &self.optimizer.learning_rate())
            .field("max_grad_norm", &self.max_grad_norm)
            .finish()
    }
}

impl OptimizerWithMaxGrad {
    pub fn new(varmap: VarMap, learning_rate: f64, max_grad_norm: Option<f32>) -> Result<Self> {
        let params = ParamsAdamW {
            lr: learning_rate,
            weight_decay: 0.,
            ..Default::default()
        };
        let optimizer = AdamW::new(varmap.all_vars(), params)?;
        Ok(Self {
            optimizer,
            max_grad_norm,
            varmap,
        })
    }

    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        let grads = match self.max_grad_norm {
            Some(max_norm) => clip_grad(loss, &self.varmap, max_norm)?,
            None => loss.backward()?,
        };
        self.optimizer.step(&grads)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use candle_core::{DType, Device};
    use candle_nn::{Init, VarBuilder};

    #[test]
    fn gradients_are_rescaled_to_the_max_norm() -> Result<()> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let weight = vb.get_with_hints(4, "w", Init::Const(1.))?;
        // d/dw sum(10 * w) = 10 for every entry, a norm of 20
        let loss = weight.affine(10., 0.)?.sum_all()?;
        let grads = clip_grad(&loss, &varmap, 0.5)?;
        let grad = grads.get(&weight).map(|g| g.to_vec1::<f32>()).transpose()?;
        let grad = grad.unwrap_or_default();
        let norm = grad.iter().map(|g| g * g).sum::<f32>().sqrt();
        assert!((norm - 0.5).abs() < 1e-4);
        Ok(())
    }
}
