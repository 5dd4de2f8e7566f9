use crate::{
    distribution::CategoricalDistribution,
    featurizer::Featurizer,
    optimizer::OptimizerWithMaxGrad,
    policy::ActorCriticPolicy,
    rollout::{RolloutBatch, RolloutBatchIterator},
    sequential::build_sequential,
    tensors::{EntropyLoss, Logp, LogpDiff, PolicyLoss, ValueLoss, ValuesPred},
};
use candle_core::{DType, Device, Tensor};
use candle_nn::{Activation, VarBuilder, VarMap};
use protrl_core::{
    Error, Result,
    agents::Agent,
    policy::Persist,
    utils::rollout_buffer::{
        Advantages, Logps, Returns, RolloutBuffer, calculate_advantages_and_returns,
    },
};
use serde::{Deserialize, Serialize};
use std::{ops::Deref, path::Path};
use tracing::{debug, info};

/// Hyper parameters of the actor critic and of the optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PPOConfig {
    /// Environment steps collected per rollout
    pub n_steps: usize,
    pub batch_size: usize,
    /// Passes over every rollout
    pub n_epochs: usize,
    pub gamma: f32,
    pub gae_lambda: f32,
    pub clip_range: f32,
    pub learning_rate: f64,
    pub vf_coef: f32,
    pub ent_coef: f32,
    pub max_grad_norm: Option<f32>,
    pub normalize_advantage: bool,
    /// Stops the epochs of a rollout early once the approximate KL divergence exceeds 1.5 times
    /// this value
    pub target_kl: Option<f32>,
    pub policy_layers: Vec<usize>,
    pub value_layers: Vec<usize>,
    pub activation: ActivationFn,
}

/// Activation between the hidden layers of both networks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivationFn {
    #[default]
    Relu,
    Silu,
    Sigmoid,
}

impl From<ActivationFn> for Activation {
    fn from(activation: ActivationFn) -> Self {
        match activation {
            ActivationFn::Relu => Activation::Relu,
            ActivationFn::Silu => Activation::Silu,
            ActivationFn::Sigmoid => Activation::Sigmoid,
        }
    }
}

impl Default for PPOConfig {
    fn default() -> Self {
        Self {
            n_steps: 2048,
            batch_size: 64,
            n_epochs: 10,
            gamma: 0.99,
            gae_lambda: 0.95,
            clip_range: 0.2,
            learning_rate: 3e-4,
            vf_coef: 0.5,
            ent_coef: 0.,
            max_grad_norm: Some(0.5),
            normalize_advantage: true,
            target_kl: None,
            policy_layers: vec![64, 64],
            value_layers: vec![64, 64],
            activation: ActivationFn::Relu,
        }
    }
}

impl PPOConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_steps == 0 || self.batch_size == 0 || self.n_epochs == 0 {
            return Err(Error::config(
                "n_steps, batch_size and n_epochs must be at least 1",
            ));
        }
        if !(0. ..=1.).contains(&self.gamma) || !(0. ..=1.).contains(&self.gae_lambda) {
            return Err(Error::config("gamma and gae_lambda must lie in [0, 1]"));
        }
        Ok(())
    }
}

pub enum HookResult {
    Continue,
    Break,
}

pub struct PPOBatchData {
    pub logp: Logp,
    pub values_pred: ValuesPred,
    pub logp_diff: LogpDiff,
    pub ratio: Tensor,
}

macro_rules! process_hook_result {
    ($hook_res:expr) => {
        match $hook_res? {
            HookResult::Continue => {}
            HookResult::Break => return Ok(()),
        }
    };
}

pub trait PPOHooksTrait<F> {
    fn before_learning_hook(
        &mut self,
        _ppo: &mut PPOCore<F>,
        _rollouts: &mut [RolloutBuffer<Vec<f32>>],
        _advantages: &mut Advantages,
        _returns: &mut Returns,
    ) -> Result<HookResult> {
        Ok(HookResult::Continue)
    }

    /// Called after every pass over the rollouts, `Break` ends the learning phase.
    fn rollout_hook(
        &mut self,
        _ppo: &mut PPOCore<F>,
        _rollouts: &[RolloutBuffer<Vec<f32>>],
    ) -> Result<HookResult> {
        Ok(HookResult::Break)
    }

    fn batch_hook(
        &mut self,
        _ppo: &mut PPOCore<F>,
        _batch: &RolloutBatch,
        _policy_loss: &mut PolicyLoss,
        _value_loss: &mut ValueLoss,
        _data: &PPOBatchData,
    ) -> Result<HookResult> {
        Ok(HookResult::Continue)
    }
}

/// Epoch count, advantage normalization and KL based early stopping.
#[derive(Debug, Default)]
pub struct DefaultPPOHooks {
    epoch: usize,
    stop: bool,
    policy_losses: Vec<f32>,
    value_losses: Vec<f32>,
    approx_kls: Vec<f32>,
}

fn mean(values: &[f32]) -> f32 {
    if values.is_empty() {
        0.
    } else {
        values.iter().sum::<f32>() / values.len() as f32
    }
}

impl<F> PPOHooksTrait<F> for DefaultPPOHooks {
    fn before_learning_hook(
        &mut self,
        ppo: &mut PPOCore<F>,
        _rollouts: &mut [RolloutBuffer<Vec<f32>>],
        advantages: &mut Advantages,
        _returns: &mut Returns,
    ) -> Result<HookResult> {
        *self = Self::default();
        if ppo.config.normalize_advantage {
            advantages.normalize();
        }
        Ok(HookResult::Continue)
    }

    fn rollout_hook(
        &mut self,
        ppo: &mut PPOCore<F>,
        _rollouts: &[RolloutBuffer<Vec<f32>>],
    ) -> Result<HookResult> {
        self.epoch += 1;
        if self.epoch < ppo.config.n_epochs && !self.stop {
            return Ok(HookResult::Continue);
        }
        info!(
            epochs = self.epoch,
            early_stop = self.stop,
            policy_loss = mean(&self.policy_losses),
            value_loss = mean(&self.value_losses),
            approx_kl = mean(&self.approx_kls),
            "ppo update"
        );
        Ok(HookResult::Break)
    }

    fn batch_hook(
        &mut self,
        ppo: &mut PPOCore<F>,
        _batch: &RolloutBatch,
        policy_loss: &mut PolicyLoss,
        value_loss: &mut ValueLoss,
        data: &PPOBatchData,
    ) -> Result<HookResult> {
        let approx_kl = (data.ratio.affine(1., -1.)? - data.logp_diff.deref())?
            .mean_all()?
            .to_scalar::<f32>()?;
        self.policy_losses.push(policy_loss.to_scalar::<f32>()?);
        self.value_losses.push(value_loss.to_scalar::<f32>()?);
        self.approx_kls.push(approx_kl);
        match ppo.config.target_kl {
            Some(target_kl) if approx_kl > 1.5 * target_kl => {
                debug!(epoch = self.epoch, approx_kl, "kl target reached");
                self.stop = true;
                Ok(HookResult::Break)
            }
            _ => Ok(HookResult::Continue),
        }
    }
}

pub struct PPOCore<F> {
    pub policy: ActorCriticPolicy<F>,
    pub optimizer: OptimizerWithMaxGrad,
    pub config: PPOConfig,
}

pub struct PPO<F> {
    pub ppo: PPOCore<F>,
    pub hooks: Box<dyn PPOHooksTrait<F>>,
}

impl<F> PPO<F> {
    pub fn new<O>(
        featurizer: F,
        action_size: usize,
        config: PPOConfig,
        device: Device,
    ) -> Result<Self>
    where
        F: Featurizer<O>,
    {
        config.validate()?;
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &device);
        let input_dim = featurizer.feature_size();
        let distribution = CategoricalDistribution::build(
            input_dim,
            action_size,
            &config.policy_layers,
            config.activation.into(),
            &vb,
            "pi",
        )?;
        let value_sizes: Vec<usize> = config.value_layers.iter().copied().chain([1]).collect();
        let value_net = build_sequential(input_dim, &value_sizes, config.activation.into(), &vb, "vf")?;
        let optimizer =
            OptimizerWithMaxGrad::new(varmap, config.learning_rate, config.max_grad_norm)?;
        Ok(Self {
            ppo: PPOCore {
                policy: ActorCriticPolicy {
                    distribution,
                    value_net,
                    featurizer,
                    device,
                },
                optimizer,
                config,
            },
            hooks: Box::new(DefaultPPOHooks::default()),
        })
    }

    pub fn config(&self) -> &PPOConfig {
        &self.ppo.config
    }

    fn batching_loop(&mut self, batch_iter: &mut RolloutBatchIterator) -> Result<()> {
        let ppo = &mut self.ppo;
        loop {
            let Some(batch) = batch_iter.next() else {
                return Ok(());
            };
            let batch = batch?;
            let distribution = &ppo.policy.distribution;
            let logp = Logp(distribution.log_probs(&batch.features, &batch.actions)?);
            let values_pred = ValuesPred(ppo.policy.values(&batch.features)?);
            let mut value_loss = ValueLoss(batch.returns.sub(&values_pred)?.sqr()?.mean_all()?);
            let logp_diff = LogpDiff((logp.deref() - &batch.logp_old)?);
            let ratio = logp_diff.exp()?;
            let clip_range = ppo.config.clip_range as f64;
            let clip_adv =
                (ratio.clamp(1. - clip_range, 1. + clip_range)? * &batch.advantages)?;
            let mut policy_loss = PolicyLoss(
                Tensor::minimum(&(&ratio * &batch.advantages)?, &clip_adv)?
                    .neg()?
                    .mean_all()?,
            );
            let entropy_loss =
                EntropyLoss(distribution.entropy(&batch.features)?.mean_all()?.neg()?);
            let ppo_data = PPOBatchData {
                logp,
                values_pred,
                logp_diff,
                ratio,
            };
            let hook_result =
                self.hooks
                    .batch_hook(ppo, &batch, &mut policy_loss, &mut value_loss, &ppo_data)?;
            let loss = policy_loss
                .add(&value_loss.affine(ppo.config.vf_coef as f64, 0.)?)?
                .add(&entropy_loss.affine(ppo.config.ent_coef as f64, 0.)?)?;
            ppo.optimizer.backward_step(&loss)?;
            match hook_result {
                HookResult::Break => return Ok(()),
                HookResult::Continue => {}
            }
        }
    }

    fn learning_loop(
        &mut self,
        rollouts: Vec<RolloutBuffer<Vec<f32>>>,
        advantages: Advantages,
        returns: Returns,
        logps: Logps,
    ) -> Result<()> {
        loop {
            let mut batch_iter = RolloutBatchIterator::new(
                &rollouts,
                &advantages,
                &returns,
                &logps,
                self.ppo.config.batch_size,
                self.ppo.policy.device.clone(),
            );
            self.batching_loop(&mut batch_iter)?;
            let rollout_hook_res = self.hooks.rollout_hook(&mut self.ppo, &rollouts);
            process_hook_result!(rollout_hook_res);
        }
    }
}

impl<F: Clone> Agent for PPO<F> {
    type Policy = ActorCriticPolicy<F>;
    type State = Vec<f32>;

    fn policy(&self) -> Self::Policy {
        self.ppo.policy.clone()
    }

    fn learn(&mut self, mut rollouts: Vec<RolloutBuffer<Vec<f32>>>) -> Result<()> {
        rollouts.retain(|rollout| !rollout.is_empty());
        if rollouts.is_empty() {
            return Ok(());
        }
        let values = rollouts
            .iter()
            .map(|rollout| self.ppo.policy.values_of(&rollout.states))
            .collect::<Result<Vec<Vec<f32>>>>()?;
        let (mut advantages, mut returns) = calculate_advantages_and_returns(
            &rollouts,
            &values,
            self.ppo.config.gamma,
            self.ppo.config.gae_lambda,
        );
        let before_learning_hook_res = self.hooks.before_learning_hook(
            &mut self.ppo,
            &mut rollouts,
            &mut advantages,
            &mut returns,
        );
        process_hook_result!(before_learning_hook_res);
        let logps = Logps::new(&rollouts);
        self.learning_loop(rollouts, advantages, returns, logps)
    }
}

impl<F> Persist for PPO<F> {
    fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        self.ppo.optimizer.varmap.save(path)?;
        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(Error::checkpoint(format!(
                "{} does not exist",
                path.display()
            )));
        }
        self.ppo.optimizer.varmap.load(path)?;
        Ok(())
    }
}
