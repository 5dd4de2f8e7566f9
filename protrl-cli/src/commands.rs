use crate::{
    DesignArgs, DeviceType, EvaluateArgs, OracleArgs, SuggesterKind, TrainMutationArgs,
    TrainPositionArgs, TrainingArgs,
};
use anyhow::{Context, bail};
use candle_core::Device;
use protrl_agents::{
    Checkpointer, MutationPolicy, PPOConfig, PositionPolicy, SequencePositionFeaturizer,
    TrainedPolicy,
};
use protrl_api::{
    ComparisonConfig, Designer, EpisodeMetricsCallback, JsonLinesSink, ProgressCallback,
    TracingSink,
    builders::{EnvBuilderTrait, MutationEnvBuilder, OracleBuilder, PositionEnvBuilder},
    compare_sources,
};
use protrl_core::{
    callbacks::{CallbackList, MetricsSink},
    codec::Alphabet,
    mutation::{MutationSource, RandomMutationSource},
    policy::Persist,
    protein::protein_target,
};
use protrl_envs::{MutationEnvConfig, PositionEnvConfig};
use protrl_oracle::{ConvMaskedLm, FitnessOracle, PlmConfig, PlmSuggester};
use std::{path::Path, sync::Arc};
use tracing::info;

fn device(kind: DeviceType) -> anyhow::Result<Device> {
    Ok(match kind {
        DeviceType::Cpu => Device::Cpu,
        DeviceType::Cuda => Device::new_cuda(0).context("no cuda device available")?,
    })
}

fn ppo_config(path: Option<&Path>) -> anyhow::Result<PPOConfig> {
    let config = match path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("cannot open {}", path.display()))?;
            serde_json::from_reader(file)
                .with_context(|| format!("invalid PPO config {}", path.display()))?
        }
        None => PPOConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn oracle(args: &OracleArgs, device: &Device) -> anyhow::Result<Arc<FitnessOracle>> {
    OracleBuilder::new(&args.oracle_checkpoint, &args.protein)
        .with_device(device.clone())
        .build()
        .with_context(|| format!("cannot load the oracle {}", args.oracle_checkpoint.display()))
}

fn training_callbacks(args: &TrainingArgs, protein: &str) -> anyhow::Result<CallbackList> {
    let length = protein_target(protein)?.bounds.length;
    let sink: Box<dyn MetricsSink> = match &args.metrics {
        Some(path) => Box::new(JsonLinesSink::create(path)?),
        None => Box::new(TracingSink),
    };
    Ok(CallbackList::default()
        .with(ProgressCallback::new(100))
        .with(EpisodeMetricsCallback::new(sink, length, Alphabet::default().len())))
}

fn plm_suggester(path: &Path, device: &Device) -> anyhow::Result<PlmSuggester<ConvMaskedLm>> {
    let model = ConvMaskedLm::new(PlmConfig::new(path), device.clone())?;
    model
        .setup()
        .with_context(|| format!("cannot load the language model {}", path.display()))?;
    Ok(PlmSuggester::new(model, Alphabet::default()))
}

fn trained_mutation_policy(
    protein: &str,
    path: &Path,
    config: PPOConfig,
    device: &Device,
) -> anyhow::Result<TrainedPolicy<SequencePositionFeaturizer>> {
    let env = MutationEnvBuilder::for_protein(protein)?.build_env()?;
    let mut policy = MutationPolicy::for_env(env, config, device.clone())?;
    policy
        .load(path)
        .with_context(|| format!("cannot load the mutation policy {}", path.display()))?;
    Ok(policy.mutation_source())
}

pub fn train_mutation(args: TrainMutationArgs) -> anyhow::Result<()> {
    let device = device(args.oracle.device)?;
    let config = ppo_config(args.training.ppo_config.as_deref())?;
    let oracle = oracle(&args.oracle, &device)?;
    let env = MutationEnvBuilder::for_protein(&args.oracle.protein)?
        .with_scorer(oracle)
        .with_config(MutationEnvConfig {
            max_steps: args.training.max_steps,
            ..Default::default()
        })
        .build_env()?;
    let mut policy = MutationPolicy::for_env(env, config, device)?;
    let mut checkpointer = Checkpointer::new(&args.training.save_dir, args.training.save_freq)?;
    let mut callbacks = training_callbacks(&args.training, &args.oracle.protein)?;
    policy.train(
        args.training.total_steps,
        &mut callbacks,
        Some(&mut checkpointer),
    )?;
    let path = checkpointer.save_final("mutation_policy", &policy)?;
    info!(path = %path.display(), "mutation policy trained");
    Ok(())
}

pub fn train_position(args: TrainPositionArgs, seed: u64) -> anyhow::Result<()> {
    let device = device(args.oracle.device)?;
    let config = ppo_config(args.training.ppo_config.as_deref())?;
    let oracle = oracle(&args.oracle, &device)?;
    let source: Box<dyn MutationSource> = match args.suggester {
        SuggesterKind::Plm => {
            let Some(path) = &args.plm_checkpoint else {
                bail!("--suggester plm needs --plm-checkpoint");
            };
            Box::new(plm_suggester(path, &device)?)
        }
        SuggesterKind::Policy => {
            let Some(path) = &args.mutation_policy else {
                bail!("--suggester policy needs --mutation-policy");
            };
            Box::new(trained_mutation_policy(
                &args.oracle.protein,
                path,
                config.clone(),
                &device,
            )?)
        }
        SuggesterKind::Random => Box::new(RandomMutationSource::new(Alphabet::default(), seed)),
    };
    let env = PositionEnvBuilder::for_protein(&args.oracle.protein)?
        .with_scorer(oracle)
        .with_config(PositionEnvConfig {
            max_steps: args.training.max_steps,
        })
        .build_with_source(source)?;
    let mut policy = PositionPolicy::for_env(env, config, device)?;
    let mut checkpointer = Checkpointer::new(&args.training.save_dir, args.training.save_freq)?;
    let mut callbacks = training_callbacks(&args.training, &args.oracle.protein)?;
    policy.train(
        args.training.total_steps,
        &mut callbacks,
        Some(&mut checkpointer),
    )?;
    let path = checkpointer.save_final("position_policy", &policy)?;
    info!(path = %path.display(), "position policy trained");
    Ok(())
}

pub fn design(args: DesignArgs) -> anyhow::Result<()> {
    let device = device(args.oracle.device)?;
    let config = ppo_config(args.ppo_config.as_deref())?;
    let oracle = oracle(&args.oracle, &device)?;
    let protein = &args.oracle.protein;
    let alphabet = Alphabet::default();

    let mutation =
        trained_mutation_policy(protein, &args.mutation_policy, config.clone(), &device)?;
    // the position env is never stepped, its mutation source is irrelevant
    let env = PositionEnvBuilder::for_protein(protein)?
        .build_with_source(Box::new(RandomMutationSource::new(alphabet.clone(), 0)))?;
    let mut position = PositionPolicy::for_env(env, config, device)?;
    position.load(&args.position_policy).with_context(|| {
        format!(
            "cannot load the position policy {}",
            args.position_policy.display()
        )
    })?;

    let start = match &args.start {
        Some(start) => start.clone(),
        None => protein_target(protein)?.wild_type.to_owned(),
    };
    let designer = Designer::new(
        position.inference_policy(alphabet.clone()),
        mutation,
        &*oracle,
        alphabet,
    );
    let trajectory = designer.design(&start, args.iterations)?;
    if let Some(last) = trajectory.last() {
        info!(fitness = last.fitness, sequence = %last.sequence, "design finished");
    }
    if let Some(output) = &args.output {
        let file = std::fs::File::create(output)
            .with_context(|| format!("cannot create {}", output.display()))?;
        serde_json::to_writer_pretty(file, &trajectory)?;
    }
    Ok(())
}

pub fn evaluate(args: EvaluateArgs, seed: u64) -> anyhow::Result<()> {
    let device = device(args.oracle.device)?;
    let oracle = oracle(&args.oracle, &device)?;
    let protein = &args.oracle.protein;
    let alphabet = Alphabet::default();

    let random = RandomMutationSource::new(alphabet.clone(), seed);
    let plm = args
        .plm_checkpoint
        .as_deref()
        .map(|path| plm_suggester(path, &device))
        .transpose()?;
    let policy = match &args.mutation_policy {
        Some(path) => {
            let config = ppo_config(args.ppo_config.as_deref())?;
            Some(trained_mutation_policy(protein, path, config, &device)?)
        }
        None => None,
    };
    let mut sources: Vec<(&str, &dyn MutationSource)> = Vec::new();
    sources.push(("random", &random));
    if let Some(plm) = &plm {
        sources.push(("plm", plm));
    }
    if let Some(policy) = &policy {
        sources.push(("policy", policy));
    }

    let report = compare_sources(
        protein_target(protein)?.wild_type,
        &alphabet,
        &*oracle,
        &sources,
        ComparisonConfig {
            samples: args.samples,
            mutations: args.mutations,
            seed,
        },
    )?;
    for source in &report.sources {
        info!(
            source = %source.name,
            improvements = source.improvements,
            improvement_rate = source.improvement_rate(),
            mean_fitness = source.mean_fitness(),
            "evaluation"
        );
    }
    if let Some(output) = &args.output {
        let file = std::fs::File::create(output)
            .with_context(|| format!("cannot create {}", output.display()))?;
        serde_json::to_writer_pretty(file, &report)?;
    }
    Ok(())
}
