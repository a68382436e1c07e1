use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use strata_graph::{DType, Graph};
use strata_nn::{ConvData, FlopsCounter, Layer, Term};

#[derive(Args)]
pub struct InspectArgs {
    /// JSON layer description.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Input shape as N,C,H,W.
    #[arg(long, value_name = "N,C,H,W", value_delimiter = ',', required = true)]
    input: Vec<usize>,

    /// Layer name.
    #[arg(long, default_value = "conv")]
    name: String,

    /// Seed for weight initialization (random if omitted).
    #[arg(long)]
    seed: Option<u64>,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let input = super::nchw("--input", &args.input)?;
    let data = ConvData::from_json_file(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    if data.size.is_empty() {
        bail!("{} does not set a size", args.config.display());
    }
    let dtype: DType = data.precision.into();

    let g = match args.seed {
        Some(seed) => Graph::with_seed(seed),
        None => Graph::new(),
    };
    let x = g.placeholder(dtype, input.clone(), "input");

    let mut layer = data.build(&args.name).context("Invalid layer description")?;
    let y = layer.fwd(&x).context("Forward pass failed")?;
    let flops = layer
        .estimate_flops(&input)
        .context("Failed to estimate FLOPs")?;
    log::debug!("graph has {} nodes", g.len());

    println!("Layer   : {} ({})", layer.name(), layer.kind());
    println!("DType   : {}", dtype);
    println!("Weight  : {}", layer.shape()?);
    println!("Input   : {}", input);
    println!("Output  : {}", y.shape());
    println!("FLOPs   : {}", flops);
    if data.compute_flops {
        println!("Recorded: {}", layer.flops());
    }
    Ok(())
}
