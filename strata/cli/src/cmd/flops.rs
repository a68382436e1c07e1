use anyhow::{Context, Result};
use clap::Args;

use strata_nn::conv_flops;

#[derive(Args)]
pub struct FlopsArgs {
    /// Weight shape as F,C,KH,KW.
    #[arg(long, value_name = "F,C,KH,KW", value_delimiter = ',', required = true)]
    weight: Vec<usize>,

    /// Input shape as N,C,H,W.
    #[arg(long, value_name = "N,C,H,W", value_delimiter = ',', required = true)]
    input: Vec<usize>,

    /// Padding as HEIGHT,WIDTH.
    #[arg(long, value_delimiter = ',', default_value = "1,1")]
    pad: Vec<usize>,

    /// Stride as HEIGHT,WIDTH.
    #[arg(long, value_delimiter = ',', default_value = "1,1")]
    stride: Vec<usize>,

    /// Count an activation after the convolution.
    #[arg(long)]
    activation: bool,
}

pub fn run(args: FlopsArgs) -> Result<()> {
    let weight = super::nchw("--weight", &args.weight)?;
    let input = super::nchw("--input", &args.input)?;
    let pad = super::pair("--pad", &args.pad)?;
    let stride = super::pair("--stride", &args.stride)?;

    let flops = conv_flops(&weight, &input, pad, stride, args.activation)
        .context("Failed to estimate FLOPs")?;
    println!("{}", flops);
    Ok(())
}
