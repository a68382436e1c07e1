pub mod flops;
pub mod inspect;

use anyhow::{bail, Result};
use clap::Subcommand;
use strata_graph::Shape;

#[derive(Subcommand)]
pub enum Command {
    /// Build a layer from a JSON description and report its shapes.
    Inspect(inspect::InspectArgs),

    /// Estimate the FLOPs of a convolution without building it.
    Flops(flops::FlopsArgs),
}

pub fn run(command: Command) -> Result<()> {
    match command {
        Command::Inspect(args) => inspect::run(args),
        Command::Flops(args) => flops::run(args),
    }
}

/// Checks that a comma-separated dimension list is 4-D.
fn nchw(what: &str, dims: &[usize]) -> Result<Shape> {
    if dims.len() != 4 {
        bail!("{} must have 4 dimensions, got {:?}", what, dims);
    }
    Ok(Shape::new(dims))
}

fn pair(what: &str, values: &[usize]) -> Result<(usize, usize)> {
    match values {
        [h, w] => Ok((*h, *w)),
        _ => bail!("{} must be HEIGHT,WIDTH, got {:?}", what, values),
    }
}
