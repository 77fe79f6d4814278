use std::path::Path;

use anyhow::Context;
use spn_bench_lib::{GeneratorOptions, generate_dataset, logger::Logger};

use crate::Args;

/// Runs the binning generator. The target folder may contain a
/// `generate.toml` overriding the defaults; the dataset lands in
/// `<target>/dataset/`.
pub fn generate(logger: &Logger, args: &Args) -> anyhow::Result<()> {
    let Some(folder) = &args.target else {
        anyhow::bail!("missing required folder argument");
    };
    let folder = Path::new(folder);

    let config_path = folder.join("generate.toml");
    let options = if config_path.exists() {
        logger.info(&format!("loading options from {}", config_path.display()));
        GeneratorOptions::load_from_path(&config_path)
            .with_context(|| format!("failed to load config: {}", config_path.display()))?
    } else {
        logger.info("no generate.toml found, using default options");
        GeneratorOptions::default()
    };

    let out_dir = folder.join("dataset");
    let summary = generate_dataset(options, &out_dir, Some(logger))
        .context("dataset generation failed")?;

    logger.info(&format!(
        "wrote {} SPNs to {}",
        summary.accepted,
        out_dir.display()
    ));

    Ok(())
}
