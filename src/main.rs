use std::env;
use std::path::Path;

use anyhow::bail;
use log::info;

use daesplit::SplitContext;
use daesplit::document;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let Some(input) = env::args().nth(1) else {
        bail!("usage: daesplit <scene.dae>");
    };

    let doc = document::load(Path::new(&input))?;
    let mut context = SplitContext::new(doc)?;
    let written = context.split_into(Path::new("."))?;
    info!("split {input} into {} clip file(s)", written.len());
    Ok(())
}
