use logline::format::FormatCache;
use logline::runtime::{boot, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let cache = FormatCache::new();
    let rt = boot::boot(&cache)?;
    let sources = run::Source::from_args(std::env::args().skip(1).collect());
    run::run(rt, sources).await?;
    Ok(())
}
