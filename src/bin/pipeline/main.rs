use clap::Parser;
use muduo_queue::Result;
use tracing::info;
use tracing_subscriber;

mod pipeline;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let options = pipeline::Options::parse();
    info!("{:?}", options);

    let (summary, stats) = pipeline::run(&options).await?;
    info!("final stats\n{}", stats.report());
    summary.check()?;
    info!("produced {} consumed {}", summary.produced, summary.consumed);
    Ok(())
}
