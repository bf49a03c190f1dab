use collector::ingest::Sinks;
use collector::runtime::{boot, run};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let state = boot::boot().await?;
    run::run(state, Sinks::stdout()).await
}
