use std::sync::Arc;
use std::time::Duration;

use pagesim::config::Config;
use pagesim::driver::ChannelSink;
use pagesim::driver::Driver;
use pagesim::driver::Event;
use pagesim::error::Error;
use pagesim::error::Result;
use pagesim::render::TraceDisplay;
use pagesim::sim::Simulator;
use tokio::sync::broadcast;

#[tokio::main]
async fn main() -> Result<()> {
    let file = std::env::args().nth(1).unwrap_or_default();
    let cfg = Config::new(&file)?;
    env_logger::Builder::new().parse_filters(&cfg.log_level).init();

    let sequence = cfg.parse_sequence()?;
    let sim = Simulator::new(sequence, cfg.frame_count)?;
    let (sink, mut events) = ChannelSink::new();
    let tick_interval = Duration::from_millis(cfg.tick_interval_ms);
    let driver = Arc::new(Driver::new(sim, Box::new(sink), tick_interval));

    let (done_tx, done_rx) = broadcast::channel(1);
    let serving = {
        let driver = Arc::clone(&driver);
        tokio::spawn(async move { driver.serve(done_rx).await })
    };
    driver.start().await?;

    // animate one reference per tick, then print the full table
    let mut trace = Vec::new();
    let (faults, hits) = loop {
        match events.recv().await {
            Some(Event::Step(outcome)) => {
                println!("{}", outcome);
                trace.push(outcome);
            }
            Some(Event::Complete { faults, hits }) => break (faults, hits),
            None => return Err(Error::internal("event channel closed before completion")),
        }
    };
    drop(done_tx);
    serving.await??;

    println!();
    println!("{}", TraceDisplay::new(cfg.frame_count, &trace));
    println!("page faults: {}, hits: {}", faults, hits);
    Ok(())
}
