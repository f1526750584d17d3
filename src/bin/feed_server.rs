use abx_client::sim::{fixture_packets, Feed, FeedServer};
use anyhow::Result;
use clap::Parser;
use crossbeam_channel::bounded;

#[derive(Debug, Parser)]
#[command(about = "Serve a simulated ABX trade feed for local testing")]
struct Args {
    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: String,

    /// Number of fixture packets (sequences 1..=count)
    #[arg(long, default_value_t = 14)]
    count: i32,

    /// Sequences left out of the stream response (comma separated)
    #[arg(long, value_delimiter = ',')]
    withhold: Vec<i32>,

    /// Sequences never served on resend (comma separated)
    #[arg(long, value_delimiter = ',')]
    unavailable: Vec<i32>,

    /// Drop the stream connection part-way through the frame after this many
    #[arg(long)]
    cut_after: Option<usize>,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut feed = Feed::new(fixture_packets(args.count))
        .withhold(args.withhold.iter().copied())
        .unavailable(args.unavailable.iter().copied());
    if let Some(n) = args.cut_after {
        feed = feed.cut_stream_after(n);
    }

    let server = FeedServer::start(&args.bind, feed)?;
    eprintln!("feed server listening on {} ({} packets); Ctrl+C to stop", server.local_addr(), args.count);

    let (tx, rx) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })?;
    let _ = rx.recv();

    let served = server.requests().len();
    drop(server);
    eprintln!("served {} requests", served);
    Ok(())
}
