use clap::Parser;
use nicodl::{Config, Ffmpeg, Interrupt, Session, YtDlp};
use tokio::io::BufReader;

/// Interactive niconico downloader. Takes no arguments; everything happens in the menu.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "nicodl=warn".into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run() -> nicodl::Result<()> {
    println!("Welcome to the Niconico Downloader!");
    println!("This tool downloads the highest quality available for the video you choose.");
    println!("Press Ctrl+C at any time to cancel the current operation and return to the main menu.");

    let interrupt = Interrupt::new();
    interrupt.listen();

    let config = Config::from_env();
    tracing::debug!("{:?}", config);
    println!("Default output directory: {}", config.output_dir.display());

    let mut session = Session::new(
        config.output_dir,
        YtDlp::new(config.ytdlp),
        Ffmpeg::new(config.ffmpeg),
        interrupt,
    );
    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    session.run(stdin, &mut stdout).await
}

#[tokio::main]
async fn main() {
    let _args: Args = Args::parse();
    init_tracing();
    match run().await {
        Ok(_) => {}
        Err(err) => println!("An unexpected error occurred: {}", err),
    };
}
