use std::time::Duration;

use clap::Parser;
use dfsstress_engine::{ObserverSet, PhaseReport, RunDriver, RunLimit, StressConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "dfsstress",
    version,
    about = "Distributed file system convergence stress test",
    long_about = "Generates disjoint file sets at every client mount and waits for the \
server mount and every other client to observe byte-identical copies, then modified \
copies, then their absence, timing each phase."
)]
struct Cli {
    /// Number of files to generate per client mount.
    num_files: usize,

    /// Server mount path.
    server_mount: String,

    /// Client mount paths (at least one).
    #[arg(required = true)]
    client_mounts: Vec<String>,

    /// Sleep between verification scans, in milliseconds (0 = tight loop).
    #[arg(long, default_value_t = 0)]
    poll_interval_ms: u64,

    /// Abort a phase that has not converged after this many seconds.
    /// Unset, a phase waits forever; a hang means the system under test
    /// is broken.
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Stop after this many full cycles instead of soaking forever.
    #[arg(long)]
    runs: Option<u64>,

    /// Emit one JSON object per phase report instead of the text line.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() {
    // Any malformed invocation exits 1 with the syntax message; --help
    // and --version keep clap's usual exit code.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            use clap::error::ErrorKind;
            if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) {
                err.exit();
            }
            let _ = err.print();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        eprintln!("dfsstress: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = StressConfig {
        num_files: cli.num_files,
        poll_interval: Duration::from_millis(cli.poll_interval_ms),
        phase_deadline: cli.deadline_secs.map(Duration::from_secs),
        run_limit: cli.runs.map_or(RunLimit::Soak, RunLimit::Count),
    };
    config.validate()?;

    let observers = ObserverSet::open(&cli.server_mount, &cli.client_mounts)?;
    let driver = RunDriver::new(&observers, &config);

    let json = cli.json;
    let print = move |report: &PhaseReport| {
        if json {
            match serde_json::to_string(report) {
                Ok(line) => println!("{line}"),
                Err(err) => eprintln!("dfsstress: failed to encode report: {err}"),
            }
        } else {
            println!("{}", report.summary_line());
        }
    };

    tokio::select! {
        result = driver.run(print) => {
            let cycles = result?;
            info!(cycles, "run limit reached");
        }
        _ = tokio::signal::ctrl_c() => {
            eprintln!("dfsstress: interrupted, stopping");
        }
    }

    Ok(())
}
