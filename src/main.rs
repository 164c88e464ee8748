use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use garde::Validate;
use tracing_subscriber::EnvFilter;

use video_analysis_client::models::job::JobId;
use video_analysis_client::models::video::LoadError;
use video_analysis_client::services::scoring;
use video_analysis_client::{
    AnalysisApi, ClientConfig, HttpAnalysisClient, JobController, JobSettings, JobState, VideoFile,
};

#[derive(Debug, Parser)]
#[command(name = "video-analysis", version, about = "Submit presentation videos for analysis")]
struct Cli {
    /// Analysis service origin (overrides ANALYSIS_API_BASE_URL)
    #[arg(long, global = true)]
    api_base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a video, wait for the analysis and print the score
    Analyze {
        path: PathBuf,

        /// Frame rate hint for the analyzer
        #[arg(long)]
        target_fps: Option<u32>,

        /// Delay between status queries in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,

        /// Stop waiting after this many seconds (0 waits forever)
        #[arg(long)]
        max_poll_secs: Option<u64>,
    },
    /// Print the status of an existing analysis
    Status { id: String },
    /// Print the score summary of a completed analysis
    Results { id: String },
    /// Print the service's own grade for a completed analysis
    Score { id: String },
    /// Print the service's detailed feedback for a completed analysis
    Feedback { id: String },
    /// Print the service's analysis summary statistics
    Summary,
    /// Check that the analysis service is reachable
    Ping,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Logs go to stderr so stdout stays readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .json()
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = ClientConfig::from_env().expect("Failed to load configuration from environment");
    if let Some(url) = cli.api_base_url {
        config.api_base_url = url;
    }
    if let Command::Analyze {
        target_fps,
        interval_ms,
        max_poll_secs,
        ..
    } = &cli.command
    {
        config.target_fps = target_fps.or(config.target_fps);
        config.poll_interval_ms = interval_ms.unwrap_or(config.poll_interval_ms);
        config.max_poll_duration_secs = max_poll_secs.unwrap_or(config.max_poll_duration_secs);
    }
    config.validate().expect("Invalid command line options");

    metrics::describe_counter!("analysis_uploads_total", "Videos submitted for analysis");
    metrics::describe_counter!("analysis_uploads_failed", "Uploads that did not produce a job");
    metrics::describe_histogram!("analysis_upload_seconds", "Time to upload a video");
    metrics::describe_counter!("analysis_status_polls_total", "Status queries issued");
    metrics::describe_counter!("analysis_jobs_completed", "Jobs that finished with results");
    metrics::describe_counter!("analysis_jobs_failed", "Jobs that ended in the failed state");

    let client = HttpAnalysisClient::from_config(&config).expect("Failed to initialize analysis client");
    tracing::info!(api_base_url = %config.api_base_url, "Analysis client ready");

    let outcome = match cli.command {
        Command::Analyze { path, .. } => analyze(client, &config, path).await,
        Command::Status { id } => status(&client, JobId::new(id)).await,
        Command::Results { id } => results(&client, JobId::new(id)).await,
        Command::Score { id } => score(&client, JobId::new(id)).await,
        Command::Feedback { id } => feedback(&client, JobId::new(id)).await,
        Command::Summary => summary(&client).await,
        Command::Ping => ping(&client).await,
    };

    match outcome {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

type CommandResult = Result<ExitCode, Box<dyn std::error::Error>>;

async fn analyze(client: HttpAnalysisClient, config: &ClientConfig, path: PathBuf) -> CommandResult {
    let file = match VideoFile::from_path(&path).await {
        Ok(file) => file,
        Err(LoadError::Rejected(rejected)) => {
            eprintln!("{}: {}", path.display(), rejected);
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };
    let controller = Arc::new(JobController::new(Arc::new(client), JobSettings::from(config)));

    let mut states = controller.subscribe();
    let renderer = tokio::spawn(async move {
        while states.changed().await.is_ok() {
            let state = states.borrow_and_update().clone();
            render(&state);
        }
    });

    let interrupt = {
        let controller = Arc::clone(&controller);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                controller.cancel();
            }
        })
    };

    let outcome = controller.analyze(file).await;
    interrupt.abort();
    let _ = interrupt.await;
    drop(controller);
    // The renderer ends once the controller, and with it the sender, is gone
    let _ = renderer.await;

    let code = match &outcome {
        JobState::Completed { summary, .. } => {
            println!();
            println!("Overall score: {}/10 ({})", summary.overall, summary.tier);
            for facet in &summary.breakdown {
                println!("  {:<12} {:<17} {}", facet.facet, facet.metric, facet.score);
            }
            println!();
            for line in summary.insights() {
                println!("- {}", line);
            }
            ExitCode::SUCCESS
        }
        JobState::Failed { error, .. } => {
            eprintln!("Analysis failed: {}", error);
            ExitCode::FAILURE
        }
        JobState::Idle {
            rejected: Some(rejected),
        } => {
            eprintln!("{}: {}", path.display(), rejected);
            ExitCode::from(2)
        }
        _ => {
            eprintln!("Analysis cancelled");
            ExitCode::from(130)
        }
    };
    Ok(code)
}

fn render(state: &JobState) {
    match state {
        JobState::Validating => println!("Checking video..."),
        JobState::Uploading { progress } => println!("Uploading... {}%", progress),
        JobState::Processing {
            job_id,
            progress,
            message,
        } => {
            let message = if message.is_empty() {
                "Analyzing your presentation..."
            } else {
                message.as_str()
            };
            println!("[{}] {}% {}", job_id, progress, message);
        }
        _ => {}
    }
}

async fn status(client: &HttpAnalysisClient, id: JobId) -> CommandResult {
    let report = client.status(&id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

async fn results(client: &HttpAnalysisClient, id: JobId) -> CommandResult {
    let result = client.results(&id).await?;
    let summary = scoring::summarize(&result);
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}

async fn score(client: &HttpAnalysisClient, id: JobId) -> CommandResult {
    let report = client.score(&id).await?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(ExitCode::SUCCESS)
}

async fn feedback(client: &HttpAnalysisClient, id: JobId) -> CommandResult {
    let feedback = client.detailed_feedback(&id).await?;
    println!("{}", serde_json::to_string_pretty(&feedback)?);
    Ok(ExitCode::SUCCESS)
}

async fn summary(client: &HttpAnalysisClient) -> CommandResult {
    let summary = client.summary().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(ExitCode::SUCCESS)
}

async fn ping(client: &HttpAnalysisClient) -> CommandResult {
    let report = client.system_test().await?;
    println!(
        "{} {}",
        report.status,
        report.message.as_deref().unwrap_or_default()
    );
    if let Some(version) = &report.version {
        println!("version {}", version);
    }
    Ok(ExitCode::SUCCESS)
}
