mod logging;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use deck_common::{
    BackendKind, DeckConfig, OutlineRequest, PresentationCreate, Slide, SlidesRequest,
};
use deck_core::{
    backend_from_config, outline_titles, parse_outline, DeckBackend, GenerationEvent,
    GenerationManager, SlideParser,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

pub use logging::init_logging;

#[derive(Debug, Parser)]
#[command(name = "deck")]
#[command(about = "Streaming slide deck generation and preview")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug output
    #[arg(long, global = true)]
    pub debug: bool,

    /// Config file (defaults to <config dir>/deck/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Backend: stub | fastapi
    #[arg(long, global = true)]
    pub backend: Option<String>,

    /// Base URL of the FastAPI backend
    #[arg(long, global = true)]
    pub api_url: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Stream an outline for a prompt
    Outline {
        prompt: String,
        /// Number of topics to ask for
        #[arg(short = 'n', long)]
        count: Option<usize>,
        #[arg(short, long)]
        language: Option<String>,
        /// Store the outline on an existing presentation
        #[arg(long)]
        presentation_id: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Generate a deck, from a topic or an outline file
    Generate {
        #[arg(long)]
        title: Option<String>,
        /// Prompt for the outline step
        #[arg(long, conflicts_with = "outline_file")]
        topic: Option<String>,
        /// Skip the outline step and use `# ` topics from this file
        #[arg(long)]
        outline_file: Option<PathBuf>,
        #[arg(short = 'n', long)]
        count: Option<usize>,
        #[arg(long)]
        tone: Option<String>,
        #[arg(short, long)]
        language: Option<String>,
        /// Store the slides on an existing presentation
        #[arg(long, conflicts_with = "save")]
        presentation_id: Option<String>,
        /// Create a new presentation and store the slides on it
        #[arg(long)]
        save: bool,
        /// Watch the deck grow in a full-screen view
        #[arg(long, conflicts_with = "json")]
        tui: bool,
        /// Print the final slides as JSON
        #[arg(long)]
        json: bool,
    },
    /// Parse a markup file and print the slides as JSON
    Parse {
        file: PathBuf,
        /// Treat the file as a stream that is still running
        #[arg(long)]
        partial: bool,
    },
    /// Preview a markup file
    Preview { file: PathBuf },
    /// List stored presentations
    List {
        /// Owner (defaults to the configured user)
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        json: bool,
    },
    /// Delete stored presentations
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
}

impl Commands {
    fn is_fullscreen(&self) -> bool {
        match self {
            Commands::Preview { .. } => true,
            Commands::Generate { tui, .. } => *tui,
            _ => false,
        }
    }
}

pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_main(cli).await
}

pub async fn run_main(cli: Cli) -> Result<()> {
    let config = load_config(&cli).await?;
    init_logging(
        cli.debug,
        config.log_path.as_deref(),
        cli.command.is_fullscreen(),
    )?;
    tracing::debug!(?config, "configuration resolved");

    match cli.command {
        Commands::Outline {
            prompt,
            count,
            language,
            presentation_id,
            json,
        } => {
            let request = OutlineRequest {
                prompt,
                number_of_cards: count.unwrap_or(config.num_slides),
                language: language.unwrap_or_else(|| config.language.clone()),
            };
            outline(&config, request, presentation_id.as_deref(), json).await?;
        }
        Commands::Generate {
            title,
            topic,
            outline_file,
            count,
            tone,
            language,
            presentation_id,
            save,
            tui,
            json,
        } => {
            let job = GenerateJob {
                title,
                topic,
                outline_file,
                count: count.unwrap_or(config.num_slides),
                tone: tone.unwrap_or_else(|| config.tone.clone()),
                language: language.unwrap_or_else(|| config.language.clone()),
                presentation_id,
                save,
            };
            if tui {
                generate_live(&config, job).await?;
            } else {
                generate(&config, job, json).await?;
            }
        }
        Commands::Parse { file, partial } => {
            let slides = parse_file(&file, partial).await?;
            println!("{}", serde_json::to_string_pretty(&slides)?);
        }
        Commands::Preview { file } => {
            deck_tui::run_preview(&file).await?;
        }
        Commands::List { email, json } => {
            let backend = backend_from_config(&config)?;
            let email = email.unwrap_or_else(|| config.user_email.clone());
            let presentations = backend.list_presentations(&email).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&presentations)?);
            } else if presentations.is_empty() {
                println!("No presentations for {email}");
            } else {
                for p in presentations {
                    println!("{}\t{}\t{}", p.id, p.title, p.updated_at);
                }
            }
        }
        Commands::Delete { ids } => {
            let backend = backend_from_config(&config)?;
            backend.delete_presentations(&ids).await?;
            println!("Deleted {} presentation(s)", ids.len());
        }
    }

    Ok(())
}

/// File, then `DECK_*` environment, then command-line flags.
async fn load_config(cli: &Cli) -> Result<DeckConfig> {
    let config = match &cli.config {
        Some(path) => DeckConfig::load_from(path).await?,
        None => DeckConfig::load().await?,
    };
    apply_flags(config.with_env_overrides()?, cli)
}

fn apply_flags(mut config: DeckConfig, cli: &Cli) -> Result<DeckConfig> {
    if let Some(backend) = &cli.backend {
        config.backend = backend.parse::<BackendKind>()?;
    }
    if let Some(url) = &cli.api_url {
        config.api_base_url = url.clone();
    }
    Ok(config)
}

async fn parse_file(path: &Path, partial: bool) -> Result<Vec<Slide>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))?;
    let mut parser = SlideParser::new();
    parser.parse_chunk(&content);
    if !partial {
        parser.finalize();
    }
    Ok(parser.get_all_slides())
}

fn new_manager(
    config: &DeckConfig,
    backend: Arc<dyn DeckBackend>,
) -> (GenerationManager, mpsc::Receiver<GenerationEvent>) {
    let (tx, rx) = mpsc::channel(64);
    let manager = GenerationManager::new(
        backend,
        tx,
        Duration::from_millis(config.frame_interval_ms),
    );
    (manager, rx)
}

/// Print what a headless run needs to know about; the rest goes to the log.
fn spawn_reporter(mut rx: mpsc::Receiver<GenerationEvent>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event {
                GenerationEvent::Saved { presentation_id } => {
                    eprintln!("Saved presentation {presentation_id}");
                }
                GenerationEvent::Error { message } => eprintln!("error: {message}"),
                GenerationEvent::OutlineUpdated(items) => {
                    tracing::debug!(topics = items.len(), "outline updated");
                }
                GenerationEvent::SlidesUpdated(slides) => {
                    tracing::debug!(slides = slides.len(), "slides updated");
                }
                other => tracing::debug!(?other, "generation event"),
            }
        }
    })
}

async fn outline(
    config: &DeckConfig,
    request: OutlineRequest,
    presentation_id: Option<&str>,
    json: bool,
) -> Result<()> {
    let backend = backend_from_config(config)?;
    let (mut manager, rx) = new_manager(config, backend);
    let reporter = spawn_reporter(rx);

    let result = manager.generate_outline(request, presentation_id).await;
    drop(manager);
    reporter.await?;

    let items = result?;
    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        for (i, title) in outline_titles(&items).iter().enumerate() {
            println!("{}. {title}", i + 1);
        }
    }
    Ok(())
}

#[derive(Debug)]
struct GenerateJob {
    title: Option<String>,
    topic: Option<String>,
    outline_file: Option<PathBuf>,
    count: usize,
    tone: String,
    language: String,
    presentation_id: Option<String>,
    save: bool,
}

impl GenerateJob {
    fn deck_title(&self) -> String {
        self.title
            .clone()
            .or_else(|| self.topic.clone())
            .unwrap_or_else(|| "Untitled".to_string())
    }

    fn prompt(&self) -> Result<String> {
        self.topic
            .clone()
            .or_else(|| self.title.clone())
            .ok_or_else(|| anyhow!("nothing to generate from: pass --topic, --title or --outline-file"))
    }
}

/// Outline (from file or backend), then slides, with an optional stored presentation.
async fn run_job(
    config: &DeckConfig,
    job: GenerateJob,
    manager: &mut GenerationManager,
) -> Result<Vec<Slide>> {
    let title = job.deck_title();

    let presentation_id = match (&job.presentation_id, job.save) {
        (Some(id), _) => Some(id.clone()),
        (None, true) => {
            let created = manager
                .backend()
                .create_presentation(PresentationCreate {
                    title: title.clone(),
                    content: serde_json::json!({}),
                    theme: None,
                    language: Some(job.language.clone()),
                    tone: Some(job.tone.clone()),
                    user_email: config.user_email.clone(),
                })
                .await?;
            tracing::info!(id = %created.id, "presentation created");
            Some(created.id)
        }
        (None, false) => None,
    };

    let outline = match &job.outline_file {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("cannot read {}", path.display()))?;
            let items = parse_outline(&text);
            if items.is_empty() {
                bail!("no topics found in {}", path.display());
            }
            items
        }
        None => {
            let request = OutlineRequest {
                prompt: job.prompt()?,
                number_of_cards: job.count,
                language: job.language.clone(),
            };
            manager
                .generate_outline(request, presentation_id.as_deref())
                .await?
        }
    };

    let request = SlidesRequest {
        title,
        outline,
        language: job.language,
        tone: job.tone,
    };
    Ok(manager
        .generate_slides(request, presentation_id.as_deref())
        .await?)
}

async fn generate(config: &DeckConfig, job: GenerateJob, json: bool) -> Result<()> {
    let backend = backend_from_config(config)?;
    let (mut manager, rx) = new_manager(config, backend);
    let reporter = spawn_reporter(rx);

    let result = run_job(config, job, &mut manager).await;
    drop(manager);
    reporter.await?;

    let slides = result?;
    if json {
        println!("{}", serde_json::to_string_pretty(&slides)?);
    } else {
        for slide in &slides {
            println!(
                "Slide {}: {}",
                slide.index + 1,
                slide.title().unwrap_or("(untitled)")
            );
        }
    }
    Ok(())
}

async fn generate_live(config: &DeckConfig, job: GenerateJob) -> Result<()> {
    let backend = backend_from_config(config)?;
    let (mut manager, rx) = new_manager(config, backend);
    let config = config.clone();

    let task = tokio::spawn(async move { run_job(&config, job, &mut manager).await });
    deck_tui::run_live(rx).await?;

    if task.is_finished() {
        task.await??;
    } else {
        tracing::info!("view closed before generation finished, cancelling");
        task.abort();
    }
    Ok(())
}
