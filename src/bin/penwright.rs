use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use penwright::api::GenerationClient;
use penwright::config::Config;
use penwright::prompt::{ActionKind, Destination, DocumentType, InputScope, RewriteStyle};
use penwright::state::{DocumentSurface, Role, TextDocument};
use penwright::{EditorActionController, Notice};
use std::io::Read;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "PENWRIGHT_LOG";

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Action {
    Improve,
    Rewrite,
    Continue,
    Grammar,
    Shorten,
    Expand,
    Translate,
    Summarize,
    Headlines,
    Generate,
    Ask,
    Chat,
}

/// Run one AI writing action over a text and print the result
#[derive(Parser, Debug)]
#[command(name = "penwright", version)]
struct Cli {
    action: Action,

    /// Rewrite style (formal, informal, business, creative, academic)
    #[arg(long, default_value = "neutral")]
    style: String,

    /// Target language for translate
    #[arg(long, default_value = "English")]
    language: String,

    /// Document type for generate (letter, resume, contract, report, article)
    #[arg(long, default_value = "generic")]
    doc_type: String,

    /// Context text for ask; defaults to empty
    #[arg(long, default_value = "")]
    context: String,

    /// Read input from this file instead of stdin
    #[arg(long)]
    input: Option<PathBuf>,

    /// Print the session history as JSON after the action completes
    #[arg(long)]
    history: bool,
}

impl Cli {
    fn kind(&self) -> ActionKind {
        match self.action {
            Action::Improve => ActionKind::Improve,
            Action::Rewrite => ActionKind::Rewrite {
                style: RewriteStyle::parse(&self.style),
            },
            Action::Continue => ActionKind::Continue,
            Action::Grammar => ActionKind::FixGrammar,
            Action::Shorten => ActionKind::Shorten,
            Action::Expand => ActionKind::Expand,
            Action::Translate => ActionKind::Translate {
                target_language: self.language.clone(),
            },
            Action::Summarize => ActionKind::Summarize,
            Action::Headlines => ActionKind::SuggestHeadlines,
            Action::Generate => ActionKind::GenerateDocument {
                doc_type: DocumentType::parse(&self.doc_type),
            },
            Action::Ask => ActionKind::AnswerQuestion {
                context: self.context.clone(),
            },
            Action::Chat => ActionKind::Chat,
        }
    }

    fn read_input(&self) -> Result<String> {
        match &self.input {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display())),
            None => {
                let mut buf = String::new();
                std::io::stdin()
                    .read_to_string(&mut buf)
                    .context("failed to read stdin")?;
                Ok(buf)
            }
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Config::load()?;
    config.validate()?;
    if !config.has_usable_key() {
        tracing::warn!("no usable API key; set PENWRIGHT_API_KEY");
    }

    let kind = cli.kind();
    let input = cli.read_input()?;
    let client = GenerationClient::new(&config);

    let document = match kind.scope() {
        InputScope::Provided => TextDocument::new(),
        _ => TextDocument::from_text(input.clone()),
    };
    let mut controller = EditorActionController::new(document, client)?;

    match kind.scope() {
        InputScope::SelectionOnly => {
            controller.document_mut().select_all();
            controller.trigger(kind.clone());
        }
        InputScope::SelectionOrDocument => {
            controller.trigger(kind.clone());
        }
        InputScope::Provided => {
            controller.submit(kind.clone(), &input);
        }
    }
    controller.settle().await;

    for notice in controller.take_notices() {
        match notice {
            Notice::NothingToDo => bail!("input is empty; nothing to do"),
            Notice::SelectionRequired => bail!("{} needs text to work on", kind.name()),
            Notice::Error(message) => bail!(message),
        }
    }

    match kind.destination() {
        Destination::Conversation => {
            let reply = controller
                .conversation()
                .last_from(Role::Assistant)
                .map(|m| m.text.clone())
                .unwrap_or_default();
            println!("{reply}");
        }
        Destination::Substitute | Destination::ReplaceDocument => {
            println!("{}", controller.document().text());
        }
    }

    if cli.history {
        println!("{}", controller.history().to_json()?);
    }

    Ok(())
}
