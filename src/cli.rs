//! CLI commands implementation.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::style;

use crate::config::Settings;
use crate::models::normalize_tag;
use crate::ocr::{TesseractExtractor, TextExtractor};
use crate::repository::DocumentRepository;
use crate::services::{IngestOutcome, IngestService, QueryService};
use crate::storage::UploadStore;

#[derive(Parser)]
#[command(name = "scanvault")]
#[command(about = "Scanned document ingestion, OCR and search system")]
#[command(version)]
pub struct Cli {
    /// Data directory
    #[arg(long, global = true, env = "SCANVAULT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and database
    Init,

    /// Ingest an image file
    Ingest {
        /// Image file to ingest
        file: PathBuf,
        /// Content type (guessed from the extension if omitted)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// List all documents, newest first
    List,

    /// Search documents by text, filename, or tag
    Search {
        /// Query string
        query: String,
    },

    /// Manage document tags
    Tag {
        #[command(subcommand)]
        command: TagCommands,
    },

    /// Delete a document and its stored file
    Delete {
        /// Document ID
        id: String,
    },

    /// Start the web server
    Serve {
        /// Address to bind to (HOST:PORT, defaults to the configured bind)
        bind: Option<String>,
    },
}

#[derive(Subcommand)]
enum TagCommands {
    /// Add a tag to a document
    Add { id: String, tag: String },
    /// Remove a tag from a document
    Remove { id: String, tag: String },
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.data_dir.clone())?;

    match cli.command {
        Commands::Init => cmd_init(&settings),
        Commands::Ingest { file, content_type } => {
            cmd_ingest(&settings, &file, content_type).await
        }
        Commands::List => cmd_list(&settings),
        Commands::Search { query } => cmd_search(&settings, &query),
        Commands::Tag { command } => match command {
            TagCommands::Add { id, tag } => cmd_tag(&settings, &id, &tag, true),
            TagCommands::Remove { id, tag } => cmd_tag(&settings, &id, &tag, false),
        },
        Commands::Delete { id } => cmd_delete(&settings, &id),
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| settings.bind.clone());
            crate::server::serve(&settings, &bind).await
        }
    }
}

fn build_services(settings: &Settings) -> anyhow::Result<(IngestService, QueryService)> {
    settings.ensure_dirs()?;
    let repo = Arc::new(DocumentRepository::new(&settings.database_path())?);
    let store = Arc::new(UploadStore::new(settings.uploads_dir()));
    let extractor: Arc<dyn TextExtractor> =
        Arc::new(TesseractExtractor::new(settings.ocr_language.clone()));

    Ok((
        IngestService::new(Arc::clone(&repo), Arc::clone(&store), extractor),
        QueryService::new(repo, store),
    ))
}

fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_dirs()?;
    DocumentRepository::new(&settings.database_path())?;
    println!(
        "{} {}",
        style("Initialized").green().bold(),
        settings.data_dir.display()
    );
    Ok(())
}

async fn cmd_ingest(
    settings: &Settings,
    file: &std::path::Path,
    content_type: Option<String>,
) -> anyhow::Result<()> {
    let content = std::fs::read(file)?;
    let content_type = content_type.unwrap_or_else(|| {
        mime_guess::from_path(file)
            .first_or_octet_stream()
            .essence_str()
            .to_string()
    });
    let original_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    let (ingest, _) = build_services(settings)?;
    match ingest.ingest(content, &content_type, &original_name).await? {
        IngestOutcome::Created(doc) => {
            println!("{} {} ({})", style("Ingested").green().bold(), doc.filename, doc.id);
        }
        IngestOutcome::Duplicate(doc) => {
            println!(
                "{} content already stored as {} ({})",
                style("Duplicate").yellow().bold(),
                doc.filename,
                doc.id
            );
        }
    }
    Ok(())
}

fn cmd_list(settings: &Settings) -> anyhow::Result<()> {
    let (_, query) = build_services(settings)?;
    let docs = query.list_all()?;
    if docs.is_empty() {
        println!("No documents stored.");
        return Ok(());
    }
    for doc in docs {
        print_document_line(&doc);
    }
    Ok(())
}

fn cmd_search(settings: &Settings, q: &str) -> anyhow::Result<()> {
    let (_, query) = build_services(settings)?;
    let docs = query.search(q)?;
    if docs.is_empty() {
        println!("No matches for {:?}.", q);
        return Ok(());
    }
    for doc in docs {
        print_document_line(&doc);
    }
    Ok(())
}

fn cmd_tag(settings: &Settings, id: &str, tag: &str, add: bool) -> anyhow::Result<()> {
    if add && normalize_tag(tag).is_empty() {
        anyhow::bail!("Tag cannot be empty");
    }

    let (_, query) = build_services(settings)?;
    let applied = if add {
        query.add_tag(id, tag)?
    } else {
        query.remove_tag(id, tag)?
    };

    let message = match (add, applied) {
        (true, true) => "Tag added",
        (true, false) => "Tag already present",
        (false, true) => "Tag removed",
        (false, false) => "Tag not present",
    };
    println!("{}", message);
    Ok(())
}

fn cmd_delete(settings: &Settings, id: &str) -> anyhow::Result<()> {
    let (_, query) = build_services(settings)?;
    query.delete_document(id)?;
    println!("{} {}", style("Deleted").red().bold(), id);
    Ok(())
}

fn print_document_line(doc: &crate::models::Document) {
    let tags = if doc.tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", doc.tags.join(", "))
    };
    println!(
        "{}  {}  {}{}",
        style(&doc.id).dim(),
        doc.created_at.format("%Y-%m-%d %H:%M"),
        doc.filename,
        tags
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_tag_add_rejects_blank_tag() {
        let dir = tempdir().unwrap();
        let settings = Settings {
            data_dir: dir.path().to_path_buf(),
            ..Settings::default()
        };

        for raw in ["", "   "] {
            let err = cmd_tag(&settings, "some-id", raw, true).unwrap_err();
            assert_eq!(err.to_string(), "Tag cannot be empty");
        }
    }
}
