use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use crate::adapters::{AdapterRegistry, ErrorBehavior};
use crate::resolver::{MemoryContext, NoteFile, Resolver};
use crate::settings::{validate_settings, Platform};
use crate::store::{load_settings, read_note, save_settings};

#[derive(Parser, Debug, Clone)]
#[command(name = "note-toolbar")]
#[command(version)]
#[command(about = "Inspect, migrate and resolve note toolbar settings", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (the plugin's data.json)
    #[arg(short, long, env = "NOTE_TOOLBAR_SETTINGS", default_value = "data.json")]
    pub settings: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Upgrade the settings file to the current schema version
    Migrate {
        /// Report what would change without writing
        #[arg(long)]
        dry_run: bool,
    },

    /// Check identifiers and toolbar references
    Check,

    /// Resolve a template against a note
    Resolve {
        /// Template text, e.g. "https://example.com/?q={{encode:note_title}}"
        template: String,

        /// Markdown note to resolve against
        #[arg(short, long)]
        note: Option<PathBuf>,

        /// Vault root folder
        #[arg(long, env = "NOTE_TOOLBAR_VAULT")]
        vault: Option<PathBuf>,

        /// Text to use as the editor selection
        #[arg(long)]
        selection: Option<String>,
    },

    /// Show the toolbar selected for a note, with resolved labels
    Toolbar {
        /// Markdown note
        note: PathBuf,

        /// Vault root folder
        #[arg(long, env = "NOTE_TOOLBAR_VAULT")]
        vault: Option<PathBuf>,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = execute(&cli).await?;
    print!("{}", output);
    Ok(())
}

/// Run a command and return what it prints.
pub async fn execute(cli: &Cli) -> Result<String> {
    let loaded = load_settings(&cli.settings)
        .await
        .with_context(|| format!("loading {}", cli.settings.display()))?;
    let mut out = String::new();

    match &cli.command {
        Commands::Migrate { dry_run } => {
            if !loaded.from_disk {
                bail!("settings file {} does not exist", cli.settings.display());
            }
            if !loaded.was_migrated() {
                out.push_str(&format!(
                    "{} is already at version {}\n",
                    cli.settings.display(),
                    loaded.settings.version
                ));
                return Ok(out);
            }
            for version in &loaded.applied_steps {
                out.push_str(&format!("applied migration to {}\n", version));
            }
            if *dry_run {
                out.push_str("dry run, nothing written\n");
            } else {
                save_settings(&cli.settings, &loaded.settings).await?;
                out.push_str(&format!(
                    "wrote {} at version {}\n",
                    cli.settings.display(),
                    loaded.settings.version
                ));
            }
        }
        Commands::Check => {
            let result = validate_settings(&loaded.settings);
            for warning in &result.warnings {
                out.push_str(&format!("warning: {}\n", warning));
            }
            for error in &result.errors {
                out.push_str(&format!("error: {}\n", error));
            }
            if !result.valid {
                bail!("{}{} problem(s) found", out, result.errors.len());
            }
            out.push_str(&format!(
                "ok: {} toolbar(s), {} folder mapping(s)\n",
                loaded.settings.toolbars.len(),
                loaded.settings.folder_mappings.len()
            ));
        }
        Commands::Resolve {
            template,
            note,
            vault,
            selection,
        } => {
            let mut context = MemoryContext::new()
                .with_selection(selection.clone())
                .with_vault_path(vault.clone());
            let file = match note {
                Some(path) => {
                    let (file, frontmatter) = read_note(path, vault.as_deref()).await?;
                    context = context.with_frontmatter(&file, frontmatter);
                    Some(file)
                }
                None => None,
            };
            let context = Arc::new(context);
            // Script adapters live in the host editor; expressions report as unavailable.
            let resolver = Resolver::for_settings(&loaded.settings, context.clone(), AdapterRegistry::new());
            let resolved = resolver
                .resolve(template, file.as_ref(), ErrorBehavior::Display)
                .await;
            for message in context.displayed_errors() {
                eprintln!("error: {}", message);
            }
            out.push_str(&resolved);
            out.push('\n');
        }
        Commands::Toolbar { note, vault } => {
            let (file, frontmatter) = read_note(note, vault.as_deref()).await?;
            let Some(toolbar) = loaded.settings.select_toolbar(&file.path, Some(&frontmatter)) else {
                out.push_str(&format!("no toolbar for {}\n", file.path));
                return Ok(out);
            };

            let context = Arc::new(
                MemoryContext::new()
                    .with_vault_path(vault.clone())
                    .with_frontmatter(&file, frontmatter),
            );
            let resolver = Resolver::for_settings(&loaded.settings, context, AdapterRegistry::new());
            out.push_str(&format!("{} ({})\n", toolbar.name, toolbar.uuid));
            let positions: Vec<String> = Platform::ALL
                .iter()
                .map(|p| format!("{} {}", p.as_str(), toolbar.position.for_platform(*p).as_str()))
                .collect();
            out.push_str(&format!("position: {}\n", positions.join(", ")));
            if resolver.toolbar_uses_variables(toolbar) {
                out.push_str("uses variables: re-rendered on every note\n");
            }

            let labels = resolver.resolve_all_labels(toolbar, Some(&file)).await;
            for (item, label) in toolbar.items.iter().zip(labels) {
                let link = resolve_link(&resolver, &item.link, &file).await;
                out.push_str(&format!("  [{}] {} -> {}\n", item.item_type(), label, link));
            }
        }
    }

    Ok(out)
}

async fn resolve_link(resolver: &Resolver, link: &str, file: &NoteFile) -> String {
    if resolver.has_variables(link) {
        resolver.resolve(link, Some(file), ErrorBehavior::Report).await
    } else {
        link.to_string()
    }
}
