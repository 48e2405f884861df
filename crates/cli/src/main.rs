//! `snippets`: command-line surface over the cached snippet store.
//!
//! Every subcommand maps 1:1 onto one façade operation; all server state is
//! read and mutated through [`SnippetStore`] so the caching contract gets the
//! same exercise the UI would give it.

use std::{path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use dialoguer::Confirm;
use domain::models::{
    CreateSnippet, CreateTestCase, Rule, RuleKind, RuleSetUpdate, SharePermission, Snippet,
    SnippetFileUpload, UpdateSnippet,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use services::services::{
    ApiError, ClientCredentialsProvider, Config, SnippetApiClient, SnippetStore,
    StaticTokenProvider, UnauthenticatedProvider,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "snippets", version, about = "Manage code snippets on a remote snippet service")]
struct Cli {
    /// Path to a config file (defaults to the user config dir, then env vars).
    #[arg(long, global = true, env = "SNIPPET_CONFIG")]
    config: Option<PathBuf>,

    /// Pre-provisioned bearer token; skips the identity provider entirely.
    #[arg(long, global = true, env = "SNIPPET_ACCESS_TOKEN", hide_env_values = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List snippets, optionally filtered by name.
    List {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Show one snippet.
    Get { id: String },
    /// Create a snippet from inline content or an uploaded file.
    Create {
        name: String,
        /// Read content from this file and use the file-upload endpoint.
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        #[arg(long)]
        content: Option<String>,
        #[arg(long, default_value = "printscript")]
        language: String,
        #[arg(long, default_value = "1.1")]
        version: String,
        #[arg(long, default_value = "prs")]
        extension: String,
        #[arg(long)]
        description: Option<String>,
    },
    /// Replace a snippet's content.
    Update {
        id: String,
        /// Read the new content from this file instead of --content.
        #[arg(long, conflicts_with = "content")]
        file: Option<PathBuf>,
        #[arg(long)]
        content: Option<String>,
    },
    /// Delete a snippet.
    Delete {
        id: String,
        /// Skip the confirmation prompt.
        #[arg(long)]
        yes: bool,
    },
    /// Share a snippet with another user.
    Share {
        id: String,
        user_id: String,
        #[arg(long, default_value = "READER")]
        permission: String,
    },
    /// Execute a snippet; pass one --input per stdin line.
    Run {
        id: String,
        #[arg(long)]
        input: Vec<String>,
    },
    /// Format the stored content server-side.
    Format { id: String },
    /// Lint the snippet and refresh its compliance status.
    Lint { id: String },
    /// Save the snippet content to a file (or stdout).
    Download {
        id: String,
        #[arg(long)]
        formatted: bool,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// List share-recipient candidates.
    Users {
        #[arg(long, default_value_t = 0)]
        page: u32,
        #[arg(long)]
        page_size: Option<u32>,
        #[arg(long)]
        name: Option<String>,
    },
    /// Show the supported languages, extensions and versions.
    FileTypes,
    /// Manage a snippet's test cases.
    #[command(subcommand)]
    Tests(TestsCommand),
    /// Inspect or replace the format/linting rule sets.
    #[command(subcommand)]
    Rules(RulesCommand),
}

#[derive(Subcommand)]
enum TestsCommand {
    List { snippet_id: String },
    Add {
        snippet_id: String,
        #[arg(long)]
        name: String,
        /// One per program input line, in order.
        #[arg(long)]
        input: Vec<String>,
        /// One per expected output line, in order.
        #[arg(long = "expect", required = true)]
        expected: Vec<String>,
        #[arg(long)]
        target_version: Option<f64>,
    },
    Remove {
        snippet_id: String,
        test_case_id: String,
    },
    Run {
        snippet_id: String,
        test_case_id: String,
    },
}

#[derive(Subcommand)]
enum RulesCommand {
    Show {
        kind: String,
    },
    /// Replace the whole rule set from a JSON file of rules.
    Replace {
        kind: String,
        rules_file: PathBuf,
        /// Raw config text to store alongside the rules.
        #[arg(long, requires = "config_format")]
        config_file: Option<PathBuf>,
        #[arg(long)]
        config_format: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = Config::resolve(cli.config.as_deref()).context("loading configuration")?;
    debug!(backend_url = %config.backend_url, page_size = config.page_size, "configuration resolved");
    let store = build_store(&config, cli.token)?;

    run_command(cli.command, &config, &store).await
}

fn build_store(config: &Config, token: Option<String>) -> anyhow::Result<SnippetStore> {
    let client = if let Some(token) = token {
        SnippetApiClient::from_config(config, Arc::new(StaticTokenProvider::new(token)))
    } else if let Some(auth) = &config.auth {
        let provider = ClientCredentialsProvider::new(
            auth.token_url.clone(),
            auth.client_id.clone(),
            auth.client_secret.clone(),
            auth.audience.clone(),
        );
        SnippetApiClient::from_config(config, Arc::new(provider))
    } else {
        // Requests go out unauthenticated; the backend's auth error is the answer.
        SnippetApiClient::from_config(config, Arc::new(UnauthenticatedProvider))
    };
    Ok(SnippetStore::new(Arc::new(client.map_err(surface_err)?)))
}

async fn run_command(command: Command, config: &Config, store: &SnippetStore) -> anyhow::Result<()> {
    match command {
        Command::List { page, page_size, name } => {
            let page_size = page_size.unwrap_or(config.page_size);
            let snippets = store
                .list_snippets(page, page_size, name.as_deref())
                .await
                .map_err(surface_err)?;
            print_json(&snippets)
        }
        Command::Get { id } => match store.snippet(&id).await.map_err(surface_err)? {
            Some(snippet) => print_json(&snippet),
            None => bail!("snippet {id} not found"),
        },
        Command::Create {
            name,
            file,
            content,
            language,
            version,
            extension,
            description,
        } => {
            let snippet = match (file, content) {
                (Some(path), _) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("reading {}", path.display()))?;
                    let file_name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().into_owned())
                        .unwrap_or_else(|| name.clone());
                    let upload = SnippetFileUpload {
                        name,
                        language,
                        version,
                        extension,
                        file_name,
                        content: bytes,
                    };
                    store
                        .create_snippet_from_file(&upload)
                        .await
                        .map_err(surface_err)?
                }
                (None, Some(content)) => {
                    let mut create =
                        CreateSnippet::inline(name, content, language, version, extension);
                    create.description = description;
                    store.create_snippet(&create).await.map_err(surface_err)?
                }
                (None, None) => bail!("either --content or --file is required"),
            };
            created(&snippet);
            print_json(&snippet)
        }
        Command::Update { id, file, content } => {
            let content = match (file, content) {
                (Some(path), _) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                (None, Some(content)) => content,
                (None, None) => bail!("either --content or --file is required"),
            };
            let snippet = store
                .update_snippet(&id, &UpdateSnippet { content })
                .await
                .map_err(surface_err)?;
            print_json(&snippet)
        }
        Command::Delete { id, yes } => {
            if !yes {
                let confirmed = Confirm::new()
                    .with_prompt(format!("Delete snippet {id}?"))
                    .default(false)
                    .interact()?;
                if !confirmed {
                    return Ok(());
                }
            }
            let deleted = store.delete_snippet(&id).await.map_err(surface_err)?;
            println!("deleted {deleted}");
            Ok(())
        }
        Command::Share { id, user_id, permission } => {
            let permission = SharePermission::from_str(&permission)
                .map_err(|_| anyhow::anyhow!("permission must be READER or EDITOR"))?;
            let snippet = store
                .share_snippet(&id, &user_id, permission)
                .await
                .map_err(surface_err)?;
            print_json(&snippet)
        }
        Command::Run { id, input } => {
            let spinner = spinner("running");
            let outputs = store.run_snippet(&id, &input).await;
            spinner.finish_and_clear();
            for line in outputs.map_err(surface_err)? {
                println!("{line}");
            }
            Ok(())
        }
        Command::Format { id } => {
            let spinner = spinner("formatting");
            let snippet = store.format_snippet(&id).await;
            spinner.finish_and_clear();
            println!("{}", snippet.map_err(surface_err)?.content);
            Ok(())
        }
        Command::Lint { id } => {
            let spinner = spinner("linting");
            let snippet = store.lint_snippet(&id).await;
            spinner.finish_and_clear();
            let snippet = snippet.map_err(surface_err)?;
            println!("compliance: {}", snippet.compliance);
            Ok(())
        }
        Command::Download { id, formatted, out } => {
            let content = store
                .download_snippet(&id, formatted)
                .await
                .map_err(surface_err)?;
            match out {
                Some(path) => {
                    std::fs::write(&path, content)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("saved to {}", path.display());
                }
                None => print!("{content}"),
            }
            Ok(())
        }
        Command::Users { page, page_size, name } => {
            let page_size = page_size.unwrap_or(config.page_size);
            let users = store
                .users(page, page_size, name.as_deref())
                .await
                .map_err(surface_err)?;
            print_json(&users)
        }
        Command::FileTypes => {
            let file_types = store.file_types().await.map_err(surface_err)?;
            print_json(&file_types)
        }
        Command::Tests(tests) => run_tests_command(tests, store).await,
        Command::Rules(rules) => run_rules_command(rules, store).await,
    }
}

async fn run_tests_command(command: TestsCommand, store: &SnippetStore) -> anyhow::Result<()> {
    match command {
        TestsCommand::List { snippet_id } => {
            let cases = store.test_cases(&snippet_id).await.map_err(surface_err)?;
            print_json(&cases)
        }
        TestsCommand::Add {
            snippet_id,
            name,
            input,
            expected,
            target_version,
        } => {
            let create = CreateTestCase {
                name,
                inputs: (!input.is_empty()).then_some(input),
                expected_outputs: expected,
                target_version_number: target_version,
            };
            let case = store
                .create_test_case(&snippet_id, &create)
                .await
                .map_err(surface_err)?;
            print_json(&case)
        }
        TestsCommand::Remove { snippet_id, test_case_id } => {
            let removed = store
                .remove_test_case(&snippet_id, &test_case_id)
                .await
                .map_err(surface_err)?;
            println!("removed {removed}");
            Ok(())
        }
        TestsCommand::Run { snippet_id, test_case_id } => {
            let spinner = spinner("running test case");
            let result = store.run_test_case(&snippet_id, &test_case_id).await;
            spinner.finish_and_clear();
            let result = result.map_err(surface_err)?;
            print_json(&result)?;
            if !result.passed() {
                bail!("test case {test_case_id} did not pass: {}", result.status);
            }
            Ok(())
        }
    }
}

async fn run_rules_command(command: RulesCommand, store: &SnippetStore) -> anyhow::Result<()> {
    match command {
        RulesCommand::Show { kind } => {
            let kind = parse_rule_kind(&kind)?;
            let rules = store.rules(kind).await.map_err(surface_err)?;
            print_json(&rules)
        }
        RulesCommand::Replace {
            kind,
            rules_file,
            config_file,
            config_format,
        } => {
            let kind = parse_rule_kind(&kind)?;
            let raw = std::fs::read_to_string(&rules_file)
                .with_context(|| format!("reading {}", rules_file.display()))?;
            let rules: Vec<Rule> =
                serde_json::from_str(&raw).context("rules file must be a JSON array of rules")?;

            let mut update = RuleSetUpdate::new(kind, &rules);
            if let (Some(path), Some(format)) = (config_file, config_format) {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                update = update.with_config(text, format);
            }

            let stored = store.replace_rules(kind, &update).await.map_err(surface_err)?;
            print_json(&stored)
        }
    }
}

fn parse_rule_kind(raw: &str) -> anyhow::Result<RuleKind> {
    RuleKind::from_str(raw).map_err(|_| anyhow::anyhow!("rule kind must be format or linting"))
}

fn created(snippet: &Snippet) {
    eprintln!("created snippet {} ({})", snippet.id, snippet.name);
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Diagnostics first: a validation failure prints as
/// "Rule: X – message (line L, column C)", anything else as the error itself.
fn surface_err(e: ApiError) -> anyhow::Error {
    anyhow::anyhow!(e.user_message())
}

fn spinner(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.set_style(
        ProgressStyle::with_template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    bar.enable_steady_tick(Duration::from_millis(100));
    bar
}
