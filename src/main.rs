use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::{Args, Parser, Subcommand};

use ghrm::actions::{CLONE_PAUSE, CloneAction, DELETE_PAUSE, DeleteAction, GitCli};
use ghrm::bulk::{
    BulkExecutor, ConfirmPrompt, ConfirmStep, Confirmation, ItemOutcome, ItemReport, RunStatus,
    Summary,
};
use ghrm::cache::{CacheKey, CacheStore, FileCache};
use ghrm::config::{self, Config};
use ghrm::github::{Fetcher, GitHubClient};
use ghrm::model::{RepoKind, Repository};
use ghrm::selection;
use ghrm::types::Category;

type CmdResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    name = "ghrm",
    about = "GitHub repository manager - list, clone and delete repos in bulk"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Listing {
    /// Repository category: all, public, private or forks
    #[arg(long, short, default_value_t = Category::All)]
    category: Category,

    /// Ignore the cached listing and fetch from GitHub
    #[arg(long)]
    no_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List repositories as a numbered table
    List {
        #[command(flatten)]
        listing: Listing,
    },

    /// Clone selected repositories
    Clone {
        #[command(flatten)]
        listing: Listing,

        /// Selection such as "1,3-5,forks" (read from stdin when omitted)
        #[arg(long, short)]
        select: Option<String>,

        /// Destination directory (defaults to clone_dir from the config)
        #[arg(long)]
        dest: Option<PathBuf>,

        /// Number of clones to run at once
        #[arg(long, default_value_t = 1)]
        workers: usize,
    },

    /// Permanently delete selected repositories
    Delete {
        #[command(flatten)]
        listing: Listing,

        /// Selection such as "1,3-5,forks" (read from stdin when omitted)
        #[arg(long, short)]
        select: Option<String>,
    },

    /// Inspect or clear cached listings
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Check dependencies and credentials
    Doctor,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Show cache files with size and age
    List,

    /// Remove the cached listing of one category
    Purge {
        #[arg(long, short)]
        category: Category,
    },

    /// Remove every cache file
    Clear,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { listing } => cmd_list(&listing),
        Commands::Clone {
            listing,
            select,
            dest,
            workers,
        } => cmd_clone(&listing, select, dest, workers),
        Commands::Delete { listing, select } => cmd_delete(&listing, select),
        Commands::Cache { command } => match command {
            CacheCommands::List => cmd_cache_list(),
            CacheCommands::Purge { category } => cmd_cache_purge(category),
            CacheCommands::Clear => cmd_cache_clear(),
        },
        Commands::Doctor => cmd_doctor(),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        if e.downcast_ref::<config::ConfigError>().is_some() {
            eprintln!();
            eprintln!("Hint: check your config with: ghrm doctor");
        }
        std::process::exit(1);
    }
}

fn file_cache(config: &Config) -> FileCache {
    FileCache::new(config.cache_paths()).with_ttl(config.cache_ttl())
}

fn fetcher(config: &Config) -> Fetcher<GitHubClient, FileCache> {
    Fetcher::new(GitHubClient::new(config.api_url.clone()), file_cache(config))
}

fn cmd_list(listing: &Listing) -> CmdResult {
    let config = Config::load()?;
    let credentials = config.credentials()?;
    let repos = fetcher(&config).fetch(&credentials, listing.category, !listing.no_cache)?;

    if repos.is_empty() {
        println!("No {} repositories found", listing.category);
        return Ok(());
    }
    print_table(&repos);
    Ok(())
}

fn cmd_clone(
    listing: &Listing,
    select: Option<String>,
    dest: Option<PathBuf>,
    workers: usize,
) -> CmdResult {
    let config = Config::load()?;
    let credentials = config.credentials()?;
    let repos = fetcher(&config).fetch(&credentials, listing.category, !listing.no_cache)?;

    if repos.is_empty() {
        println!("No {} repositories found", listing.category);
        return Ok(());
    }
    print_table(&repos);

    let expression = selection_expression(select);
    let selected = selection::select(&repos, &expression);
    if selected.is_empty() {
        println!("Nothing selected");
        return Ok(());
    }

    let action = CloneAction::new(dest.unwrap_or_else(|| config.clone_dir.clone()));
    println!(
        "Cloning {} repositories into {}",
        selected.len(),
        action.dest_root().display()
    );

    let total = selected.len();
    let summary = BulkExecutor::new(CLONE_PAUSE)
        .with_workers(workers)
        .with_interrupt(interrupt_flag())
        .execute(&selected, &action, Confirmation::NotRequired, |item| {
            print_item(item, total)
        });

    print_summary(&summary);
    Ok(())
}

fn cmd_delete(listing: &Listing, select: Option<String>) -> CmdResult {
    let config = Config::load()?;
    let credentials = config.credentials()?;
    let fetcher = fetcher(&config);
    let repos = fetcher.fetch(&credentials, listing.category, !listing.no_cache)?;

    if repos.is_empty() {
        println!("No {} repositories found", listing.category);
        return Ok(());
    }
    print_table(&repos);

    let expression = selection_expression(select);
    let selected = selection::select(&repos, &expression);
    if selected.is_empty() {
        println!("Nothing selected");
        return Ok(());
    }

    println!("\nThe following repositories will be PERMANENTLY deleted:");
    for repo in &selected {
        println!("  - {}", repo.full_name);
    }
    println!();

    let action = DeleteAction::new(fetcher.source().clone(), credentials.clone());
    let total = selected.len();
    let mut confirm = prompt_confirmation;
    let summary = BulkExecutor::new(DELETE_PAUSE)
        .with_interrupt(interrupt_flag())
        .execute(&selected, &action, Confirmation::Required(&mut confirm), |item| {
            print_item(item, total)
        });

    if summary.success_count > 0 {
        // Every cached listing may still contain the deleted repositories.
        for category in Category::ALL {
            let key = CacheKey::new(credentials.account.clone(), category);
            if let Err(e) = fetcher.cache().purge(&key) {
                log::warn!("Failed to purge cache for {}: {}", key, e);
            }
        }
    }

    print_summary(&summary);
    Ok(())
}

fn cmd_cache_list() -> CmdResult {
    let config = Config::load()?;
    let cache = file_cache(&config);
    let entries = cache.entries()?;

    if entries.is_empty() {
        println!("No cache files in {}", cache.paths().root().display());
        return Ok(());
    }

    println!("{:<50} {:>10} {:>10} {:>7}", "FILE", "SIZE", "AGE", "FRESH");
    println!("{}", "-".repeat(80));
    for entry in entries {
        println!(
            "{:<50} {:>10} {:>10} {:>7}",
            entry.name,
            format_size(entry.size_bytes),
            format_duration(entry.age.as_secs()),
            if entry.age < cache.ttl() { "yes" } else { "no" }
        );
    }
    Ok(())
}

fn cmd_cache_purge(category: Category) -> CmdResult {
    let config = Config::load()?;
    let key = CacheKey::new(config.account()?, category);
    file_cache(&config).purge(&key)?;
    println!("Purged cached {} listing for {}", category, key.account);
    Ok(())
}

fn cmd_cache_clear() -> CmdResult {
    let config = Config::load()?;
    let removed = file_cache(&config).purge_all()?;
    println!("Removed {} cache files", removed);
    Ok(())
}

fn cmd_doctor() -> CmdResult {
    println!("ghrm System Check\n");

    // Check git
    let git_version = GitCli::new().version();
    println!(
        "[{}] git: {}",
        if git_version.is_some() { "OK" } else { "FAIL" },
        git_version.as_deref().unwrap_or("not found (needed for clone)")
    );

    // Check config
    let loaded = config::default_path().and_then(|path| {
        let config = Config::from_path(&path)?;
        Ok((path, config))
    });
    let config = match loaded {
        Ok((path, config)) => {
            println!("[OK] Config: {}", path.display());
            config
        }
        Err(e) => {
            println!("[FAIL] Config: {}", e);
            std::process::exit(1);
        }
    };

    // Check cache directory
    let cache_root = config.cache_paths().root().to_path_buf();
    println!(
        "[{}] Cache dir: {}",
        if cache_root.exists() { "OK" } else { "INFO" },
        cache_root.display()
    );

    // Check credential
    let credentials = config.credentials()?;
    let client = GitHubClient::new(config.api_url.clone());
    let token_ok = match client.rate_limit(&credentials) {
        Ok(limit) => {
            println!(
                "[OK] Token: valid ({} of {} requests left)",
                limit.remaining, limit.limit
            );
            true
        }
        Err(e) if e.is_auth() => {
            println!("[FAIL] Token: rejected ({})", e);
            false
        }
        Err(e) => {
            println!("[FAIL] Token: could not check ({})", e);
            false
        }
    };

    if git_version.is_none() || !token_ok {
        std::process::exit(1);
    }

    Ok(())
}

/// Set by Ctrl-C. A second Ctrl-C exits immediately.
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = Arc::new(AtomicBool::new(false));
    let handler_flag = Arc::clone(&flag);
    let installed = ctrlc::set_handler(move || {
        if handler_flag.swap(true, Ordering::SeqCst) {
            std::process::exit(130);
        }
        eprintln!("\nInterrupted, finishing in-flight items (Ctrl-C again to quit)");
    });
    if let Err(e) = installed {
        log::warn!("Could not install Ctrl-C handler: {}", e);
    }
    flag
}

fn read_line() -> Option<String> {
    let _ = io::stderr().flush();
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

fn selection_expression(select: Option<String>) -> String {
    if let Some(expression) = select {
        return expression;
    }
    eprint!("\nSelect repositories (e.g. 1,3-5 or all, public, private, forks, none): ");
    read_line().unwrap_or_default()
}

fn prompt_confirmation(prompt: &ConfirmPrompt) -> Option<String> {
    match prompt.step {
        ConfirmStep::First => eprint!(
            "This will delete {} repositories and cannot be undone. Type '{}' to continue: ",
            prompt.count, prompt.keyword
        ),
        ConfirmStep::Final => eprint!(
            "Final confirmation. Type '{}' to delete {} repositories: ",
            prompt.keyword, prompt.count
        ),
    }
    read_line()
}

fn print_table(repos: &[Repository]) {
    println!(
        "{:>4}  {:<40} {:<8} {:>6} {:<12} {:<10}",
        "#", "REPO", "KIND", "STARS", "LANGUAGE", "UPDATED"
    );
    println!("{}", "-".repeat(86));

    for (index, repo) in repos.iter().enumerate() {
        let kind = match repo.kind() {
            RepoKind::Fork => "fork",
            RepoKind::Private => "private",
            RepoKind::Public => "public",
        };
        let updated = repo.updated.get(..10).unwrap_or(&repo.updated);
        println!(
            "{:>4}  {:<40} {:<8} {:>6} {:<12} {:<10}",
            index + 1,
            truncate(&repo.name, 40),
            kind,
            repo.star_count,
            truncate(repo.language.as_deref().unwrap_or("-"), 12),
            updated
        );
    }
}

fn print_item(item: &ItemReport, total: usize) {
    match &item.outcome {
        ItemOutcome::Success => println!("[{}/{}] OK    {}", item.position, total, item.full_name),
        ItemOutcome::Skipped(reason) => println!(
            "[{}/{}] SKIP  {}: {}",
            item.position, total, item.full_name, reason
        ),
        ItemOutcome::Failure(error) => println!(
            "[{}/{}] FAIL  {}: {}",
            item.position, total, item.full_name, error
        ),
    }
}

fn print_summary(summary: &Summary) {
    match summary.status {
        RunStatus::Aborted => {
            println!("Aborted, nothing was changed");
            return;
        }
        RunStatus::Interrupted => println!("\nInterrupted before all items were processed"),
        RunStatus::Completed => {}
    }
    println!(
        "\nDone: {} succeeded, {} failed, {} skipped",
        summary.success_count, summary.failure_count, summary.skipped_count
    );
}

fn truncate(value: &str, width: usize) -> String {
    if value.chars().count() <= width {
        value.to_string()
    } else {
        let mut out: String = value.chars().take(width.saturating_sub(1)).collect();
        out.push('~');
        out
    }
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KiB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MiB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_parses_clone_flags() {
        let cli = Cli::try_parse_from([
            "ghrm", "clone", "--category", "forks", "--select", "1-3", "--workers", "4",
        ])
        .unwrap();
        match cli.command {
            Commands::Clone {
                listing,
                select,
                dest,
                workers,
            } => {
                assert_eq!(listing.category, Category::Forks);
                assert!(!listing.no_cache);
                assert_eq!(select.as_deref(), Some("1-3"));
                assert!(dest.is_none());
                assert_eq!(workers, 4);
            }
            _ => panic!("expected clone"),
        }
    }

    #[test]
    fn cli_rejects_unknown_category() {
        assert!(Cli::try_parse_from(["ghrm", "list", "--category", "archived"]).is_err());
    }

    #[test]
    fn cli_cache_purge_requires_category() {
        assert!(Cli::try_parse_from(["ghrm", "cache", "purge"]).is_err());
        assert!(Cli::try_parse_from(["ghrm", "cache", "purge", "-c", "private"]).is_ok());
    }

    #[test]
    fn formats() {
        assert_eq!(format_duration(59), "59s");
        assert_eq!(format_duration(3 * 3600 + 120), "3h 2m");
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KiB");
        assert_eq!(truncate("abcdef", 4), "abc~");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
