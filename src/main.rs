//! Command-line front end: prompts for an account and downloads its screenshots and artwork.

use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use ugc_dl::{AccountId, CategoryReport, Config, Crawler, shutdown_on_signal};

const BANNER: &str = r"
  _   _  ____  ____       ____  _
 | | | |/ ___|/ ___|     |  _ \| |
 | | | | |  _| |   _____ | | | | |
 | |_| | |_| | |__|_____|| |_| | |___
  \___/ \____|\____|     |____/|_____|

 Screenshot and artwork downloader
";

#[tokio::main]
async fn main() -> ExitCode {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,ugc_dl=info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    println!("{}", BANNER);

    let config = match std::env::args().nth(1) {
        Some(path) => match Config::from_json_file(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config '{}': {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    let Some(account) = prompt_account().await else {
        eprintln!("No account id given");
        return ExitCode::FAILURE;
    };

    let crawler = match Crawler::new(config) {
        Ok(crawler) => crawler,
        Err(e) => {
            eprintln!("Failed to start: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let signals = shutdown_on_signal(&crawler);

    let result = crawler.crawl(account).await;
    signals.abort();

    match result {
        Ok(reports) => {
            for report in &reports {
                print_report(report);
            }
            let root = crawler
                .config()
                .download
                .download_dir
                .join(account.to_string());
            let root = std::path::absolute(&root).unwrap_or(root);
            println!("\nDone. Files are in {}", root.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Crawl aborted");
            eprintln!("Crawl aborted: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Ask for an account id until a valid one is entered; `None` on end of input
async fn prompt_account() -> Option<AccountId> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"Profile ID (64-bit number): ").await.ok()?;
        stdout.flush().await.ok()?;

        let line = lines.next_line().await.ok()??;
        match line.parse::<AccountId>() {
            Ok(account) => return Some(account),
            Err(_) => println!("'{}' is not a valid profile id, try again.", line.trim()),
        }
    }
}

fn print_report(report: &CategoryReport) {
    println!("\n[{}]", report.category.dir_name);
    if report.discovered == 0 {
        println!("No items found. Is the profile set to private?");
        return;
    }

    println!(
        "Found {} items, downloaded {}",
        report.discovered,
        report.downloaded()
    );
    for (id, reason) in report.failed() {
        println!("  item {} failed: {}", id, reason);
    }
    let skipped = report.skipped();
    if skipped > 0 {
        println!("  {} items skipped (stopped early)", skipped);
    }
}
