use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use chrono::Local;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campusdesk::domain::{ListParams, StoreError};
use campusdesk::infrastructure::{AppState, Config};
use campusdesk::models::{Borrowing, BorrowingStatus, LoginForm};
use campusdesk::modules::export;
use campusdesk::services::dashboard_service;
use campusdesk::sync::processor;

const USAGE: &str = "\
Usage: campusdesk [--profile NAME] <command>

Commands:
  login <username>         Sign in (password from CAMPUSDESK_PASSWORD or stdin)
  logout                   Sign out and forget the saved tokens
  summary                  Print the dashboard numbers
  overdue                  List overdue borrowings with the fine to date
  export-fines <file.csv>  Write the fines report as CSV
  sync-products [--watch]  Mirror every book's availability into the shop";

enum Command {
    Login { username: String },
    Logout,
    Summary,
    Overdue,
    ExportFines { path: PathBuf },
    SyncProducts { watch: bool },
}

fn parse_args(args: &[String]) -> Result<(Option<String>, Command), String> {
    let mut profile = None;
    let mut rest = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--profile" {
            profile = Some(iter.next().ok_or("--profile needs a value")?.clone());
        } else {
            rest.push(arg.as_str());
        }
    }

    let command = match rest.as_slice() {
        ["login", username] => Command::Login {
            username: username.to_string(),
        },
        ["logout"] => Command::Logout,
        ["summary"] => Command::Summary,
        ["overdue"] => Command::Overdue,
        ["export-fines", path] => Command::ExportFines {
            path: PathBuf::from(path),
        },
        ["sync-products"] => Command::SyncProducts { watch: false },
        ["sync-products", "--watch"] => Command::SyncProducts { watch: true },
        [] => return Err("missing command".to_string()),
        other => return Err(format!("unknown command: {}", other.join(" "))),
    };
    Ok((profile, command))
}

fn read_password() -> io::Result<String> {
    if let Ok(password) = std::env::var("CAMPUSDESK_PASSWORD") {
        return Ok(password);
    }
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

/// Open borrowings, whether or not the server already flagged them overdue
async fn open_borrowings(state: &AppState) -> Result<Vec<Borrowing>, StoreError> {
    let borrowings = state.library().borrowings();
    let (borrowed, overdue) = tokio::join!(
        borrowings.collect_all(ListParams::new().filter("status", BorrowingStatus::Borrowed.as_str())),
        borrowings.collect_all(ListParams::new().filter("status", BorrowingStatus::Overdue.as_str())),
    );
    Ok(dashboard_service::merge_open_borrowings(borrowed?, overdue?))
}

async fn run(state: AppState, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let today = Local::now().date_naive();

    match command {
        Command::Login { username } => {
            let password = read_password()?;
            let user = state
                .auth()
                .login(&LoginForm { username, password })
                .await?;
            println!("Signed in as {}", user.display_name());
        }
        Command::Logout => {
            state.sign_out().await?;
            println!("Signed out");
        }
        Command::Summary => {
            let s = dashboard_service::load_summary(&state, today).await?;
            println!("Books              {:>8}", s.books);
            println!("Copies (available) {:>8} ({})", s.total_copies, s.available_copies);
            println!("Open borrowings    {:>8}", s.open_borrowings);
            println!("Overdue            {:>8}", s.overdue_borrowings);
            println!("Fines outstanding  {:>8.2}", s.outstanding_fines);
            println!("Fines accruing     {:>8.2}", s.accruing_fines);
            println!("Students           {:>8}", s.students);
            println!("Teachers           {:>8}", s.teachers);
            println!("Classes            {:>8}", s.classes);
            println!("Open invoices      {:>8}", s.open_invoices);
        }
        Command::Overdue => {
            let borrowings = open_borrowings(&state).await?;
            let rows = export::overdue_report(&borrowings, state.library().policy(), today);
            if rows.is_empty() {
                println!("Nothing overdue");
            }
            for row in rows {
                println!(
                    "{:<32} {:<24} due {} ({} days) {:.2}",
                    row.book, row.borrower, row.due_date, row.days_overdue, row.fine_to_date
                );
            }
        }
        Command::ExportFines { path } => {
            let library = state.library();
            let (fines, borrowings) = tokio::join!(
                library.fines().collect_all(ListParams::new()),
                library.borrowings().collect_all(ListParams::new()),
            );
            let rows = export::fine_report(&fines?, &borrowings?);
            let written = export::export_to_path(&rows, &path)?;
            println!("Wrote {} fines to {}", written, path.display());
        }
        Command::SyncProducts { watch } => {
            let sync = state.sync().clone();
            if !sync.is_enabled() {
                println!("Product sync is disabled (PRODUCT_SYNC_ENABLED=false)");
                return Ok(());
            }
            let books = state.library().books().collect_all(ListParams::new()).await?;
            for book in &books {
                let outcome = sync.mirror_book(book).await;
                tracing::debug!("Book #{:?}: {:?}", book.id, outcome);
            }
            let report = processor::process_next_batch(&sync).await;
            println!(
                "Mirrored {} books ({} retried, {} still pending)",
                books.len(),
                report.applied,
                sync.outbox().pending().len()
            );
            if watch {
                tokio::select! {
                    _ = processor::run_processor(sync, Duration::from_secs(30)) => {}
                    _ = tokio::signal::ctrl_c() => tracing::info!("Stopping stock mirror processor"),
                }
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campusdesk=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (profile, command) = match parse_args(&args) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    let mut config = Config::from_env();
    if let Some(profile) = profile {
        config.apply_profile(&profile);
    }
    tracing::debug!("Using API at {} (profile {})", config.api_root(), config.profile);

    let state = match AppState::new(config) {
        Ok(state) => state,
        Err(e) => {
            eprintln!("❌ {}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(state, command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("❌ {}", e);
            ExitCode::FAILURE
        }
    }
}
