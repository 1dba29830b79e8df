mod args;
mod console;

use std::error::Error;
use std::path::PathBuf;

use ham_core::model::{Question, QuestionScope};
use services::{AppServices, Clock, ImportMode, QuestionBankLoader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use args::{Args, ClearTarget, Command, prepare_sqlite_file, print_usage};

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

async fn load_bank(args: &Args) -> Result<Vec<Question>, Box<dyn Error>> {
    let loader = QuestionBankLoader::from_specs(&args.questions)?;
    let bank = loader.load().await?;
    info!(questions = bank.len(), files = loader.file_count(), "question bank loaded");
    Ok(bank)
}

async fn write_output(
    path: Option<PathBuf>,
    fallback: String,
    body: &str,
) -> Result<(), Box<dyn Error>> {
    let path = path.unwrap_or_else(|| PathBuf::from(fallback));
    tokio::fs::write(&path, body).await?;
    println!("Wrote {}", path.display());
    Ok(())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse(std::env::args().skip(1), |key| std::env::var(key).ok()).map_err(
        |err| {
            eprintln!("{err}");
            print_usage();
            err
        },
    )?;

    // Binary glue owns opening the database so the services stay storage-agnostic.
    prepare_sqlite_file(&args.db_url)?;
    let services = AppServices::new_sqlite(&args.db_url, Clock::default_clock()).await?;

    match &args.command {
        Command::Practice => {
            let bank = load_bank(&args).await?;
            let mut input = console::stdin_lines();
            console::run_practice(
                &services.practice(),
                &services.ledger(),
                &bank,
                args.mode,
                QuestionScope::Class(args.class),
                &mut input,
            )
            .await?;
        }
        Command::Exam => {
            let bank = load_bank(&args).await?;
            let mut exam = services.exam_controller(args.class, &bank).await;
            let mut input = console::stdin_lines();
            console::run_exam(&mut exam, &mut input).await?;
        }
        Command::Reseed => {
            let pair = services.seeds().regenerate_seeds().await;
            println!("practice seed {}", pair.practice);
            println!("exam seed     {}", pair.exam);
        }
        Command::Wrong => {
            let wrong = services.ledger().wrong_answers().await;
            if wrong.is_empty() {
                println!("No wrong answers recorded.");
                return Ok(());
            }
            let bank = match load_bank(&args).await {
                Ok(bank) => bank,
                Err(err) => {
                    warn!("question text unavailable: {err}");
                    Vec::new()
                }
            };
            for id in &wrong {
                match bank.iter().find(|question| question.id() == id) {
                    Some(question) => println!("{id}  {}", question.text()),
                    None => println!("{id}"),
                }
            }
            println!("{} question(s)", wrong.len());
        }
        Command::Export(path) => {
            let transfer = services.transfer();
            let body = transfer.export_all_json().await?;
            write_output(path.clone(), transfer.data_file_name(), &body).await?;
        }
        Command::Import(path) => {
            let text = tokio::fs::read_to_string(path).await?;
            let report = services
                .transfer()
                .import_all(&text, ImportMode::from_merge_flag(args.merge))
                .await?;
            match report.export_date {
                Some(date) => println!(
                    "Imported {} section(s) exported {}",
                    report.sections,
                    date.format("%Y-%m-%d %H:%M")
                ),
                None => println!("Imported {} section(s)", report.sections),
            }
        }
        Command::NotesExport(path) => {
            let transfer = services.transfer();
            let body = transfer.export_notes().await?;
            write_output(path.clone(), transfer.notes_file_name(), &body).await?;
        }
        Command::NotesImport(source) => {
            let transfer = services.transfer();
            let mode = ImportMode::from_merge_flag(args.merge);
            let count = if source.starts_with("http://") || source.starts_with("https://") {
                transfer.import_notes_from_url(source, mode).await?
            } else {
                let text = tokio::fs::read_to_string(source).await?;
                transfer.import_notes(&text, mode).await?
            };
            println!("Imported {count} note(s)");
        }
        Command::Clear(target) => {
            let ledger = services.ledger();
            match target {
                ClearTarget::Wrong => ledger.clear_wrong_answers().await?,
                ClearTarget::Notes => ledger.clear_all_notes().await?,
                ClearTarget::Progress => ledger.clear_all_progress().await?,
                ClearTarget::Answers => ledger.clear_answers().await?,
                ClearTarget::All => ledger.clear_everything().await?,
            }
            println!("Cleared.");
        }
        Command::AutoAdvance(enabled) => {
            services.settings().set_auto_advance(*enabled).await?;
            println!("auto-advance {}", if *enabled { "on" } else { "off" });
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    init_tracing();
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
