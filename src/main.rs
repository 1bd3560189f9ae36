//! cavaleiro - Diário de Treino do Cavaleiro

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cavaleiro::config::{Config, DEFAULT_APP_ID, DEFAULT_DB_PATH};
use cavaleiro::editor::{ExerciseDraft, WorkoutEditor, save_confirmed};
use cavaleiro::summary::Summary;
use cavaleiro::tui::App;
use cavaleiro::workout::{Weekday, sort_by_weekday};

#[derive(Parser)]
#[command(name = "cavaleiro")]
#[command(author, version, about = "Diário de Treino do Cavaleiro - weekly workout journal")]
struct Cli {
    /// SQLite store path
    #[arg(long, global = true, env = "CAVALEIRO_DB", default_value = DEFAULT_DB_PATH)]
    db: String,

    /// Application id scoping the stored collections
    #[arg(long, global = true, env = "CAVALEIRO_APP_ID", default_value = DEFAULT_APP_ID)]
    app_id: String,

    /// Pre-issued sign-in token; anonymous sign-in when absent
    #[arg(long, global = true, env = "CAVALEIRO_AUTH_TOKEN")]
    auth_token: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open TUI journal
    Tui,

    /// Save (overwrite) the workout for a weekday
    Save {
        /// Weekday, e.g. "Segunda-feira" or "seg"
        day: Weekday,

        /// Exercise as name:series:reps:load (repeatable)
        #[arg(short, long = "exercise", required = true)]
        exercises: Vec<String>,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// List the weekly schedule
    List,

    /// Show the exercises of a weekday
    Show { day: Weekday },

    /// Toggle the completion flag of a weekday
    Toggle { day: Weekday },

    /// Show training summary and achievements
    Summary,

    /// Print the signed-in user id
    Whoami,
}

/// Split `name:series:reps:load`; the name may itself contain ':'
fn parse_exercise_arg(arg: &str) -> Result<ExerciseDraft> {
    let mut parts = arg.rsplitn(4, ':');
    let (Some(load), Some(reps), Some(series), Some(name)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        bail!("Expected name:series:reps:load, got {:?}", arg);
    };
    Ok(ExerciseDraft::new(name, series, reps, load))
}

fn confirm(day: Weekday) -> Result<bool> {
    print!(
        "Tem certeza que deseja salvar este treino para {}? Ele substituirá qualquer treino existente para este dia. [s/N] ",
        day
    );
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "s" | "sim" | "y" | "yes"))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::new(&cli.db, &cli.app_id, cli.auth_token.as_deref())
        .context("Invalid configuration")?;
    let (store, identity) = cavaleiro::bootstrap(&config)?;

    match cli.command {
        Some(Commands::Save { day, exercises, yes }) => {
            let drafts = exercises
                .iter()
                .map(|e| parse_exercise_arg(e))
                .collect::<Result<Vec<_>>>()?;
            let record = WorkoutEditor::with_drafts(day, drafts).prepare(Utc::now())?;

            if !yes && !confirm(day)? {
                println!("Cancelado.");
                return Ok(());
            }

            let outcome = save_confirmed(&store, &record);
            println!("{}", outcome.message());
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }

        Some(Commands::List) => {
            let mut workouts = store.list().context("Falha ao carregar seus treinos.")?;
            sort_by_weekday(&mut workouts);

            if workouts.is_empty() {
                println!("Nenhum treino encontrado. Use `cavaleiro save` para forjar seus treinos.");
            }

            let today = Weekday::today();
            println!("Jornada de Treino:");
            println!("{:-<60}", "");
            for w in &workouts {
                println!(
                    "{} {:15} | {:2} exercícios | {}",
                    if w.day == today { "▶" } else { " " },
                    w.day.name(),
                    w.exercises.len(),
                    if w.completed { "Concluído" } else { "Pendente" }
                );
            }
        }

        Some(Commands::Show { day }) => match store.get(day)? {
            Some(record) => {
                println!("{}", record.day);
                for line in record.detail_lines() {
                    println!("  {}", line);
                }
            }
            None => println!("Nenhum treino registrado para {}.", day),
        },

        Some(Commands::Toggle { day }) => {
            let completed = store
                .toggle_completed(day)
                .with_context(|| format!("Falha ao atualizar {}", day))?;
            println!(
                "{}: {}",
                day,
                if completed { "Treino Concluído!" } else { "Pendente" }
            );
        }

        Some(Commands::Summary) => {
            let summary = Summary::load(&store).context(cavaleiro::summary::SUMMARY_FAILURE)?;

            println!("Resumo do Cavaleiro");
            println!("{:-<40}", "");
            println!("Dias treinados (total): {}", summary.trained_days_count);
            println!("Último dia treinado: {}", summary.last_trained_label());
            println!("Dias treinados nesta semana: {}", summary.weekly_trained_count());
            println!("Volume Total Levantado (kg): {}", summary.total_volume_label());
            println!(
                "Duração Média por Treino (min): {}",
                summary.average_duration_minutes()
            );
            println!();
            println!("Conquistas do Cavaleiro:");
            for (achievement, unlocked) in summary.achievements() {
                println!(
                    "  {} {} - {}",
                    if unlocked { "★" } else { "☆" },
                    achievement.name,
                    achievement.description
                );
            }
        }

        Some(Commands::Whoami) => {
            println!("ID do Usuário: {} ({:?})", identity.user_id, identity.method);
        }

        Some(Commands::Tui) | None => {
            let mut app = App::new(store, identity);
            app.run()?;
        }
    }

    Ok(())
}
