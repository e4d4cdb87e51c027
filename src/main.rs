use clap::Parser;
use colored::Colorize;
use env_logger::Env;
use libmondai::db::{LocalStore, Namespace, StoreError};
use libmondai::media::MediaCache;
use libmondai::player::{PlayerError, QuizPlayer};
use libmondai::session::{QuizSession, SessionError};
use log::{debug, error, info, warn};
use rand::rngs::StdRng;
use rand::{rng, SeedableRng};
use std::path::PathBuf;
use text_io::read;
use thiserror::Error;

mod cli;

#[derive(Parser, Debug)]
#[command(name = "問題集 (Mondaishū)")]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "qna.db")]
    db: PathBuf,
    #[arg(short, long, default_value = "error")]
    log_level: String,
    /// Seed for question and answer shuffling
    #[arg(short, long)]
    seed: Option<u64>,
    /// Question set to open; asks when left out
    set: Option<String>,
}

#[derive(Debug, Error)]
pub(crate) enum Error {
    #[error("no question sets!")]
    NoQuestionSets,
    #[error("no question set named `{0}`")]
    UnknownSet(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Player(#[from] PlayerError),
    #[cfg(feature = "kittygfx")]
    #[error("Cannot read image")]
    ImageRead(#[from] std::io::Error),
    #[cfg(feature = "kittygfx")]
    #[error("cannot decode image")]
    ImageDecode(#[from] image::ImageError),
}

fn main() -> Result<(), Error> {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level)).init();

    let mut store = LocalStore::open(&args.db);
    let result = run(&mut store, args.set, args.seed);
    finish(store, result)
}

fn finish(store: LocalStore, to_error: Result<(), Error>) -> Result<(), Error> {
    match (store.close(), to_error) {
        (Ok(()), to_error) => to_error,
        (Err(err), Ok(())) => Err(err.into()),
        (Err(err), to_error) => {
            error!("[DB] Cannot close Database: {}", err);
            to_error
        }
    }
}

fn run(store: &mut LocalStore, set: Option<String>, seed: Option<u64>) -> Result<(), Error> {
    let key = match set {
        Some(key) => key,
        None => match pick_set(store)? {
            Some(key) => key,
            None => return Ok(()),
        },
    };

    let set = match store.question_set(&key)? {
        Some(set) => set,
        None => {
            warn!("[Setup] No question set '{}'", key);
            return Err(Error::UnknownSet(key));
        }
    };
    debug!("[Setup] Opened '{}' with {} questions", key, set.len());

    let shuffler = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_rng(&mut rng()),
    };
    let session = QuizSession::create(set, shuffler)?;
    println!(
        "{}",
        format!("==========> {} ({} questions) <==========", key, session.len()).cyan()
    );

    let mut player = QuizPlayer::start(store, session, MediaCache::in_temp_dir())?;
    let score = cli::cli_loop(&mut player)?;
    println!(
        "{}",
        format!("Score: {}/{} ({} answered)", score.correct, score.total, score.answered).cyan()
    );
    Ok(())
}

fn pick_set(store: &mut LocalStore) -> Result<Option<String>, Error> {
    let keys = store.list_keys(Namespace::Qna)?;
    if keys.is_empty() {
        warn!("[Setup] No question sets found.");
        println!(
            "{}",
            "No question sets found. Import one with `nyuuryokusha qna <FILE>` first!".yellow()
        );
        return Err(Error::NoQuestionSets);
    }
    info!("[Setup] {} question sets available", keys.len());

    for (i, key) in keys.iter().enumerate() {
        println!("{}. Open {} Q&A", format!("{}", i + 1).bold(), key);
    }
    loop {
        print!("{} ", "Pick a question set (number or name, q to quit):".cyan());
        let input: String = read!("{}\n");
        let input = input.trim();
        if input == "q" {
            return Ok(None);
        }
        if let Ok(num) = input.parse::<usize>() {
            if (1..=keys.len()).contains(&num) {
                return Ok(Some(keys[num - 1].clone()));
            }
        }
        if keys.iter().any(|key| key == input) {
            return Ok(Some(input.to_string()));
        }
        println!("{}", format!("No question set '{}'!", input).bright_red());
    }
}
