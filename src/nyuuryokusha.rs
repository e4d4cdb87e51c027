use colored::Colorize;
use env_logger::Env;
use log::{error, info};
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use libmondai::db::{LocalStore, Namespace, StoreError};
use libmondai::key::KeyStrategyKind;
use libmondai::shitsumon::{ImportError, QuestionSet};
use thiserror::Error;

#[derive(Parser, Debug)]
#[command(name = "入力者 (Nyūryokusha)")]
#[command(version, about = "Imports question sets and media into the quiz database", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    #[arg(short, long, default_value = "info")]
    log_level: String,
    #[arg(short, long, value_name = "FILE", default_value = "qna.db")]
    db: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a JSON question set
    Qna {
        file: PathBuf,
        /// How the storage key is derived from the file name
        #[arg(short, long, value_enum, default_value_t = KeyStrategyKind::Extension)]
        key_strategy: KeyStrategyKind,
    },
    /// Import media files, each stored under its file name
    Media {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List what is stored
    List,
}

#[derive(Debug, Error)]
enum Error {
    #[error("cannot read {0:?}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("cannot derive a key from {0:?}")]
    NoKey(PathBuf),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn file_name(path: &Path) -> Option<&str> {
    path.file_name().and_then(|name| name.to_str())
}

fn import_qna(store: &mut LocalStore, file: &Path, key_strategy: KeyStrategyKind) -> Result<(), Error> {
    let key = file_name(file)
        .and_then(|name| key_strategy.strategy().derive(name))
        .ok_or_else(|| Error::NoKey(file.to_path_buf()))?;
    let json = std::fs::read_to_string(file).map_err(|err| Error::Read(file.to_path_buf(), err))?;
    let set = QuestionSet::parse(&json)?;

    info!(
        "{}",
        format!("Importing {:?} as '{}' ({} questions)", file, key, set.len()).blue()
    );
    store.save_question_set(&key, set)?;
    info!("{}", format!("├ {} uploaded", key).green());
    Ok(())
}

fn import_media(store: &mut LocalStore, files: &[PathBuf]) -> Result<(), Error> {
    info!("{}", format!("Importing media... ({} files)", files.len()).blue());
    for file in files {
        let key = file_name(file).ok_or_else(|| Error::NoKey(file.clone()))?;
        let bytes = std::fs::read(file).map_err(|err| Error::Read(file.clone(), err))?;
        store.save_media(key, bytes)?;
        info!("{}", format!("├ {} uploaded", key).green());
    }
    Ok(())
}

fn list(store: &mut LocalStore) -> Result<(), Error> {
    for namespace in Namespace::ALL {
        let keys = store.list_keys(namespace)?;
        println!("{}", format!("{} ({})", namespace, keys.len()).cyan());
        for key in keys {
            println!("├ {}", key);
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(args.log_level)).init();
    info!("{}", format!("Database at {:?}", args.db).cyan());

    let mut store = LocalStore::open(&args.db);
    let result = match &args.command {
        Commands::Qna { file, key_strategy } => {
            import_qna(&mut store, file, *key_strategy).and_then(|_| list(&mut store))
        }
        Commands::Media { files } => import_media(&mut store, files),
        Commands::List => list(&mut store),
    };
    let closed = store.close();

    if let Err(err) = result {
        error!("{}", format!("{}", err).red());
        eprintln!("{}", format!("Import failed: {}", err).red());
        std::process::exit(1);
    }
    if let Err(err) = closed {
        error!("{}", format!("Unable to close Database: {}", err).red());
        std::process::exit(1);
    }
}
