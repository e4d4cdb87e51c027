use clap::ValueEnum;
use std::path::Path;

/// Turns an uploaded file name into the key its question set is stored under.
pub trait KeyStrategy {
    /// `None` when the file name yields an empty key.
    fn derive(&self, file_name: &str) -> Option<String>;
}

/// Everything after the last `.`; a name without one is used whole.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExtensionKey;

/// The file name with its final extension removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StemKey;

#[derive(Debug, Clone, Copy, Default)]
pub struct FileNameKey;

fn non_empty(key: &str) -> Option<String> {
    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

fn base_name(file_name: &str) -> &str {
    Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name)
}

impl KeyStrategy for ExtensionKey {
    fn derive(&self, file_name: &str) -> Option<String> {
        let name = base_name(file_name);
        non_empty(name.rsplit('.').next().unwrap_or(name))
    }
}

impl KeyStrategy for StemKey {
    fn derive(&self, file_name: &str) -> Option<String> {
        let name = base_name(file_name);
        match name.rfind('.') {
            Some(0) | None => non_empty(name),
            Some(dot) => non_empty(&name[..dot]),
        }
    }
}

impl KeyStrategy for FileNameKey {
    fn derive(&self, file_name: &str) -> Option<String> {
        non_empty(base_name(file_name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum KeyStrategyKind {
    #[default]
    Extension,
    Stem,
    FileName,
}

impl KeyStrategyKind {
    pub fn strategy(self) -> Box<dyn KeyStrategy> {
        match self {
            KeyStrategyKind::Extension => Box::new(ExtensionKey),
            KeyStrategyKind::Stem => Box::new(StemKey),
            KeyStrategyKind::FileName => Box::new(FileNameKey),
        }
    }
}
