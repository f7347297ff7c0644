use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

use crate::trainer::types::{column_name, normalize_language, WordEntry, WordList};

const DATE_COLUMN: &str = "date_added";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum WordStoreError {
    #[error("no word list found for languages: {language_1}, {language_2}")]
    NotFound { language_1: String, language_2: String },
    #[error("word list {path} has no column {column}")]
    MissingColumn { path: String, column: String },
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

/// CSV word lists named `{language_1}_{language_2}.csv` (either order),
/// with one column per capitalized language name and an optional
/// `date_added` column.
///
/// Writes are serialised per store (clones share the lock) and replace the
/// file atomically, so readers always see a complete list.
#[derive(Debug, Clone)]
pub struct WordStore {
    dir: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

struct LoadedFile {
    list: WordList,
    has_date_column: bool,
}

impl WordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn find(&self, language_1: &str, language_2: &str) -> Result<PathBuf, WordStoreError> {
        let l1 = normalize_language(language_1);
        let l2 = normalize_language(language_2);
        [format!("{l1}_{l2}.csv"), format!("{l2}_{l1}.csv")]
            .into_iter()
            .map(|name| self.dir.join(name))
            .find(|path| path.is_file())
            .ok_or(WordStoreError::NotFound {
                language_1: l1,
                language_2: l2,
            })
    }

    pub fn load(&self, language_1: &str, language_2: &str) -> Result<WordList, WordStoreError> {
        let path = self.find(language_1, language_2)?;
        let loaded = read_file(&path, language_1, language_2)?;
        debug!(path = %path.display(), words = loaded.list.len(), "word list loaded");
        Ok(loaded.list)
    }

    /// Replaces the whole list. The file must already exist.
    pub fn save(&self, language_1: &str, language_2: &str, list: &WordList) -> Result<(), WordStoreError> {
        let _guard = self.write_lock.lock();
        let path = self.find(language_1, language_2)?;
        let has_date_column = read_file(&path, language_1, language_2)
            .map(|loaded| loaded.has_date_column)
            .unwrap_or(false)
            || list.entries.iter().any(|e| e.date_added.is_some());
        write_file(&path, language_1, language_2, &list.entries, has_date_column)?;
        info!(path = %path.display(), words = list.len(), "word list saved");
        Ok(())
    }

    /// Appends the trimmed pair unless exactly that pair is already present.
    /// Returns whether a row was written.
    pub fn append_if_absent(
        &self,
        language_1: &str,
        language_2: &str,
        text_1: &str,
        text_2: &str,
    ) -> Result<bool, WordStoreError> {
        let _guard = self.write_lock.lock();
        let path = self.find(language_1, language_2)?;
        let LoadedFile {
            mut list,
            has_date_column,
        } = read_file(&path, language_1, language_2)?;

        let (text_1, text_2) = (text_1.trim(), text_2.trim());
        if list.contains_pair(text_1, text_2) {
            debug!(text_1, text_2, "word pair already present");
            return Ok(false);
        }

        let id = list.entries.iter().map(|e| e.id + 1).max().unwrap_or(0);
        list.entries.push(WordEntry {
            id,
            text_1: text_1.to_string(),
            text_2: text_2.to_string(),
            date_added: has_date_column
                .then(|| chrono::Local::now().date_naive().format(DATE_FORMAT).to_string()),
        });
        write_file(&path, language_1, language_2, &list.entries, has_date_column)?;
        info!(text_1, text_2, path = %path.display(), "word pair added");
        Ok(true)
    }

    /// Every list whose file pairs `language` with another language,
    /// merged with `language` as the first column, deduplicated and re-id'd.
    pub fn load_all_containing(&self, language: &str) -> Result<WordList, WordStoreError> {
        let language = normalize_language(language);
        let mut partners: Vec<String> = Vec::new();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        let mut paths: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().is_some_and(|ext| ext == "csv"))
            .filter(|path| {
                path.file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.to_lowercase().contains(&language))
            })
            .collect();
        paths.sort();

        for path in paths {
            let Some(partner) = partner_language(&path, &language)? else {
                continue;
            };
            let loaded = read_file(&path, &language, &partner)?;
            for entry in loaded.list.entries {
                if seen.insert((entry.text_1.clone(), entry.text_2.clone())) {
                    entries.push(WordEntry {
                        id: entries.len() as u32,
                        ..entry
                    });
                }
            }
            if !partners.contains(&partner) {
                partners.push(partner);
            }
        }

        let mut list = WordList::new(language, partners.join("+"));
        list.entries = entries;
        Ok(list)
    }
}

/// Keeps entries whose `date_added` falls inside the inclusive range.
/// Entries without a parseable date are dropped once any bound is given.
pub fn filter_by_date(
    list: WordList,
    start: Option<&str>,
    end: Option<&str>,
) -> Result<WordList, WordStoreError> {
    if start.is_none() && end.is_none() {
        return Ok(list);
    }
    let start = start
        .map(|s| parse_timestamp(s).ok_or_else(|| WordStoreError::InvalidDate(s.to_string())))
        .transpose()?;
    let end = end
        .map(|s| parse_timestamp(s).ok_or_else(|| WordStoreError::InvalidDate(s.to_string())))
        .transpose()?;

    let WordList {
        language_1,
        language_2,
        entries,
    } = list;
    let entries = entries
        .into_iter()
        .filter(|entry| {
            let Some(added) = entry.date_added.as_deref().and_then(parse_timestamp) else {
                return false;
            };
            start.map_or(true, |s| added >= s) && end.map_or(true, |e| added <= e)
        })
        .collect();

    Ok(WordList {
        language_1,
        language_2,
        entries,
    })
}

fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_FORMAT)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn partner_language(path: &Path, language: &str) -> Result<Option<String>, WordStoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?;
    let languages: Vec<String> = headers
        .iter()
        .filter(|h| *h != DATE_COLUMN)
        .map(normalize_language)
        .collect();
    if !languages.iter().any(|l| l == language) {
        return Ok(None);
    }
    Ok(languages.into_iter().find(|l| l != language))
}

fn read_file(path: &Path, language_1: &str, language_2: &str) -> Result<LoadedFile, WordStoreError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers = reader.headers()?.clone();

    let column = |language: &str| {
        let name = column_name(language);
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or_else(|| WordStoreError::MissingColumn {
                path: path.display().to_string(),
                column: name,
            })
    };
    let col_1 = column(language_1)?;
    let col_2 = column(language_2)?;
    let date_col = headers.iter().position(|h| h.trim() == DATE_COLUMN);

    let mut list = WordList::new(language_1, language_2);
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        list.entries.push(WordEntry {
            id: row as u32,
            text_1: record.get(col_1).unwrap_or_default().to_string(),
            text_2: record.get(col_2).unwrap_or_default().to_string(),
            date_added: date_col
                .and_then(|c| record.get(c))
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string),
        });
    }

    Ok(LoadedFile {
        list,
        has_date_column: date_col.is_some(),
    })
}

/// Writes next to `path` and renames over it.
fn write_file(
    path: &Path,
    language_1: &str,
    language_2: &str,
    entries: &[WordEntry],
    with_date: bool,
) -> Result<(), WordStoreError> {
    let tmp_path = path.with_extension("csv.tmp");
    let mut writer = csv::Writer::from_path(&tmp_path)?;
    let mut header = vec![column_name(language_1), column_name(language_2)];
    if with_date {
        header.push(DATE_COLUMN.to_string());
    }
    writer.write_record(&header)?;

    for entry in entries {
        if with_date {
            writer.write_record([
                entry.text_1.as_str(),
                entry.text_2.as_str(),
                entry.date_added.as_deref().unwrap_or_default(),
            ])?;
        } else {
            writer.write_record([entry.text_1.as_str(), entry.text_2.as_str()])?;
        }
    }
    writer.flush()?;
    drop(writer);

    if let Err(err) = std::fs::rename(&tmp_path, path) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err.into());
    }
    Ok(())
}
