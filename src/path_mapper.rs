//! # Path Mapper Module
//!
//! Trasforma i nomi dei file in nomi di lavoro sicuri per ffmpeg e per il
//! filesystem di destinazione, registrando la mappatura inversa per poter
//! ripristinare il nome originale sull'output finale.
//!
//! ## Regole di sanitizzazione:
//! - Spazi iniziali/finali rimossi (anche attorno all'estensione)
//! - Whitespace, caratteri di controllo e `< > : " / \ | ? *` diventano `_`
//! - L'estensione viene preservata
//! - Uno stem vuoto diventa `video`
//!
//! ## Collisioni:
//! Due nomi diversi che producono lo stesso nome di lavoro nella stessa
//! directory di output: il secondo riceve il suffisso `_<n>` (primo `n` libero).
//! L'ordine di registrazione è quello di attraversamento dell'albero, quindi il
//! risultato è deterministico.

use crate::error::CompressError;
use std::collections::HashMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Give up on disambiguation after this many suffixes
const MAX_COLLISION_SUFFIX: usize = 9999;

/// Fallback stem for names that sanitize to nothing
const EMPTY_STEM: &str = "video";

const RESERVED_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Reversible mapping between original file names and working names,
/// scoped per output directory for the duration of one batch.
#[derive(Debug, Default)]
pub struct PathMapper {
    /// output directory -> (working name -> original name)
    scopes: HashMap<PathBuf, HashMap<String, String>>,
}

impl PathMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deterministically turns `name` into a safe working name.
    pub fn sanitize(name: &str) -> String {
        let name = name.trim();
        let (stem, extension) = split_extension(name);

        let mut clean_stem: String = stem.trim().chars().map(replace_unsafe).collect();
        // trailing dots are stripped by some filesystems
        while clean_stem.ends_with('.') {
            clean_stem.pop();
        }
        if clean_stem.is_empty() {
            clean_stem = EMPTY_STEM.to_string();
        }

        match extension {
            Some(ext) => {
                let clean_ext: String = ext.trim().chars().map(replace_unsafe).collect();
                if clean_ext.is_empty() {
                    clean_stem
                } else {
                    format!("{}.{}", clean_stem, clean_ext)
                }
            }
            None => clean_stem,
        }
    }

    /// Registers `original` (a file name inside `output_dir`) and returns its
    /// unique working name. Collisions get a numeric suffix.
    pub fn register(&mut self, output_dir: &Path, original: &OsStr) -> Result<String, CompressError> {
        let original = original.to_str().ok_or_else(|| {
            CompressError::NameCollision(format!(
                "{} is not valid UTF-8 and cannot be mapped",
                original.to_string_lossy()
            ))
        })?;

        let base = Self::sanitize(original);
        let scope = self.scopes.entry(output_dir.to_path_buf()).or_default();

        if !scope.contains_key(&base) {
            scope.insert(base.clone(), original.to_string());
            return Ok(base);
        }

        let (stem, extension) = split_extension(&base);
        for n in 1..=MAX_COLLISION_SUFFIX {
            let candidate = match extension {
                Some(ext) => format!("{}_{}.{}", stem, n, ext),
                None => format!("{}_{}", stem, n),
            };
            if !scope.contains_key(&candidate) {
                scope.insert(candidate.clone(), original.to_string());
                return Ok(candidate);
            }
        }

        Err(CompressError::NameCollision(format!(
            "{} collides with {} other names in {}",
            original,
            MAX_COLLISION_SUFFIX,
            output_dir.display()
        )))
    }

    /// Original name for a working name registered in `output_dir`
    pub fn restore(&self, output_dir: &Path, working_name: &str) -> Option<&str> {
        self.scopes
            .get(output_dir)
            .and_then(|scope| scope.get(working_name))
            .map(String::as_str)
    }

    /// Number of registered names across all directories
    pub fn len(&self) -> usize {
        self.scopes.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn replace_unsafe(c: char) -> char {
    if c.is_whitespace() || c.is_control() || RESERVED_CHARS.contains(&c) {
        '_'
    } else {
        c
    }
}

/// Splits `name` into stem and extension. The stem may be empty.
fn split_extension(name: &str) -> (&str, Option<&str>) {
    match name.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (name, None),
    }
}
