//! Parsers for the catalog files.
//!
//! - movies.jsonl: one JSON movie record per line
//! - users.dat: userId::experimentGroup::personality
//! - ratings.dat: userId::movieId::rating::timestamp
//! - favorites.dat: userId::movieId
//! - similar_movies.dat: movieId::similarMovieId
//!
//! Blank lines and lines starting with `#` are skipped.

use crate::affinity::PersonalityType;
use crate::error::{DataLoadError, Result};
use crate::types::*;
use std::io::ErrorKind;
use std::path::Path;
use std::str::{FromStr, Split};

/// Read a whole file, reporting a missing file by path
pub(crate) fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Iterate over meaningful lines as (1-based line number, trimmed line)
fn data_lines(content: &str) -> impl Iterator<Item = (usize, &str)> {
    content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty() && !line.starts_with('#'))
}

/// Cursor over the `::`-separated fields of one line
struct Fields<'a> {
    parts: Split<'a, &'static str>,
    file: &'a str,
    line: usize,
}

impl<'a> Fields<'a> {
    fn new(line_str: &'a str, file: &'a str, line: usize) -> Self {
        Self {
            parts: line_str.split("::"),
            file,
            line,
        }
    }

    fn error(&self, reason: String) -> DataLoadError {
        DataLoadError::ParseError {
            file: self.file.to_string(),
            line: self.line,
            reason,
        }
    }

    fn next_raw(&mut self, name: &str) -> Result<&'a str> {
        let value = self.parts.next().map(str::trim);
        value.ok_or_else(|| self.error(format!("Missing {}", name)))
    }

    fn next<T>(&mut self, name: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.next_raw(name)?;
        raw.parse()
            .map_err(|e| self.error(format!("Invalid {}: {}", name, e)))
    }
}

/// Parse movies.jsonl
pub fn parse_movies(path: &Path) -> Result<Vec<Movie>> {
    let content = read_to_string(path)?;
    let file = file_name(path);

    data_lines(&content)
        .map(|(line_no, line)| {
            serde_json::from_str::<Movie>(line).map_err(|e| DataLoadError::ParseError {
                file: file.clone(),
                line: line_no,
                reason: e.to_string(),
            })
        })
        .collect()
}

/// Parse users.dat
///
/// The personality column may be empty; an unknown experiment group falls
/// back to control.
pub fn parse_users(path: &Path) -> Result<Vec<User>> {
    let content = read_to_string(path)?;
    let file = file_name(path);
    let mut users = Vec::new();

    for (line_no, line) in data_lines(&content) {
        let mut fields = Fields::new(line, &file, line_no);
        let id = fields.next("userId")?;
        let experiment_group = fields.next("experimentGroup")?;
        let personality = match fields.next_raw("personality").unwrap_or("") {
            "" => None,
            code => Some(
                code.parse::<PersonalityType>()
                    .map_err(|e| fields.error(e.to_string()))?,
            ),
        };

        users.push(User {
            id,
            experiment_group,
            personality,
        });
    }

    Ok(users)
}

/// Parse ratings.dat
pub fn parse_ratings(path: &Path) -> Result<Vec<Rating>> {
    let content = read_to_string(path)?;
    let file = file_name(path);
    let mut ratings = Vec::new();

    for (line_no, line) in data_lines(&content) {
        let mut fields = Fields::new(line, &file, line_no);
        ratings.push(Rating {
            user_id: fields.next("userId")?,
            movie_id: fields.next("movieId")?,
            rating: fields.next("rating")?,
            timestamp: fields.next("timestamp")?,
        });
    }

    Ok(ratings)
}

/// Parse a two-column id file (favorites.dat, similar_movies.dat)
pub fn parse_id_pairs(path: &Path) -> Result<Vec<(u32, u32)>> {
    let content = read_to_string(path)?;
    let file = file_name(path);
    let mut pairs = Vec::new();

    for (line_no, line) in data_lines(&content) {
        let mut fields = Fields::new(line, &file, line_no);
        let left = fields.next("first id")?;
        let right = fields.next("second id")?;
        pairs.push((left, right));
    }

    Ok(pairs)
}
