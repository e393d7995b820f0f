//! Grimoire, chapter and plot records.
//!
//! # Invariants
//! - Names are non-empty; uniqueness is scoped to the parent.
//! - `Plot::json_data` is stored verbatim and never validated here.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key of one chapter: `(grimoire, chapter)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChapterKey {
    pub grimoire: String,
    pub chapter: String,
}

impl ChapterKey {
    pub fn new(grimoire: impl Into<String>, chapter: impl Into<String>) -> Self {
        Self {
            grimoire: grimoire.into(),
            chapter: chapter.into(),
        }
    }
}

impl Display for ChapterKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.grimoire, self.chapter)
    }
}

/// Key of one plot: `(grimoire, chapter, plot)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlotKey {
    pub grimoire: String,
    pub chapter: String,
    pub plot: String,
}

impl PlotKey {
    pub fn new(
        grimoire: impl Into<String>,
        chapter: impl Into<String>,
        plot: impl Into<String>,
    ) -> Self {
        Self {
            grimoire: grimoire.into(),
            chapter: chapter.into(),
            plot: plot.into(),
        }
    }

    /// Returns the key of the chapter owning this plot.
    pub fn chapter_key(&self) -> ChapterKey {
        ChapterKey::new(self.grimoire.clone(), self.chapter.clone())
    }

    /// Checks that every name component is non-empty.
    pub fn validate(&self) -> Result<(), NameValidationError> {
        validate_name("grimoire_name", &self.grimoire)?;
        validate_name("chapter_name", &self.chapter)?;
        validate_name("plot_name", &self.plot)
    }
}

impl Display for PlotKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.grimoire, self.chapter, self.plot)
    }
}

/// A name component was empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValidationError {
    pub field: &'static str,
}

impl Display for NameValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} must not be empty", self.field)
    }
}

impl Error for NameValidationError {}

/// Rejects empty names. Whitespace-only names are kept as given.
pub fn validate_name(field: &'static str, value: &str) -> Result<(), NameValidationError> {
    if value.is_empty() {
        return Err(NameValidationError { field });
    }
    Ok(())
}

/// One stored figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot {
    pub grimoire_name: String,
    pub chapter_name: String,
    pub name: String,
    /// Serialized figure exactly as pushed.
    pub json_data: String,
    /// Epoch ms of the latest write.
    pub created_at: i64,
    /// Position within the chapter; stable across overwrites.
    pub sort_order: i64,
}

impl Plot {
    pub fn key(&self) -> PlotKey {
        PlotKey::new(
            self.grimoire_name.clone(),
            self.chapter_name.clone(),
            self.name.clone(),
        )
    }
}

/// A chapter with its plots in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub grimoire_name: String,
    pub name: String,
    pub created_at: i64,
    pub sort_order: i64,
    pub plots: Vec<Plot>,
}

impl Chapter {
    pub fn key(&self) -> ChapterKey {
        ChapterKey::new(self.grimoire_name.clone(), self.name.clone())
    }
}

/// A grimoire with its chapters in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grimoire {
    pub name: String,
    pub created_at: i64,
    pub sort_order: i64,
    pub chapters: Vec<Chapter>,
}

impl Grimoire {
    /// Total number of plots across all chapters.
    pub fn plot_count(&self) -> usize {
        self.chapters.iter().map(|chapter| chapter.plots.len()).sum()
    }
}

/// Body of `POST /add_plot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPlotRequest {
    pub grimoire_name: String,
    pub chapter_name: String,
    pub plot_name: String,
    pub json_data: String,
}

impl AddPlotRequest {
    pub fn key(&self) -> PlotKey {
        PlotKey::new(
            self.grimoire_name.clone(),
            self.chapter_name.clone(),
            self.plot_name.clone(),
        )
    }
}

/// Success body of `POST /add_plot`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddPlotResponse {
    pub status: String,
    pub plot_name: String,
}

impl AddPlotResponse {
    pub fn success(plot_name: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            plot_name: plot_name.into(),
        }
    }
}

/// Success body of the delete endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub status: String,
    pub deleted: String,
}

impl DeleteResponse {
    pub fn success(deleted: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            deleted: deleted.into(),
        }
    }
}
