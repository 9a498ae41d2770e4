//! Document library: the data source behind the file table.
//!
//! Documents live in a JSON file under the user data directory (the
//! stand-in for browser local storage); first run seeds the sample set.

use anyhow::Result;
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::table::StyleHint;

/// Fixed storage quota: 20 MiB.
pub const STORAGE_QUOTA_BYTES: u64 = 20 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Csv,
    Json,
    Pdf,
    Docx,
    Xlsx,
    Other,
}

impl FileKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "csv" => FileKind::Csv,
            "json" => FileKind::Json,
            "pdf" => FileKind::Pdf,
            "doc" | "docx" => FileKind::Docx,
            "xls" | "xlsx" => FileKind::Xlsx,
            _ => FileKind::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            FileKind::Csv => "csv",
            FileKind::Json => "json",
            FileKind::Pdf => "pdf",
            FileKind::Docx => "docx",
            FileKind::Xlsx => "xlsx",
            FileKind::Other => "file",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            FileKind::Csv | FileKind::Json => "󰘦",
            FileKind::Pdf => "󰈦",
            FileKind::Docx => "󰈙",
            FileKind::Xlsx => "󰱾",
            FileKind::Other => "󰈔",
        }
    }

    /// Kinds the importer can turn into preview/chat data.
    pub fn is_tabular(&self) -> bool {
        matches!(self, FileKind::Csv | FileKind::Json)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Private,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// Classification not finished yet; resolved by the app tick.
    Pending,
    Product,
    Customer,
    Marketing,
    Finance,
    Hr,
    Legal,
    Operations,
    Sales,
    General,
}

impl Category {
    /// Choices offered in the upload form, in display order.
    pub const CHOICES: [Category; 9] = [
        Category::Product,
        Category::Customer,
        Category::Marketing,
        Category::Finance,
        Category::Hr,
        Category::Legal,
        Category::Operations,
        Category::Sales,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Pending => "Pending…",
            Category::Product => "Product",
            Category::Customer => "Customer",
            Category::Marketing => "Marketing",
            Category::Finance => "Finance",
            Category::Hr => "HR",
            Category::Legal => "Legal",
            Category::Operations => "Operations",
            Category::Sales => "Sales",
            Category::General => "General",
        }
    }

    pub fn hint(&self) -> StyleHint {
        match self {
            Category::Pending => StyleHint::Dim,
            Category::Product | Category::Sales => StyleHint::Accent,
            Category::Customer => StyleHint::Success,
            Category::Marketing | Category::Operations => StyleHint::Info,
            Category::Finance => StyleHint::Warning,
            Category::Legal => StyleHint::Danger,
            Category::Hr | Category::General => StyleHint::Dim,
        }
    }

    /// Keyword classification used when a pending category resolves.
    pub fn classify(title: &str) -> Category {
        let t = title.to_lowercase();
        let rules: [(&[&str], Category); 7] = [
            (&["budget", "financ", "invoice", "report"], Category::Finance),
            (&["market", "campaign", "brand"], Category::Marketing),
            (&["customer", "crm", "client"], Category::Customer),
            (&["nda", "contract", "legal", "agreement"], Category::Legal),
            (&["process", "manual", "ops"], Category::Operations),
            (&["sales", "pipeline", "deal"], Category::Sales),
            (&["product", "spec", "requirement", "roadmap"], Category::Product),
        ];
        for (keywords, category) in rules {
            if keywords.iter().any(|k| t.contains(k)) {
                return category;
            }
        }
        Category::General
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub title: String,
    pub size_bytes: u64,
    pub kind: FileKind,
    pub modified: NaiveDate,
    pub category: Category,
    pub uploaded_by: String,
    #[serde(default)]
    pub visibility: Visibility,
}

impl Document {
    pub fn size_display(&self) -> String {
        format_size(self.size_bytes)
    }
}

/// Converts bytes to the short human form used throughout the UI
/// ("27 KB", "1.2 MB", "430 B").
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.0} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Percent of quota used, rounded and clamped to 100.
pub fn storage_percent(used: u64, total: u64) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (used as f64 / total as f64 * 100.0).round() as u64;
    pct.min(100) as u8
}

#[derive(Debug, Default)]
pub struct Library {
    pub documents: Vec<Document>,
    path: Option<PathBuf>,
}

impl Library {
    /// A library that never touches disk; `save` becomes a no-op.
    pub fn in_memory(documents: Vec<Document>) -> Self {
        Self { documents, path: None }
    }

    fn store_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?
            .join("filedeck");
        if let Err(e) = std::fs::create_dir_all(&data_dir) {
            tracing::warn!("Could not create data directory: {}", e);
        }
        Ok(data_dir.join("library.json"))
    }

    /// Load the library from disk; a missing or unreadable store falls
    /// back to the seeded sample documents.
    pub fn load() -> Self {
        let path = match Self::store_path() {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("No data directory, running in-memory: {}", e);
                return Self { documents: sample_documents(), path: None };
            }
        };

        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(documents) => return Self { documents, path: Some(path) },
                    Err(e) => tracing::warn!("Failed to parse library: {}", e),
                },
                Err(e) => tracing::warn!("Failed to read library: {}", e),
            }
        }

        let library = Self { documents: sample_documents(), path: Some(path) };
        let _ = library.save();
        library
    }

    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let content = serde_json::to_string_pretty(&self.documents)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Merge incoming documents, skipping titles already present. Returns
    /// how many were added.
    pub fn merge(&mut self, incoming: Vec<Document>) -> usize {
        let mut added = 0;
        for doc in incoming {
            if self.documents.iter().any(|d| d.title == doc.title) {
                continue;
            }
            self.documents.push(doc);
            added += 1;
        }
        added
    }

    pub fn remove(&mut self, title: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.title != title);
        self.documents.len() != before
    }

    pub fn get(&self, title: &str) -> Option<&Document> {
        self.documents.iter().find(|d| d.title == title)
    }

    pub fn set_category(&mut self, title: &str, category: Category) -> bool {
        match self.documents.iter_mut().find(|d| d.title == title) {
            Some(doc) => {
                doc.category = category;
                true
            }
            None => false,
        }
    }

    pub fn used_bytes(&self) -> u64 {
        self.documents.iter().map(|d| d.size_bytes).sum()
    }

    pub fn used_percent(&self) -> u8 {
        storage_percent(self.used_bytes(), STORAGE_QUOTA_BYTES)
    }

    /// Would adding `extra` bytes blow the quota?
    pub fn over_quota_with(&self, extra: u64) -> bool {
        self.used_bytes() + extra > STORAGE_QUOTA_BYTES
    }

    /// Most recently modified documents, newest first.
    pub fn recent(&self, limit: usize) -> Vec<&Document> {
        let mut docs: Vec<&Document> = self.documents.iter().collect();
        docs.sort_by(|a, b| b.modified.cmp(&a.modified));
        docs.truncate(limit);
        docs
    }
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or_else(|| Local::now().date_naive())
}

/// The document set seeded on first run.
pub fn sample_documents() -> Vec<Document> {
    vec![
        Document {
            title: "Annual business budget".into(),
            size_bytes: 27 * 1024,
            kind: FileKind::Xlsx,
            modified: date(2024, 1, 4),
            category: Category::Finance,
            uploaded_by: "Sienna Hewitt".into(),
            visibility: Visibility::Private,
        },
        Document {
            title: "Business process manual".into(),
            size_bytes: 529 * 1024,
            kind: FileKind::Pdf,
            modified: date(2024, 1, 10),
            category: Category::Operations,
            uploaded_by: "Amélie Laurent".into(),
            visibility: Visibility::Shared,
        },
        Document {
            title: "Customer relationship management".into(),
            size_bytes: 37 * 1024,
            kind: FileKind::Xlsx,
            modified: date(2024, 2, 2),
            category: Category::Sales,
            uploaded_by: "Ammar Foley".into(),
            visibility: Visibility::Shared,
        },
        Document {
            title: "Mutual NDA".into(),
            size_bytes: 430 * 1024,
            kind: FileKind::Docx,
            modified: date(2024, 3, 1),
            category: Category::Legal,
            uploaded_by: "Sienna Hewitt".into(),
            visibility: Visibility::Private,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(title: &str, size: u64) -> Document {
        Document {
            title: title.into(),
            size_bytes: size,
            kind: FileKind::Csv,
            modified: date(2024, 6, 1),
            category: Category::General,
            uploaded_by: "You".into(),
            visibility: Visibility::Private,
        }
    }

    #[test]
    fn in_memory_library_skips_persistence() {
        let library = Library::in_memory(vec![doc("a", 1)]);
        // no store path, so saving must not fail (and writes nothing)
        assert!(library.save().is_ok());
    }

    #[test]
    fn merge_skips_duplicate_titles() {
        let mut library = Library::in_memory(vec![doc("a", 1)]);
        let added = library.merge(vec![doc("a", 99), doc("b", 2)]);
        assert_eq!(added, 1);
        assert_eq!(library.documents.len(), 2);
        // the existing record wins
        assert_eq!(library.get("a").unwrap().size_bytes, 1);
    }

    #[test]
    fn format_size_matches_ui_convention() {
        assert_eq!(format_size(430), "430 B");
        assert_eq!(format_size(27 * 1024), "27 KB");
        assert_eq!(format_size((1.2 * 1024.0 * 1024.0) as u64), "1.2 MB");
    }

    #[test]
    fn storage_percent_clamps_at_100() {
        assert_eq!(storage_percent(0, 100), 0);
        assert_eq!(storage_percent(50, 100), 50);
        assert_eq!(storage_percent(250, 100), 100);
        assert_eq!(storage_percent(10, 0), 0);
    }

    #[test]
    fn quota_check_accounts_for_incoming_file() {
        let library = Library::in_memory(vec![doc("big", STORAGE_QUOTA_BYTES - 10)]);
        assert!(!library.over_quota_with(10));
        assert!(library.over_quota_with(11));
    }

    #[test]
    fn classify_matches_keywords() {
        assert_eq!(Category::classify("Q4 Budget Report"), Category::Finance);
        assert_eq!(Category::classify("Mutual NDA"), Category::Legal);
        assert_eq!(Category::classify("holiday photos"), Category::General);
    }

    #[test]
    fn recent_returns_newest_first() {
        let mut a = doc("old", 1);
        a.modified = date(2023, 1, 1);
        let mut b = doc("new", 1);
        b.modified = date(2024, 5, 1);
        let library = Library::in_memory(vec![a, b]);
        let recent = library.recent(1);
        assert_eq!(recent[0].title, "new");
    }
}
