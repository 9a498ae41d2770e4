use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Instant;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::chat::{openai, ChatOutcome, ChatPanel, CONTEXT_RECORD_LIMIT};
use crate::config::Preferences;
use crate::import::{self, TabularData};
use crate::library::{format_size, Category, Document, Library, Visibility};
use crate::table::{
    CellValue, Column, SortState, StyleHint, TableAction, TableEvent, TableState,
};

/// Seconds before an auto-categorized upload resolves
const PENDING_CATEGORY_SECS: u64 = 2;
/// Seconds before a status toast clears
const STATUS_SECS: u64 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Sidebar,
    Files,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    FileBrowser,
    UploadForm,
    Preview,
    Confirm,
    Preferences,
    Commands,
    Help,
}

/// Sidebar navigation scopes (the original app's routes)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    Private,
    Shared,
}

impl Scope {
    pub const ALL: [Scope; 3] = [Scope::All, Scope::Private, Scope::Shared];

    pub fn label(&self) -> &'static str {
        match self {
            Scope::All => "All files",
            Scope::Private => "Private",
            Scope::Shared => "Shared with me",
        }
    }
}

/// Toolbar filter tabs above the file table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTab {
    All,
    Documents,
    Pdfs,
}

impl FilterTab {
    pub fn label(&self) -> &'static str {
        match self {
            FilterTab::All => "View all",
            FilterTab::Documents => "Documents",
            FilterTab::Pdfs => "PDFs",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            FilterTab::All => FilterTab::Documents,
            FilterTab::Documents => FilterTab::Pdfs,
            FilterTab::Pdfs => FilterTab::All,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserEntry {
    pub name: String,
    pub is_dir: bool,
    pub path: PathBuf,
}

/// In-progress upload: the selected file plus form fields.
#[derive(Debug, Clone)]
pub struct UploadDraft {
    pub path: PathBuf,
    pub title: String,
    /// Category picker position; 0 is "Auto", then [`Category::CHOICES`]
    pub category_idx: usize,
    pub shared: bool,
    /// 0 = title, 1 = category, 2 = visibility, 3 = submit
    pub field: usize,
}

impl UploadDraft {
    pub const FIELDS: usize = 4;

    pub fn category_label(&self) -> &'static str {
        if self.category_idx == 0 {
            "Auto"
        } else {
            Category::CHOICES[self.category_idx - 1].as_str()
        }
    }

    fn category(&self) -> Category {
        if self.category_idx == 0 {
            Category::Pending
        } else {
            Category::CHOICES[self.category_idx - 1]
        }
    }

    fn category_count() -> usize {
        Category::CHOICES.len() + 1
    }
}

/// What a pending Confirm popup will delete
#[derive(Debug, Clone)]
pub enum ConfirmTarget {
    One(String),
    Selected(Vec<String>),
}

/// Quick actions offered by the command palette (Ctrl+k).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    UploadFile,
    PreviewData,
    DeleteSelected,
    CycleFilter,
    SearchFiles,
    OpenPreferences,
    AskQuestion,
    ShowHelp,
}

impl Command {
    pub const ALL: [Command; 8] = [
        Command::UploadFile,
        Command::PreviewData,
        Command::DeleteSelected,
        Command::CycleFilter,
        Command::SearchFiles,
        Command::OpenPreferences,
        Command::AskQuestion,
        Command::ShowHelp,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Command::UploadFile => "Upload a file",
            Command::PreviewData => "Preview parsed data",
            Command::DeleteSelected => "Delete selected files",
            Command::CycleFilter => "Cycle filter tab",
            Command::SearchFiles => "Search by title",
            Command::OpenPreferences => "Preferences",
            Command::AskQuestion => "Ask the AI",
            Command::ShowHelp => "Help",
        }
    }
}

#[derive(Debug)]
pub struct PreviewState {
    pub title: String,
    pub data: TabularData,
}

pub struct App {
    pub section: Section,
    pub popup: Popup,
    pub scope: Scope,
    pub filter: FilterTab,

    pub library: Library,
    /// Parsed tabular contents of imported files, by document title.
    /// Not persisted; preview is available for this session's imports.
    pub datasets: HashMap<String, TabularData>,

    pub table: TableState,
    pub preview_table: TableState,
    pub preview: Option<PreviewState>,

    pub chat: ChatPanel,
    pub prefs: Preferences,

    // Search
    pub search: String,
    pub searching: bool,

    // File browser state
    pub browser_path: PathBuf,
    pub browser_entries: Vec<BrowserEntry>,
    pub browser_selected: usize,

    pub upload: Option<UploadDraft>,
    pub confirm: Option<ConfirmTarget>,

    /// 0 = model, 1 = date format (preferences popup)
    pub prefs_field: usize,

    /// Highlighted entry in the command palette
    pub command_cursor: usize,

    // Uploads waiting for their category to resolve
    pending_categories: Vec<(String, Instant)>,

    // Chat round-trips finish on a spawned task and land here
    reply_tx: UnboundedSender<ChatOutcome>,
    reply_rx: UnboundedReceiver<ChatOutcome>,

    // Status message (shown in info line, auto-clears after timeout)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,
}

impl App {
    pub fn new() -> Result<Self> {
        let library = Library::load();
        let prefs = Preferences::load().unwrap_or_default();
        Ok(Self::with(library, prefs))
    }

    /// Build the app around an already loaded library and preferences.
    fn with(library: Library, prefs: Preferences) -> Self {
        let (reply_tx, reply_rx) = unbounded_channel();

        let mut app = Self {
            section: Section::Files,
            popup: Popup::None,
            scope: Scope::All,
            filter: FilterTab::All,

            library,
            datasets: HashMap::new(),

            table: TableState::new(),
            preview_table: TableState::new(),
            preview: None,

            chat: ChatPanel::new(),
            prefs,

            search: String::new(),
            searching: false,

            browser_path: dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            browser_entries: Vec::new(),
            browser_selected: 0,

            upload: None,
            confirm: None,
            prefs_field: 0,
            command_cursor: 0,

            pending_categories: Vec::new(),

            reply_tx,
            reply_rx,

            status_message: None,
            status_message_time: None,
        };

        app.table.reset_rows(app.visible_documents().len());
        let context = app.context_data();
        app.chat.refresh_sample_questions(Some(&context));
        app
    }

    /// Set a status message (auto-clears after 3 seconds)
    fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// True while plain character keys are text, not shortcuts
    pub fn wants_text_input(&self) -> bool {
        self.searching
            || (self.section == Section::Chat && self.popup == Popup::None)
            || self.popup == Popup::UploadForm
    }

    // ---- view ----------------------------------------------------------

    /// Documents matching the current scope, filter tab and search, in
    /// library order. The table's sorted view is derived from this list.
    pub fn visible_documents(&self) -> Vec<&Document> {
        let query = self.search.to_lowercase();
        self.library
            .documents
            .iter()
            .filter(|d| match self.scope {
                Scope::All => true,
                Scope::Private => d.visibility == Visibility::Private,
                Scope::Shared => d.visibility == Visibility::Shared,
            })
            .filter(|d| match self.filter {
                FilterTab::All => true,
                FilterTab::Documents => d.kind == crate::library::FileKind::Docx,
                FilterTab::Pdfs => d.kind == crate::library::FileKind::Pdf,
            })
            .filter(|d| query.is_empty() || d.title.to_lowercase().contains(&query))
            .collect()
    }

    /// Columns for the preview popup, derived from the parsed data's keys.
    pub fn preview_columns(data: &TabularData) -> Vec<Column<serde_json::Map<String, serde_json::Value>>> {
        data.columns
            .iter()
            .map(|key| {
                let name = key.clone();
                Column::new(key.clone(), move |record: &serde_json::Map<String, serde_json::Value>| {
                    match record.get(&name) {
                        Some(serde_json::Value::Number(n)) => {
                            CellValue::Number(n.as_f64().unwrap_or(0.0))
                        }
                        Some(serde_json::Value::String(s)) => CellValue::text(s.clone()),
                        Some(serde_json::Value::Null) | None => CellValue::Empty,
                        Some(other) => CellValue::text(other.to_string()),
                    }
                })
            })
            .collect()
    }

    /// Data the chat answers questions about: the previewed dataset when
    /// one is open, otherwise the document metadata itself.
    pub fn context_data(&self) -> TabularData {
        match &self.preview {
            Some(preview) => preview.data.clone(),
            None => library_context(&self.library, self.prefs.date_format.pattern()),
        }
    }

    fn document_at_cursor(&self) -> Option<&Document> {
        let docs = self.visible_documents();
        let columns = file_columns(self.prefs.date_format.pattern());
        let order = crate::table::sorted_indices(&columns, &docs, &self.table.sort);
        order.get(self.table.cursor).map(|&i| docs[i])
    }

    fn title_at(&self, view_index: usize) -> Option<String> {
        let docs = self.visible_documents();
        let columns = file_columns(self.prefs.date_format.pattern());
        let order = crate::table::sorted_indices(&columns, &docs, &self.table.sort);
        order.get(view_index).map(|&i| docs[i].title.clone())
    }

    // ---- keys ----------------------------------------------------------

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.popup != Popup::None {
            return self.handle_popup_key(key);
        }
        if self.searching {
            self.handle_search_key(key);
            return Ok(());
        }
        self.handle_normal_key(key)
    }

    fn handle_normal_key(&mut self, key: KeyEvent) -> Result<()> {
        // Command palette opens from any section, even while typing a question
        if key.code == KeyCode::Char('k') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.popup = Popup::Commands;
            self.command_cursor = 0;
            return Ok(());
        }

        // Section cycling always wins
        match key.code {
            KeyCode::Tab => {
                self.section = match self.section {
                    Section::Sidebar => Section::Files,
                    Section::Files => Section::Chat,
                    Section::Chat => Section::Sidebar,
                };
                return Ok(());
            }
            KeyCode::BackTab => {
                self.section = match self.section {
                    Section::Sidebar => Section::Chat,
                    Section::Files => Section::Sidebar,
                    Section::Chat => Section::Files,
                };
                return Ok(());
            }
            _ => {}
        }

        match self.section {
            Section::Sidebar => self.handle_sidebar_key(key),
            Section::Files => self.handle_files_key(key)?,
            Section::Chat => self.handle_chat_key(key),
        }
        Ok(())
    }

    fn handle_sidebar_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => {
                let idx = Scope::ALL.iter().position(|s| *s == self.scope).unwrap_or(0);
                self.scope = Scope::ALL[(idx + 1) % Scope::ALL.len()];
                self.sync_table();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                let idx = Scope::ALL.iter().position(|s| *s == self.scope).unwrap_or(0);
                self.scope = Scope::ALL[idx.checked_sub(1).unwrap_or(Scope::ALL.len() - 1)];
                self.sync_table();
            }
            KeyCode::Enter => self.section = Section::Files,
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,
            _ => {}
        }
    }

    fn handle_files_key(&mut self, key: KeyEvent) -> Result<()> {
        self.sync_table();
        match key.code {
            KeyCode::Char('j') | KeyCode::Down => self.table.cursor_down(),
            KeyCode::Char('k') | KeyCode::Up => self.table.cursor_up(),

            // Column sort: keys 1 to 5 map to the visible columns
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.sort_by_column(idx);
            }

            // Selection
            KeyCode::Char(' ') => {
                self.table.dispatch(TableAction::ToggleRow(self.table.cursor));
            }
            KeyCode::Char('a') => {
                if let Some(TableEvent::SelectionChanged(sel)) =
                    self.table.dispatch(TableAction::ToggleSelectAll)
                {
                    self.set_status(format!("{} selected", sel.len()));
                }
            }

            // Destructive actions go through the confirm popup
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(TableEvent::RowActionRequested(index)) =
                    self.table.dispatch(TableAction::RowAction(self.table.cursor))
                {
                    if let Some(title) = self.title_at(index) {
                        self.set_status(format!("Delete '{}'? (y/n)", title));
                        self.confirm = Some(ConfirmTarget::One(title));
                        self.popup = Popup::Confirm;
                    }
                }
            }
            KeyCode::Char('D') => self.request_delete_selected(),

            // Upload flow
            KeyCode::Char('u') => self.start_file_browser(),

            // Preview parsed data for the highlighted document
            KeyCode::Char('p') | KeyCode::Enter => self.open_preview(),

            KeyCode::Char('f') => {
                self.filter = self.filter.next();
                self.sync_table();
                self.set_status(format!("Filter: {}", self.filter.label()));
            }
            KeyCode::Char('/') => {
                self.searching = true;
            }
            KeyCode::Char('r') => {
                self.library = Library::load();
                self.sync_table();
                self.set_status("Library reloaded");
            }
            KeyCode::Char('o') => {
                self.popup = Popup::Preferences;
                self.prefs_field = 0;
            }
            KeyCode::Char('?') | KeyCode::Char('h') => self.popup = Popup::Help,
            _ => {}
        }
        Ok(())
    }

    fn handle_chat_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.section = Section::Files,
            KeyCode::Up => self.chat.question_up(),
            KeyCode::Down => self.chat.question_down(),
            KeyCode::Enter => {
                if self.chat.input.trim().is_empty() {
                    if self.chat.take_sample_question() {
                        self.set_status("Question inserted, Enter to send");
                    }
                } else {
                    self.send_question();
                }
            }
            KeyCode::Backspace => {
                self.chat.input.pop();
            }
            KeyCode::Char(c) => self.chat.input.push(c),
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.searching = false,
            KeyCode::Esc => {
                self.searching = false;
                self.search.clear();
                self.sync_table();
            }
            KeyCode::Backspace => {
                self.search.pop();
                self.sync_table();
            }
            KeyCode::Char(c) => {
                self.search.push(c);
                self.sync_table();
            }
            _ => {}
        }
    }

    fn handle_popup_key(&mut self, key: KeyEvent) -> Result<()> {
        match self.popup {
            Popup::FileBrowser => self.handle_browser_key(key),
            Popup::UploadForm => self.handle_upload_key(key)?,
            Popup::Preview => self.handle_preview_key(key),
            Popup::Confirm => match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    self.confirm_delete();
                    self.popup = Popup::None;
                }
                KeyCode::Char('n') | KeyCode::Esc => {
                    self.confirm = None;
                    self.popup = Popup::None;
                }
                _ => {}
            },
            Popup::Preferences => self.handle_preferences_key(key),
            Popup::Commands => self.handle_commands_key(key),
            Popup::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc
                        | KeyCode::Char('?')
                        | KeyCode::Char('h')
                        | KeyCode::Enter
                        | KeyCode::Char('q')
                ) {
                    self.popup = Popup::None;
                }
            }
            Popup::None => {}
        }
        Ok(())
    }

    // ---- sorting -------------------------------------------------------

    fn sort_by_column(&mut self, index: usize) {
        let columns = file_columns(self.prefs.date_format.pattern());
        let Some(column) = columns.get(index) else {
            return;
        };
        let header = column.header.clone();
        let id = column.id.clone();
        if let Some(TableEvent::SortChanged(sort)) = self.table.dispatch(TableAction::SortBy(id)) {
            match sort {
                SortState::Unsorted => self.set_status("Sort cleared"),
                SortState::Sorted { direction, .. } => self.set_status(format!(
                    "Sorted by {} {}",
                    header,
                    match direction {
                        crate::table::SortDirection::Ascending => "▲",
                        crate::table::SortDirection::Descending => "▼",
                    }
                )),
            }
        }
    }

    fn sync_table(&mut self) {
        let count = self.visible_documents().len();
        self.table.reset_rows(count);
    }

    // ---- preview -------------------------------------------------------

    fn open_preview(&mut self) {
        let Some(doc) = self.document_at_cursor() else {
            return;
        };
        let title = doc.title.clone();
        let tabular = doc.kind.is_tabular();
        match self.datasets.get(&title) {
            Some(data) => {
                self.preview_table = TableState::new();
                self.preview_table.reset_rows(data.len());
                self.preview = Some(PreviewState { title, data: data.clone() });
                self.popup = Popup::Preview;
                let context = self.context_data();
                self.chat.refresh_sample_questions(Some(&context));
            }
            None if tabular => self.set_status("No parsed data (re-import this file to preview)"),
            None => self.set_status(format!("'{}' has no tabular data to preview", title)),
        }
    }

    fn handle_preview_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.preview = None;
                self.popup = Popup::None;
                let context = self.context_data();
                self.chat.refresh_sample_questions(Some(&context));
            }
            KeyCode::Char('j') | KeyCode::Down => self.preview_table.cursor_down(),
            KeyCode::Char('k') | KeyCode::Up => self.preview_table.cursor_up(),
            KeyCode::Char(' ') => {
                self.preview_table
                    .dispatch(TableAction::ToggleRow(self.preview_table.cursor));
            }
            KeyCode::Char('a') => {
                self.preview_table.dispatch(TableAction::ToggleSelectAll);
            }
            KeyCode::Char(c @ '1'..='9') => {
                if let Some(preview) = &self.preview {
                    let idx = c as usize - '1' as usize;
                    if let Some(column) = preview.data.columns.get(idx) {
                        self.preview_table
                            .dispatch(TableAction::SortBy(column.clone()));
                    }
                }
            }
            _ => {}
        }
    }

    // ---- upload flow ---------------------------------------------------

    fn start_file_browser(&mut self) {
        self.popup = Popup::FileBrowser;
        self.browser_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
        self.browser_selected = 0;
        self.refresh_browser();
    }

    fn refresh_browser(&mut self) {
        self.browser_entries.clear();

        if let Some(parent) = self.browser_path.parent() {
            self.browser_entries.push(BrowserEntry {
                name: "..".to_string(),
                is_dir: true,
                path: parent.to_path_buf(),
            });
        }

        if let Ok(entries) = std::fs::read_dir(&self.browser_path) {
            let mut dirs_: Vec<BrowserEntry> = Vec::new();
            let mut files: Vec<BrowserEntry> = Vec::new();

            for entry in entries.flatten() {
                let path = entry.path();
                let name = entry.file_name().to_string_lossy().to_string();

                // Skip hidden files
                if name.starts_with('.') {
                    continue;
                }

                if path.is_dir() {
                    dirs_.push(BrowserEntry { name, is_dir: true, path });
                } else if import::kind_of(&path).is_tabular() {
                    files.push(BrowserEntry { name, is_dir: false, path });
                }
            }

            dirs_.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
            files.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));

            self.browser_entries.extend(dirs_);
            self.browser_entries.extend(files);
        }

        if self.browser_selected >= self.browser_entries.len() {
            self.browser_selected = 0;
        }
    }

    fn handle_browser_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.popup = Popup::None,
            KeyCode::Char('j') | KeyCode::Down => {
                if !self.browser_entries.is_empty() {
                    self.browser_selected = (self.browser_selected + 1) % self.browser_entries.len();
                }
            }
            KeyCode::Char('k') | KeyCode::Up => {
                if !self.browser_entries.is_empty() {
                    self.browser_selected = self
                        .browser_selected
                        .checked_sub(1)
                        .unwrap_or(self.browser_entries.len() - 1);
                }
            }
            KeyCode::Enter | KeyCode::Char(' ') => {
                if let Some(entry) = self.browser_entries.get(self.browser_selected).cloned() {
                    if entry.is_dir {
                        self.browser_path = entry.path;
                        self.browser_selected = 0;
                        self.refresh_browser();
                    } else {
                        self.start_upload_form(entry.path);
                    }
                }
            }
            KeyCode::Backspace => {
                if let Some(parent) = self.browser_path.parent() {
                    self.browser_path = parent.to_path_buf();
                    self.browser_selected = 0;
                    self.refresh_browser();
                }
            }
            KeyCode::Char('h') => {
                self.browser_path = dirs::home_dir().unwrap_or_else(|| PathBuf::from("/"));
                self.browser_selected = 0;
                self.refresh_browser();
            }
            _ => {}
        }
    }

    fn start_upload_form(&mut self, path: PathBuf) {
        let title = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("Untitled")
            .to_string();
        let category_idx = self
            .prefs
            .last_category
            .as_deref()
            .and_then(|name| Category::CHOICES.iter().position(|c| c.as_str() == name))
            .map(|i| i + 1)
            .unwrap_or(0);
        self.upload = Some(UploadDraft { path, title, category_idx, shared: false, field: 0 });
        self.popup = Popup::UploadForm;
    }

    fn handle_upload_key(&mut self, key: KeyEvent) -> Result<()> {
        let Some(draft) = self.upload.as_mut() else {
            self.popup = Popup::None;
            return Ok(());
        };

        match key.code {
            KeyCode::Esc => {
                self.upload = None;
                self.popup = Popup::FileBrowser;
            }
            KeyCode::Tab => draft.field = (draft.field + 1) % UploadDraft::FIELDS,
            KeyCode::BackTab => {
                draft.field = draft.field.checked_sub(1).unwrap_or(UploadDraft::FIELDS - 1)
            }
            KeyCode::Left | KeyCode::Right => match draft.field {
                1 => {
                    let n = UploadDraft::category_count();
                    draft.category_idx = if key.code == KeyCode::Right {
                        (draft.category_idx + 1) % n
                    } else {
                        draft.category_idx.checked_sub(1).unwrap_or(n - 1)
                    };
                }
                2 => draft.shared = !draft.shared,
                _ => {}
            },
            KeyCode::Enter => {
                if draft.field == UploadDraft::FIELDS - 1 {
                    self.submit_upload()?;
                } else {
                    draft.field += 1;
                }
            }
            KeyCode::Backspace => {
                if draft.field == 0 {
                    draft.title.pop();
                }
            }
            KeyCode::Char(c) => {
                if draft.field == 0 {
                    draft.title.push(c);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn submit_upload(&mut self) -> Result<()> {
        let Some(draft) = self.upload.clone() else {
            return Ok(());
        };
        if draft.title.trim().is_empty() {
            self.set_status("Enter a file title first");
            return Ok(());
        }

        let visibility = if draft.shared { Visibility::Shared } else { Visibility::Private };
        let (document, data) =
            match import::import_document(&draft.path, draft.title.trim(), draft.category(), visibility) {
                Ok(r) => r,
                Err(e) => {
                    self.set_status(format!("Import failed: {}", e));
                    return Ok(());
                }
            };

        if self.library.over_quota_with(document.size_bytes) {
            self.set_status(format!(
                "Storage quota exceeded ({} free)",
                format_size(crate::library::STORAGE_QUOTA_BYTES.saturating_sub(self.library.used_bytes()))
            ));
            return Ok(());
        }

        let title = document.title.clone();
        let auto_category = document.category == Category::Pending;
        let size = document.size_bytes;

        if self.library.merge(vec![document]) == 0 {
            self.set_status(format!("A file titled '{}' already exists", title));
            return Ok(());
        }
        if let Err(e) = self.library.save() {
            tracing::warn!("Failed to save library: {}", e);
        }

        if let Some(data) = data {
            self.datasets.insert(title.clone(), data);
        }
        if auto_category {
            self.pending_categories.push((title.clone(), Instant::now()));
        }
        if draft.category_idx > 0 {
            self.prefs.last_category = Some(draft.category_label().to_string());
            let _ = self.prefs.save();
        }

        self.upload = None;
        self.popup = Popup::None;
        self.sync_table();
        let context = self.context_data();
        self.chat.refresh_sample_questions(Some(&context));
        self.set_status(format!("File uploaded successfully ({})", format_size(size)));
        tracing::info!("Imported '{}' ({} bytes)", title, size);
        Ok(())
    }

    // ---- command palette -----------------------------------------------

    fn handle_commands_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => self.popup = Popup::None,
            KeyCode::Char('j') | KeyCode::Down => {
                self.command_cursor = (self.command_cursor + 1) % Command::ALL.len();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.command_cursor = self
                    .command_cursor
                    .checked_sub(1)
                    .unwrap_or(Command::ALL.len() - 1);
            }
            KeyCode::Enter => {
                let command = Command::ALL[self.command_cursor];
                self.popup = Popup::None;
                self.run_command(command);
            }
            _ => {}
        }
    }

    fn run_command(&mut self, command: Command) {
        match command {
            Command::UploadFile => self.start_file_browser(),
            Command::PreviewData => {
                self.section = Section::Files;
                self.open_preview();
            }
            Command::DeleteSelected => {
                self.section = Section::Files;
                self.request_delete_selected();
            }
            Command::CycleFilter => {
                self.filter = self.filter.next();
                self.sync_table();
                self.set_status(format!("Filter: {}", self.filter.label()));
            }
            Command::SearchFiles => {
                self.section = Section::Files;
                self.searching = true;
            }
            Command::OpenPreferences => {
                self.popup = Popup::Preferences;
                self.prefs_field = 0;
            }
            Command::AskQuestion => self.section = Section::Chat,
            Command::ShowHelp => self.popup = Popup::Help,
        }
    }

    // ---- delete --------------------------------------------------------

    fn request_delete_selected(&mut self) {
        let titles: Vec<String> = self
            .table
            .selection
            .iter()
            .filter_map(|&i| self.title_at(i))
            .collect();
        if titles.is_empty() {
            self.set_status("Nothing selected");
        } else {
            self.set_status(format!("Delete {} files? (y/n)", titles.len()));
            self.confirm = Some(ConfirmTarget::Selected(titles));
            self.popup = Popup::Confirm;
        }
    }

    fn confirm_delete(&mut self) {
        let Some(target) = self.confirm.take() else {
            return;
        };
        let titles = match target {
            ConfirmTarget::One(title) => vec![title],
            ConfirmTarget::Selected(titles) => titles,
        };

        let mut removed = 0;
        for title in &titles {
            if self.library.remove(title) {
                self.datasets.remove(title);
                self.pending_categories.retain(|(t, _)| t != title);
                removed += 1;
            }
        }
        if let Err(e) = self.library.save() {
            tracing::warn!("Failed to save library: {}", e);
        }

        self.sync_table();
        let context = self.context_data();
        self.chat.refresh_sample_questions(Some(&context));
        match (removed, titles.as_slice()) {
            (1, [title]) => self.set_status(format!("Deleted '{}'", title)),
            (n, _) => self.set_status(format!("Deleted {} files", n)),
        }
    }

    // ---- preferences ---------------------------------------------------

    fn handle_preferences_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                if let Err(e) = self.prefs.save() {
                    tracing::warn!("Failed to save preferences: {}", e);
                }
                self.popup = Popup::None;
            }
            KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
                self.prefs_field = (self.prefs_field + 1) % 2;
            }
            KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
                self.prefs_field = self.prefs_field.checked_sub(1).unwrap_or(1);
            }
            KeyCode::Enter | KeyCode::Char(' ') | KeyCode::Left | KeyCode::Right => {
                match self.prefs_field {
                    0 => self.prefs.cycle_model(),
                    _ => self.prefs.date_format = self.prefs.date_format.next(),
                }
            }
            _ => {}
        }
    }

    // ---- chat ----------------------------------------------------------

    fn send_question(&mut self) {
        let question = self.chat.input.trim().to_string();
        if question.is_empty() || self.chat.waiting {
            return;
        }
        self.chat.input.clear();
        self.chat.push_user(question.clone());

        let Some(client) = openai::Client::from_env() else {
            self.chat
                .push_assistant("OPENAI_API_KEY is not set; cannot reach the model.");
            return;
        };

        self.chat.waiting = true;
        let sample = self.context_data().sample_json(CONTEXT_RECORD_LIMIT);
        let model = self.prefs.model.clone();
        let tx = self.reply_tx.clone();
        tokio::spawn(async move {
            let outcome = match client.ask(&model, &question, &sample).await {
                Ok(answer) => {
                    ChatOutcome::Answer { content: answer.content, tokens: answer.total_tokens }
                }
                Err(e) => ChatOutcome::Failed(e.to_string()),
            };
            let _ = tx.send(outcome);
        });
    }

    // ---- tick ----------------------------------------------------------

    pub fn tick(&mut self) {
        // Clear status message after timeout
        if let Some(time) = self.status_message_time {
            if time.elapsed().as_secs() >= STATUS_SECS {
                self.status_message = None;
                self.status_message_time = None;
            }
        }

        // Finished chat round-trips
        while let Ok(outcome) = self.reply_rx.try_recv() {
            self.chat.resolve(&outcome);
            if let ChatOutcome::Answer { tokens, .. } = outcome {
                self.prefs.record_usage(tokens);
                let _ = self.prefs.save();
            }
        }

        // Resolve pending categories
        let due: Vec<String> = self
            .pending_categories
            .iter()
            .filter(|(_, since)| since.elapsed().as_secs() >= PENDING_CATEGORY_SECS)
            .map(|(title, _)| title.clone())
            .collect();
        if !due.is_empty() {
            for title in due {
                let category = Category::classify(&title);
                if self.library.set_category(&title, category) {
                    self.set_status(format!("'{}' categorized as {}", title, category.as_str()));
                }
                self.pending_categories.retain(|(t, _)| t != &title);
            }
            if let Err(e) = self.library.save() {
                tracing::warn!("Failed to save library: {}", e);
            }
        }

        self.sync_table();
    }
}

/// Column set for the file table, rebuilt per render pass. The engine
/// never holds on to columns or rows across frames.
pub fn file_columns<'a>(date_pattern: &'static str) -> Vec<Column<&'a Document>> {
    vec![
        Column::new("File name", |d: &&Document| {
            CellValue::labeled(d.title.clone(), Some(d.kind.icon().to_string()), StyleHint::Strong)
        })
        .with_id("title"),
        Column::new("Size", |d: &&Document| CellValue::text(d.size_display())).with_id("size"),
        Column::new("Document type", |d: &&Document| {
            CellValue::labeled(d.category.as_str(), None, d.category.hint())
        })
        .with_id("documentType"),
        Column::new("Uploaded by", |d: &&Document| CellValue::text(d.uploaded_by.clone()))
            .with_id("uploadedBy"),
        Column::new("Last modified", move |d: &&Document| {
            CellValue::text(d.modified.format(date_pattern).to_string())
        })
        .with_id("date"),
    ]
}

/// Document metadata as tabular records, for the chat context and the
/// `--ask`/`--stats` CLI paths.
pub fn library_context(library: &Library, date_pattern: &str) -> TabularData {
    let columns: Vec<String> = ["title", "size", "type", "date", "documentType", "uploadedBy"]
        .into_iter()
        .map(String::from)
        .collect();
    let records = library
        .documents
        .iter()
        .map(|d| {
            let mut record = serde_json::Map::new();
            record.insert("title".into(), d.title.clone().into());
            record.insert("size".into(), d.size_display().into());
            record.insert("type".into(), d.kind.label().into());
            record.insert("date".into(), d.modified.format(date_pattern).to_string().into());
            record.insert("documentType".into(), d.category.as_str().into());
            record.insert("uploadedBy".into(), d.uploaded_by.clone().into());
            record
        })
        .collect();
    TabularData { columns, records }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::library::{sample_documents, FileKind};

    fn test_app() -> App {
        let library = Library::in_memory(sample_documents());
        App::with(library, Preferences::default())
    }

    #[test]
    fn scope_filters_by_visibility() {
        let mut app = test_app();
        let all = app.visible_documents().len();
        app.scope = Scope::Shared;
        let shared = app.visible_documents().len();
        assert!(shared < all);
        assert!(app
            .visible_documents()
            .iter()
            .all(|d| d.visibility == Visibility::Shared));
    }

    #[test]
    fn filter_tab_narrows_by_kind() {
        let mut app = test_app();
        app.filter = FilterTab::Pdfs;
        assert!(app.visible_documents().iter().all(|d| d.kind == FileKind::Pdf));
    }

    #[test]
    fn search_matches_titles_case_insensitively() {
        let mut app = test_app();
        app.search = "nda".into();
        let docs = app.visible_documents();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "Mutual NDA");
    }

    #[test]
    fn file_table_has_five_columns() {
        let columns: Vec<Column<&Document>> = file_columns("%Y-%m-%d");
        assert_eq!(columns.len(), 5);
        assert_eq!(columns[0].id, "title");
        assert_eq!(columns[4].id, "date");
    }

    #[test]
    fn file_name_cells_sort_on_the_title() {
        let docs = sample_documents();
        let columns = file_columns("%Y-%m-%d");
        let first = &docs[0];
        let cell = columns[0].accessor.as_ref().unwrap()(&first);
        assert_eq!(cell.sort_text(), first.title);
    }

    #[test]
    fn context_data_reflects_library_metadata() {
        let app = test_app();
        let context = app.context_data();
        assert_eq!(context.len(), app.library.documents.len());
        assert!(context.columns.contains(&"documentType".to_string()));
    }

    #[test]
    fn preview_columns_follow_data_keys() {
        let data = crate::import::parse_csv("x,y\n1,2\n").unwrap();
        let columns = App::preview_columns(&data);
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].header, "x");
    }

    #[test]
    fn building_the_app_reads_nothing_from_disk() {
        let app = test_app();
        assert!(app.library.save().is_ok());
        assert_eq!(app.library.documents.len(), sample_documents().len());
    }

    #[test]
    fn ctrl_k_opens_the_command_palette() {
        let mut app = test_app();
        let key = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        app.handle_key(key).unwrap();
        assert_eq!(app.popup, Popup::Commands);
        assert_eq!(app.command_cursor, 0);
    }

    #[test]
    fn palette_opens_from_the_chat_section_without_typing() {
        let mut app = test_app();
        app.section = Section::Chat;
        let key = KeyEvent::new(KeyCode::Char('k'), KeyModifiers::CONTROL);
        app.handle_key(key).unwrap();
        assert_eq!(app.popup, Popup::Commands);
        assert!(app.chat.input.is_empty());
    }

    #[test]
    fn palette_enter_runs_the_highlighted_command() {
        let mut app = test_app();
        app.popup = Popup::Commands;
        app.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)).unwrap();
        // first entry is the upload flow
        assert_eq!(app.popup, Popup::FileBrowser);
    }

    #[test]
    fn palette_cursor_wraps_both_ways() {
        let mut app = test_app();
        app.popup = Popup::Commands;
        app.handle_key(KeyEvent::new(KeyCode::Up, KeyModifiers::NONE)).unwrap();
        assert_eq!(app.command_cursor, Command::ALL.len() - 1);
        app.handle_key(KeyEvent::new(KeyCode::Down, KeyModifiers::NONE)).unwrap();
        assert_eq!(app.command_cursor, 0);
        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)).unwrap();
        assert_eq!(app.popup, Popup::None);
    }
}
