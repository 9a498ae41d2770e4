//! Generic sortable/selectable table engine.
//!
//! Columns and rows are supplied fresh by the caller on every render pass;
//! the engine owns only sort and selection state. All state changes go
//! through [`TableState::dispatch`], which returns the event the caller may
//! react to (reducer-style, no hidden mutation paths).

use std::cmp::Ordering;
use std::collections::BTreeSet;

use chrono::NaiveDate;

/// Visual treatment for a cell or column, resolved to theme colors by the
/// rendering layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StyleHint {
    #[default]
    Normal,
    Strong,
    Dim,
    Accent,
    Success,
    Warning,
    Danger,
    Info,
}

/// A displayable value extracted from a row.
///
/// `Labeled` carries decorated content (an icon or tag around a plain
/// label); sorting unwraps the label text, so a column can display
/// `󰈙 report.pdf` while still sorting on `report.pdf`.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Labeled {
        label: String,
        prefix: Option<String>,
        hint: StyleHint,
    },
}

impl CellValue {
    pub fn text(s: impl Into<String>) -> Self {
        CellValue::Text(s.into())
    }

    pub fn labeled(label: impl Into<String>, prefix: Option<String>, hint: StyleHint) -> Self {
        CellValue::Labeled { label: label.into(), prefix, hint }
    }

    /// The plain text used for sorting. Decorated content unwraps to its
    /// label; numbers stringify.
    pub fn sort_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text(s) => s.clone(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Labeled { label, .. } => label.clone(),
        }
    }

    /// The full text shown in the cell, prefix included.
    pub fn display_text(&self) -> String {
        match self {
            CellValue::Labeled { label, prefix: Some(p), .. } => format!("{p} {label}"),
            other => other.sort_text(),
        }
    }

    pub fn hint(&self) -> StyleHint {
        match self {
            CellValue::Labeled { hint, .. } => *hint,
            _ => StyleHint::Normal,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(s) => s.trim().parse().ok(),
            CellValue::Labeled { label, .. } => label.trim().parse().ok(),
            CellValue::Empty => None,
        }
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// Extracts a displayable value from a row for one column.
pub type Accessor<R> = Box<dyn Fn(&R) -> CellValue>;

/// Caller-supplied definition of one table column. Immutable for the
/// lifetime of a render pass.
pub struct Column<R> {
    pub id: String,
    pub header: String,
    pub accessor: Option<Accessor<R>>,
    pub hint: StyleHint,
}

impl<R> Column<R> {
    /// A sortable column; the id defaults to the header text.
    pub fn new(header: impl Into<String>, accessor: impl Fn(&R) -> CellValue + 'static) -> Self {
        let header = header.into();
        Self {
            id: header.clone(),
            header,
            accessor: Some(Box::new(accessor)),
            hint: StyleHint::Normal,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_hint(mut self, hint: StyleHint) -> Self {
        self.hint = hint;
        self
    }

    fn extract(&self, row: &R) -> CellValue {
        match &self.accessor {
            Some(f) => f(row),
            None => CellValue::Empty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Sort state: direction exists iff a column is active, enforced by
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortState {
    #[default]
    Unsorted,
    Sorted {
        column: String,
        direction: SortDirection,
    },
}

impl SortState {
    /// Cycle for one column: ascending → descending → none. Picking a
    /// different column resets to ascending and drops the old column.
    pub fn cycled(&self, column_id: &str) -> SortState {
        match self {
            SortState::Sorted { column, direction } if column == column_id => match direction {
                SortDirection::Ascending => SortState::Sorted {
                    column: column.clone(),
                    direction: SortDirection::Descending,
                },
                SortDirection::Descending => SortState::Unsorted,
            },
            _ => SortState::Sorted {
                column: column_id.to_string(),
                direction: SortDirection::Ascending,
            },
        }
    }

    pub fn direction_for(&self, column_id: &str) -> Option<SortDirection> {
        match self {
            SortState::Sorted { column, direction } if column == column_id => Some(*direction),
            _ => None,
        }
    }
}

/// State change requests, dispatched by the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum TableAction {
    SortBy(String),
    ToggleSelectAll,
    ToggleRow(usize),
    /// Per-row destructive action placeholder. The table only signals
    /// upward; execution belongs to the caller.
    RowAction(usize),
}

/// Events emitted back to the caller after a dispatch.
#[derive(Debug, Clone, PartialEq)]
pub enum TableEvent {
    SortChanged(SortState),
    SelectionChanged(BTreeSet<usize>),
    RowActionRequested(usize),
}

/// Sort + selection state for one table instance.
///
/// Selection indices always refer to the currently rendered sorted view;
/// swapping in a new row array must go through [`TableState::reset_rows`],
/// which rebuilds the selection (no identity tracking across data changes).
#[derive(Debug, Default)]
pub struct TableState {
    pub sort: SortState,
    pub selection: BTreeSet<usize>,
    /// Highlighted row in the sorted view, for keyboard navigation.
    pub cursor: usize,
    row_count: usize,
}

impl TableState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Called whenever the caller swaps in a new row array.
    pub fn reset_rows(&mut self, row_count: usize) {
        if row_count != self.row_count {
            self.selection.clear();
            self.row_count = row_count;
        }
        if self.cursor >= row_count {
            self.cursor = row_count.saturating_sub(1);
        }
    }

    pub fn all_selected(&self) -> bool {
        self.row_count > 0 && self.selection.len() == self.row_count
    }

    pub fn some_selected(&self) -> bool {
        !self.selection.is_empty() && self.selection.len() < self.row_count
    }

    pub fn cursor_down(&mut self) {
        if self.row_count > 0 {
            self.cursor = (self.cursor + 1) % self.row_count;
        }
    }

    pub fn cursor_up(&mut self) {
        if self.row_count > 0 {
            self.cursor = self.cursor.checked_sub(1).unwrap_or(self.row_count - 1);
        }
    }

    /// Apply one action and report what changed.
    pub fn dispatch(&mut self, action: TableAction) -> Option<TableEvent> {
        match action {
            TableAction::SortBy(column_id) => {
                self.sort = self.sort.cycled(&column_id);
                Some(TableEvent::SortChanged(self.sort.clone()))
            }
            TableAction::ToggleSelectAll => {
                if self.all_selected() {
                    self.selection.clear();
                } else {
                    self.selection = (0..self.row_count).collect();
                }
                Some(TableEvent::SelectionChanged(self.selection.clone()))
            }
            TableAction::ToggleRow(index) => {
                if index >= self.row_count {
                    return None;
                }
                if !self.selection.remove(&index) {
                    self.selection.insert(index);
                }
                Some(TableEvent::SelectionChanged(self.selection.clone()))
            }
            TableAction::RowAction(index) => {
                (index < self.row_count).then_some(TableEvent::RowActionRequested(index))
            }
        }
    }
}

/// Three-tier value comparison: dates as timestamps, then numbers, then
/// case-folded strings. Total over any pair of cells; malformed content
/// falls through to string comparison.
pub fn compare_extracted(a: &CellValue, b: &CellValue) -> Ordering {
    let (at, bt) = (a.sort_text(), b.sort_text());

    if let (Some(ad), Some(bd)) = (parse_date(&at), parse_date(&bt)) {
        return ad.cmp(&bd);
    }

    if let (Some(an), Some(bn)) = (a.as_number(), b.as_number()) {
        return an.partial_cmp(&bn).unwrap_or(Ordering::Equal);
    }

    // Case-insensitive first so "apple" sorts before "Banana", with a
    // case-sensitive tie-break for determinism.
    let (al, bl) = (at.to_lowercase(), bt.to_lowercase());
    al.cmp(&bl).then_with(|| at.cmp(&bt))
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y", "%m/%d/%Y"];

fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

/// Row order for the current sort state: indices into `rows`, stable under
/// equal keys. Unsorted state, unknown columns and accessor-less columns
/// all yield the identity order.
pub fn sorted_indices<R>(columns: &[Column<R>], rows: &[R], sort: &SortState) -> Vec<usize> {
    let mut order: Vec<usize> = (0..rows.len()).collect();
    let SortState::Sorted { column, direction } = sort else {
        return order;
    };
    let Some(col) = columns.iter().find(|c| &c.id == column) else {
        return order;
    };
    if col.accessor.is_none() {
        return order;
    }

    let keys: Vec<CellValue> = rows.iter().map(|r| col.extract(r)).collect();
    order.sort_by(|&a, &b| {
        let ord = compare_extracted(&keys[a], &keys[b]);
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
    order
}

/// One rendered cell: display text plus its style hint.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCell {
    pub text: String,
    pub hint: StyleHint,
}

/// Header cells: select-all checkbox, one cell per column (with sort
/// indicator), and the actions column.
pub fn header_cells<R>(columns: &[Column<R>], state: &TableState) -> Vec<RenderedCell> {
    let checkbox = if state.all_selected() {
        "[x]"
    } else if state.some_selected() {
        "[-]" // indeterminate is visual only
    } else {
        "[ ]"
    };

    let mut cells = vec![RenderedCell { text: checkbox.to_string(), hint: StyleHint::Dim }];
    for col in columns {
        let (text, hint) = match state.sort.direction_for(&col.id) {
            Some(SortDirection::Ascending) => (format!("{} ▲", col.header), StyleHint::Accent),
            Some(SortDirection::Descending) => (format!("{} ▼", col.header), StyleHint::Accent),
            None => (col.header.clone(), StyleHint::Normal),
        };
        cells.push(RenderedCell { text, hint });
    }
    cells.push(RenderedCell { text: "⋮".to_string(), hint: StyleHint::Dim });
    cells
}

/// Body cells for one row in the sorted view.
pub fn row_cells<R>(columns: &[Column<R>], row: &R, selected: bool) -> Vec<RenderedCell> {
    let checkbox = if selected { "[x]" } else { "[ ]" };
    let mut cells = vec![RenderedCell {
        text: checkbox.to_string(),
        hint: if selected { StyleHint::Accent } else { StyleHint::Dim },
    }];
    for col in columns {
        let value = col.extract(row);
        let hint = match value.hint() {
            StyleHint::Normal => col.hint,
            other => other,
        };
        cells.push(RenderedCell { text: value.display_text(), hint });
    }
    cells.push(RenderedCell { text: "⋮".to_string(), hint: StyleHint::Dim });
    cells
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Rec {
        name: &'static str,
        date: &'static str,
        size: f64,
    }

    fn columns() -> Vec<Column<Rec>> {
        vec![
            Column::new("Name", |r: &Rec| CellValue::text(r.name)).with_id("name"),
            Column::new("Date", |r: &Rec| CellValue::text(r.date)).with_id("date"),
            Column::new("Size", |r: &Rec| CellValue::Number(r.size)).with_id("size"),
        ]
    }

    fn rows() -> Vec<Rec> {
        vec![
            Rec { name: "Banana", date: "2024-01-02", size: 10.0 },
            Rec { name: "apple", date: "2024-01-01", size: 2.0 },
        ]
    }

    fn sorted<'a>(state: &TableState, rows: &'a [Rec]) -> Vec<&'a str> {
        sorted_indices(&columns(), rows, &state.sort)
            .into_iter()
            .map(|i| rows[i].name)
            .collect()
    }

    #[test]
    fn header_has_one_cell_per_column_plus_two() {
        let state = TableState::new();
        let cells = header_cells(&columns(), &state);
        assert_eq!(cells.len(), columns().len() + 2);
        assert_eq!(cells[0].text, "[ ]");
        assert_eq!(cells.last().unwrap().text, "⋮");
    }

    #[test]
    fn body_row_matches_header_shape() {
        let rows = rows();
        let cells = row_cells(&columns(), &rows[0], false);
        assert_eq!(cells.len(), columns().len() + 2);
        assert_eq!(cells[1].text, "Banana");
    }

    #[test]
    fn sort_cycles_asc_desc_none() {
        let mut state = TableState::new();
        state.reset_rows(2);

        state.dispatch(TableAction::SortBy("name".into()));
        assert_eq!(state.sort.direction_for("name"), Some(SortDirection::Ascending));

        state.dispatch(TableAction::SortBy("name".into()));
        assert_eq!(state.sort.direction_for("name"), Some(SortDirection::Descending));

        state.dispatch(TableAction::SortBy("name".into()));
        assert_eq!(state.sort, SortState::Unsorted);

        // back to ascending; asc → asc is unreachable
        state.dispatch(TableAction::SortBy("name".into()));
        assert_eq!(state.sort.direction_for("name"), Some(SortDirection::Ascending));
    }

    #[test]
    fn switching_column_resets_to_ascending() {
        let mut state = TableState::new();
        state.dispatch(TableAction::SortBy("name".into()));
        state.dispatch(TableAction::SortBy("name".into()));
        state.dispatch(TableAction::SortBy("date".into()));
        assert_eq!(state.sort.direction_for("date"), Some(SortDirection::Ascending));
        assert_eq!(state.sort.direction_for("name"), None);
    }

    #[test]
    fn dates_sort_as_timestamps() {
        let mut state = TableState::new();
        state.reset_rows(2);
        state.dispatch(TableAction::SortBy("date".into()));
        // 2024-01-01 before 2024-01-02
        assert_eq!(sorted(&state, &rows()), vec!["apple", "Banana"]);
    }

    #[test]
    fn strings_sort_case_insensitively() {
        let mut state = TableState::new();
        state.reset_rows(2);
        state.dispatch(TableAction::SortBy("name".into()));
        assert_eq!(sorted(&state, &rows()), vec!["apple", "Banana"]);

        state.dispatch(TableAction::SortBy("name".into()));
        assert_eq!(sorted(&state, &rows()), vec!["Banana", "apple"]);
    }

    #[test]
    fn numbers_sort_numerically() {
        let mut state = TableState::new();
        state.reset_rows(2);
        state.dispatch(TableAction::SortBy("size".into()));
        assert_eq!(sorted(&state, &rows()), vec!["apple", "Banana"]);
    }

    #[test]
    fn human_dates_compare_as_dates() {
        let a = CellValue::text("Jan 4, 2024");
        let b = CellValue::text("Feb 2, 2024");
        assert_eq!(compare_extracted(&a, &b), Ordering::Less);
    }

    #[test]
    fn labeled_cells_sort_on_their_label() {
        let a = CellValue::labeled("alpha.csv", Some("󰈙".into()), StyleHint::Normal);
        let b = CellValue::labeled("beta.csv", Some("󰈙".into()), StyleHint::Normal);
        assert_eq!(compare_extracted(&a, &b), Ordering::Less);
    }

    #[test]
    fn malformed_values_fall_through_to_strings() {
        let a = CellValue::text("not-a-date");
        let b = CellValue::Empty;
        // must not panic, empty sorts first
        assert_eq!(compare_extracted(&a, &b), Ordering::Greater);
    }

    #[test]
    fn toggle_select_all_is_an_involution() {
        let mut state = TableState::new();
        state.reset_rows(3);

        // empty → all → empty
        state.dispatch(TableAction::ToggleSelectAll);
        assert!(state.all_selected());
        state.dispatch(TableAction::ToggleSelectAll);
        assert!(state.selection.is_empty());

        // all → empty → all
        state.dispatch(TableAction::ToggleSelectAll);
        let all = state.selection.clone();
        state.dispatch(TableAction::ToggleSelectAll);
        state.dispatch(TableAction::ToggleSelectAll);
        assert_eq!(state.selection, all);
    }

    #[test]
    fn toggling_rows_flips_membership() {
        let mut state = TableState::new();
        state.reset_rows(3);
        state.dispatch(TableAction::ToggleRow(0));
        state.dispatch(TableAction::ToggleRow(1));
        state.dispatch(TableAction::ToggleRow(0));
        assert_eq!(state.selection, BTreeSet::from([1]));
    }

    #[test]
    fn selection_rebuilt_on_data_swap() {
        let mut state = TableState::new();
        state.reset_rows(3);
        state.dispatch(TableAction::ToggleSelectAll);
        state.reset_rows(5);
        assert!(state.selection.is_empty());
    }

    #[test]
    fn row_action_signals_upward() {
        let mut state = TableState::new();
        state.reset_rows(2);
        assert_eq!(
            state.dispatch(TableAction::RowAction(1)),
            Some(TableEvent::RowActionRequested(1))
        );
        assert_eq!(state.dispatch(TableAction::RowAction(9)), None);
    }

    #[test]
    fn indeterminate_is_visual_only() {
        let mut state = TableState::new();
        state.reset_rows(3);
        state.dispatch(TableAction::ToggleRow(0));
        let cells = header_cells(&columns(), &state);
        assert_eq!(cells[0].text, "[-]");
        // toggling all from indeterminate selects everything
        state.dispatch(TableAction::ToggleSelectAll);
        assert!(state.all_selected());
    }
}
