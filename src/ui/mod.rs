mod components;

use std::sync::OnceLock;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::app::{file_columns, App, Command, FilterTab, Popup, Scope, Section, UploadDraft};
use crate::chat::Role;
use crate::import::TabularData;
use crate::library::{format_size, STORAGE_QUOTA_BYTES};
use crate::table::{header_cells, row_cells, sorted_indices, StyleHint};
use crate::theme::Theme;

use components::{centered_rect, hint_color, usage_bar};

// Load the palette once at startup
static THEME: OnceLock<Theme> = OnceLock::new();

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::load)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn inactive() -> Color { theme().inactive }
fn success() -> Color { theme().success }
fn warning() -> Color { theme().warning }
fn danger() -> Color { theme().danger }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn bg_selected() -> Color { theme().bg_selected }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Min(10),   // Main area
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);

    // Sidebar collapses on narrow terminals
    let sidebar_width = if area.width < 90 { 0 } else { 26 };
    let main = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(sidebar_width),
            Constraint::Min(40),
            Constraint::Percentage(34),
        ])
        .split(chunks[1]);

    if sidebar_width > 0 {
        draw_sidebar(f, app, main[0]);
    }
    draw_files_box(f, app, main[1]);
    draw_chat_box(f, app, main[2]);

    draw_footer(f, app, chunks[2]);

    // Draw popups on top
    match app.popup {
        Popup::None => {}
        Popup::FileBrowser => draw_file_browser(f, app),
        Popup::UploadForm => draw_upload_form(f, app),
        Popup::Preview => draw_preview(f, app),
        Popup::Confirm => draw_confirm_popup(f, app),
        Popup::Preferences => draw_preferences(f, app),
        Popup::Commands => draw_commands(f, app),
        Popup::Help => draw_help_popup(f),
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    let line = if app.searching {
        Line::from(vec![
            Span::styled("/", Style::default().fg(accent())),
            Span::styled(app.search.clone(), Style::default().fg(text())),
            Span::styled("_", Style::default().fg(accent())),
            Span::styled("  (Enter keeps, Esc clears)", Style::default().fg(text_dim())),
        ])
    } else if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status.clone(), Style::default().fg(warning())))
    } else if app.chat.waiting {
        Line::from(Span::styled("Waiting for answer…", Style::default().fg(text_dim())))
    } else {
        Line::from(Span::styled("Ready", Style::default().fg(text_dim())))
    };

    let info = Paragraph::new(line).alignment(Alignment::Center);
    f.render_widget(info, area);
}

fn section_block(title: &str, active: bool) -> Block<'static> {
    let border_color = if active { accent() } else { inactive() };
    let title_style = if active {
        Style::default().fg(accent()).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(inactive())
    };
    Block::default()
        .title(Span::styled(format!(" {title} "), title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
}

fn draw_sidebar(f: &mut Frame, app: &App, area: Rect) {
    let block = section_block("filedeck", app.section == Section::Sidebar);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let mut lines: Vec<Line> = Vec::new();
    for scope in Scope::ALL {
        let count = app
            .library
            .documents
            .iter()
            .filter(|d| match scope {
                Scope::All => true,
                Scope::Private => d.visibility == crate::library::Visibility::Private,
                Scope::Shared => d.visibility == crate::library::Visibility::Shared,
            })
            .count();
        let selected = scope == app.scope;
        let marker = if selected { "▸ " } else { "  " };
        let style = if selected {
            Style::default().fg(accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(text())
        };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(accent())),
            Span::styled(scope.label(), style),
            Span::styled(format!("  {count}"), Style::default().fg(text_dim())),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Storage",
        Style::default().fg(header()).add_modifier(Modifier::BOLD),
    )));

    let percent = app.library.used_percent();
    let bar_color = if percent >= 90 {
        danger()
    } else if percent >= 70 {
        warning()
    } else {
        success()
    };
    let bar_width = inner.width.saturating_sub(6).max(4) as usize;
    lines.push(Line::from(vec![
        Span::styled(usage_bar(percent, bar_width), Style::default().fg(bar_color)),
        Span::styled(format!(" {percent}%"), Style::default().fg(text_dim())),
    ]));
    lines.push(Line::from(Span::styled(
        format!(
            "{} of {} used",
            format_size(app.library.used_bytes()),
            format_size(STORAGE_QUOTA_BYTES)
        ),
        Style::default().fg(text_dim()),
    )));

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "Recent",
        Style::default().fg(header()).add_modifier(Modifier::BOLD),
    )));
    for doc in app.library.recent(4) {
        lines.push(Line::from(vec![
            Span::styled(format!("{} ", doc.kind.icon()), Style::default().fg(accent())),
            Span::styled(truncated(&doc.title, inner.width.saturating_sub(3) as usize), Style::default().fg(text())),
        ]));
    }

    f.render_widget(Paragraph::new(lines), inner);
}

fn truncated(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}

fn draw_files_box(f: &mut Frame, app: &App, area: Rect) {
    let docs = app.visible_documents();
    let block = section_block(
        &format!("Files ({})", docs.len()),
        app.section == Section::Files,
    );
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Filter tabs + search
            Constraint::Min(3),    // Table
        ])
        .split(inner);

    // Toolbar: filter tabs plus the active search, if any
    let mut toolbar: Vec<Span> = Vec::new();
    for tab in [FilterTab::All, FilterTab::Documents, FilterTab::Pdfs] {
        let style = if tab == app.filter {
            Style::default().fg(accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(text_dim())
        };
        toolbar.push(Span::styled(tab.label(), style));
        toolbar.push(Span::styled(" │ ", Style::default().fg(inactive())));
    }
    if !app.search.is_empty() {
        toolbar.push(Span::styled(format!("/{}", app.search), Style::default().fg(warning())));
    }
    f.render_widget(Paragraph::new(Line::from(toolbar)), chunks[0]);

    // Header row straight from the engine; body rows in sorted order
    let columns = file_columns(app.prefs.date_format.pattern());
    let order = sorted_indices(&columns, &docs, &app.table.sort);

    let header_row = Row::new(
        header_cells(&columns, &app.table)
            .into_iter()
            .map(|cell| {
                let color = match cell.hint {
                    StyleHint::Normal => header(),
                    other => hint_color(theme(), other),
                };
                Span::styled(cell.text, Style::default().fg(color))
            })
            .collect::<Vec<_>>(),
    );

    // Window the rows so the cursor stays visible
    let visible = chunks[1].height.saturating_sub(1) as usize;
    let start = app.table.cursor.saturating_sub(visible.saturating_sub(1));

    let rows: Vec<Row> = if docs.is_empty() {
        vec![Row::new(vec![Span::styled(
            "  No files match; press 'u' to upload",
            Style::default().fg(text_dim()),
        )])]
    } else {
        order
            .iter()
            .enumerate()
            .skip(start)
            .take(visible.max(1))
            .map(|(view_pos, &row_idx)| {
                let selected = app.table.selection.contains(&view_pos);
                let cells = row_cells(&columns, &docs[row_idx], selected);
                let spans: Vec<Span> = cells
                    .into_iter()
                    .map(|cell| {
                        let color = hint_color(theme(), cell.hint);
                        let style = if cell.hint == StyleHint::Strong {
                            Style::default().fg(color).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default().fg(color)
                        };
                        Span::styled(cell.text, style)
                    })
                    .collect();
                let row_style = if view_pos == app.table.cursor && app.section == Section::Files {
                    Style::default().bg(bg_selected()).fg(text())
                } else {
                    Style::default()
                };
                Row::new(spans).style(row_style)
            })
            .collect()
    };

    let widths = vec![
        Constraint::Length(3),      // checkbox
        Constraint::Percentage(34), // file name
        Constraint::Length(9),      // size
        Constraint::Percentage(16), // document type
        Constraint::Percentage(20), // uploaded by
        Constraint::Length(10),     // last modified
        Constraint::Length(3),      // actions
    ];

    let table = Table::new(rows, widths).header(header_row.style(Style::default()));
    f.render_widget(table, chunks[1]);
}

fn draw_chat_box(f: &mut Frame, app: &App, area: Rect) {
    let block = section_block("Ask AI", app.section == Section::Chat);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Messages / suggestions
            Constraint::Length(2), // Input
        ])
        .split(inner);

    if app.chat.messages.is_empty() && !app.chat.sample_questions.is_empty() {
        // Suggestions until the first question is asked
        let mut lines = vec![
            Line::from(Span::styled(
                "Ask about your files, or pick one:",
                Style::default().fg(text_dim()),
            )),
            Line::from(""),
        ];
        for (i, question) in app.chat.sample_questions.iter().enumerate() {
            let style = if i == app.chat.question_cursor && app.section == Section::Chat {
                Style::default().fg(accent()).bg(bg_selected())
            } else {
                Style::default().fg(text())
            };
            lines.push(Line::from(Span::styled(format!(" {question} "), style)));
        }
        f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), chunks[0]);
    } else {
        let mut lines: Vec<Line> = Vec::new();
        for message in &app.chat.messages {
            let (label, color) = match message.role {
                Role::User => ("You", accent()),
                Role::Assistant => ("AI", success()),
            };
            lines.push(Line::from(vec![
                Span::styled(format!("{label}: "), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::styled(message.content.clone(), Style::default().fg(text())),
            ]));
            lines.push(Line::from(""));
        }
        if app.chat.waiting {
            lines.push(Line::from(Span::styled("Thinking…", Style::default().fg(text_dim()))));
        }

        // Pin the tail of the conversation into view
        let height = chunks[0].height as usize;
        let scroll = lines.len().saturating_sub(height) as u16;
        f.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: false }).scroll((scroll, 0)),
            chunks[0],
        );
    }

    let cursor = if app.section == Section::Chat { "_" } else { "" };
    let input = Paragraph::new(Line::from(vec![
        Span::styled("> ", Style::default().fg(accent())),
        Span::styled(format!("{}{}", app.chat.input, cursor), Style::default().fg(text())),
    ]))
    .block(Block::default().borders(Borders::TOP).border_style(Style::default().fg(inactive())));
    f.render_widget(input, chunks[1]);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = match app.section {
        Section::Sidebar => vec![
            ("↑↓", "Scope"),
            ("Enter", "Files"),
            ("Tab", "Next"),
            ("h", "Help"),
        ],
        Section::Files => vec![
            ("↑↓", "Nav"),
            ("1-5", "Sort"),
            ("Space", "Select"),
            ("a", "All"),
            ("u", "Upload"),
            ("p", "Preview"),
            ("d", "Del"),
            ("/", "Search"),
            ("o", "Prefs"),
        ],
        Section::Chat => vec![
            ("Enter", "Send"),
            ("↑↓", "Suggestions"),
            ("Esc", "Back"),
            ("Tab", "Next"),
        ],
    };

    // Responsive: show fewer hints on narrow terminals
    let max_hints = if area.width < 70 {
        5
    } else if area.width < 100 {
        7
    } else {
        hints.len()
    };

    let hint_spans: Vec<Span> = hints
        .iter()
        .take(max_hints)
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    let footer = Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center);
    f.render_widget(footer, area);
}

fn draw_file_browser(f: &mut Frame, app: &App) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 90 } else { 70 },
        if area.height < 30 { 85 } else { 70 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(" 󰈔 Select a file to upload ", Style::default().fg(accent())))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));

    f.render_widget(block, popup_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(5),
            Constraint::Length(2),
        ])
        .split(popup_area);

    let path_str = app.browser_path.to_string_lossy();
    let path_display = Paragraph::new(Line::from(vec![
        Span::styled("󰉋 ", Style::default().fg(accent())),
        Span::styled(path_str.as_ref(), Style::default().fg(text())),
    ]))
    .block(Block::default().borders(Borders::BOTTOM).border_style(Style::default().fg(inactive())));
    f.render_widget(path_display, inner[0]);

    let rows: Vec<Row> = if app.browser_entries.is_empty() {
        vec![Row::new(vec![Span::styled(
            "  No CSV or JSON files in this directory",
            Style::default().fg(text_dim()),
        )])]
    } else {
        app.browser_entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let icon = if entry.is_dir { "󰉋" } else { "󰘦" };
                let icon_color = if entry.is_dir { accent() } else { success() };

                let row_style = if i == app.browser_selected {
                    Style::default().bg(bg_selected()).fg(text())
                } else {
                    Style::default()
                };

                Row::new(vec![
                    Span::styled(format!("  {} ", icon), Style::default().fg(icon_color)),
                    Span::styled(entry.name.clone(), Style::default().fg(text())),
                ])
                .style(row_style)
            })
            .collect()
    };

    let widths = [Constraint::Length(5), Constraint::Percentage(90)];
    let table = Table::new(rows, widths);
    f.render_widget(table, inner[1]);

    let hint = Paragraph::new(Line::from(vec![
        Span::styled("j/k", Style::default().fg(accent())),
        Span::raw(" nav │ "),
        Span::styled("Enter", Style::default().fg(accent())),
        Span::raw(" select │ "),
        Span::styled("Backspace", Style::default().fg(accent())),
        Span::raw(" up │ "),
        Span::styled("Esc", Style::default().fg(accent())),
        Span::raw(" cancel"),
    ]))
    .alignment(Alignment::Center)
    .style(Style::default().fg(text_dim()));
    f.render_widget(hint, inner[2]);
}

fn draw_upload_form(f: &mut Frame, app: &App) {
    let Some(draft) = &app.upload else {
        return;
    };

    let area = f.area();
    let popup_area = centered_rect(if area.width < 90 { 80 } else { 55 }, 55, area);

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(" 󰈔 Upload file ", Style::default().fg(accent())))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));
    f.render_widget(block, popup_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // source path
            Constraint::Length(3), // title input
            Constraint::Length(1), // category
            Constraint::Length(1), // visibility
            Constraint::Min(1),
            Constraint::Length(3), // buttons
        ])
        .split(popup_area);

    let path = Paragraph::new(Line::from(vec![
        Span::styled("From: ", Style::default().fg(text_dim())),
        Span::styled(draft.path.to_string_lossy().to_string(), Style::default().fg(text())),
    ]));
    f.render_widget(path, inner[0]);

    let title_active = draft.field == 0;
    let title_cursor = if title_active { "_" } else { "" };
    let title_input = Paragraph::new(format!("{}{}", draft.title, title_cursor))
        .style(Style::default().fg(text()))
        .block(
            Block::default()
                .title(Span::styled(
                    " Title ",
                    Style::default().fg(if title_active { accent() } else { header() }),
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(if title_active { accent() } else { inactive() })),
        );
    f.render_widget(title_input, inner[1]);

    let selector = |label: &str, value: String, active: bool| {
        let value_style = if active {
            Style::default().fg(accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(text())
        };
        Line::from(vec![
            Span::styled(format!("{label}: "), Style::default().fg(text_dim())),
            Span::styled(if active { "◂ " } else { "  " }, Style::default().fg(accent())),
            Span::styled(value, value_style),
            Span::styled(if active { " ▸" } else { "  " }, Style::default().fg(accent())),
        ])
    };

    f.render_widget(
        Paragraph::new(selector("Category  ", draft.category_label().to_string(), draft.field == 1)),
        inner[2],
    );
    let visibility = if draft.shared { "Shared" } else { "Private" };
    f.render_widget(
        Paragraph::new(selector("Visibility", visibility.to_string(), draft.field == 2)),
        inner[3],
    );

    let buttons_active = draft.field == UploadDraft::FIELDS - 1;
    let buttons = Paragraph::new(Line::from(vec![
        Span::styled("  [ ", Style::default().fg(text_dim())),
        Span::styled("Enter = Upload", Style::default().fg(success()).add_modifier(Modifier::BOLD)),
        Span::styled(" ]  [ ", Style::default().fg(text_dim())),
        Span::styled("Esc = Back", Style::default().fg(danger())),
        Span::styled(" ]  ", Style::default().fg(text_dim())),
    ]))
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(if buttons_active { accent() } else { inactive() })),
    );
    f.render_widget(buttons, inner[5]);
}

fn draw_preview(f: &mut Frame, app: &App) {
    let Some(preview) = &app.preview else {
        return;
    };

    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 100 { 95 } else { 85 },
        if area.height < 35 { 90 } else { 80 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let block = Block::default()
        .title(Span::styled(
            format!(" 󰘦 {} ", preview.title),
            Style::default().fg(accent()),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(accent()));
    f.render_widget(block, popup_area);

    let inner = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(5), Constraint::Length(1)])
        .split(popup_area);

    draw_preview_table(f, app, &preview.data, inner[0]);

    let hint = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("{} rows │ ", preview.data.len()),
            Style::default().fg(text_dim()),
        ),
        Span::styled("1-9", Style::default().fg(accent())),
        Span::raw(" sort │ "),
        Span::styled("Space", Style::default().fg(accent())),
        Span::raw(" select │ "),
        Span::styled("Esc", Style::default().fg(accent())),
        Span::raw(" close"),
    ]))
    .alignment(Alignment::Center)
    .style(Style::default().fg(text_dim()));
    f.render_widget(hint, inner[1]);
}

fn draw_preview_table(f: &mut Frame, app: &App, data: &TabularData, area: Rect) {
    let columns = App::preview_columns(data);
    let order = sorted_indices(&columns, &data.records, &app.preview_table.sort);

    let header_row = Row::new(
        header_cells(&columns, &app.preview_table)
            .into_iter()
            .map(|cell| {
                let color = match cell.hint {
                    StyleHint::Normal => header(),
                    other => hint_color(theme(), other),
                };
                Span::styled(cell.text, Style::default().fg(color))
            })
            .collect::<Vec<_>>(),
    );

    let visible = area.height.saturating_sub(1) as usize;
    let start = app.preview_table.cursor.saturating_sub(visible.saturating_sub(1));

    let rows: Vec<Row> = order
        .iter()
        .enumerate()
        .skip(start)
        .take(visible.max(1))
        .map(|(view_pos, &row_idx)| {
            let selected = app.preview_table.selection.contains(&view_pos);
            let cells = row_cells(&columns, &data.records[row_idx], selected);
            let spans: Vec<Span> = cells
                .into_iter()
                .map(|cell| Span::styled(cell.text, Style::default().fg(hint_color(theme(), cell.hint))))
                .collect();
            let row_style = if view_pos == app.preview_table.cursor {
                Style::default().bg(bg_selected()).fg(text())
            } else {
                Style::default()
            };
            Row::new(spans).style(row_style)
        })
        .collect();

    // Checkbox, one equal share per data column, actions
    let share = 100 / data.columns.len().max(1) as u16;
    let mut widths = vec![Constraint::Length(3)];
    widths.extend(data.columns.iter().map(|_| Constraint::Percentage(share)));
    widths.push(Constraint::Length(3));

    let table = Table::new(rows, widths).header(header_row.style(Style::default()));
    f.render_widget(table, area);
}

fn draw_confirm_popup(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(40, 20, f.area());

    f.render_widget(Clear, popup_area);

    let message = app.status_message.as_deref().unwrap_or("Confirm?");

    let confirm = Paragraph::new(vec![
        Line::from(""),
        Line::from(Span::styled(message, Style::default().fg(warning()))),
        Line::from(""),
        Line::from(vec![
            Span::styled("  y", Style::default().fg(success()).add_modifier(Modifier::BOLD)),
            Span::raw(" Yes   "),
            Span::styled("n", Style::default().fg(danger()).add_modifier(Modifier::BOLD)),
            Span::raw(" No"),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Confirm ", Style::default().fg(warning())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(warning())),
    )
    .alignment(Alignment::Center);

    f.render_widget(confirm, popup_area);
}

fn draw_preferences(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(44, 35, f.area());

    f.render_widget(Clear, popup_area);

    let row = |label: &str, value: String, active: bool| {
        let value_style = if active {
            Style::default().fg(accent()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(text())
        };
        Line::from(vec![
            Span::styled(if active { " ▸ " } else { "   " }, Style::default().fg(accent())),
            Span::styled(format!("{label}: "), Style::default().fg(text_dim())),
            Span::styled(value, value_style),
        ])
    };

    let prefs = Paragraph::new(vec![
        Line::from(""),
        row("Model      ", app.prefs.model.clone(), app.prefs_field == 0),
        row("Date format", app.prefs.date_format.label().to_string(), app.prefs_field == 1),
        Line::from(""),
        Line::from(Span::styled(
            format!(
                "   {} messages sent, {} tokens used",
                app.prefs.usage.messages, app.prefs.usage.tokens
            ),
            Style::default().fg(text_dim()),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   ↑↓", Style::default().fg(accent())),
            Span::styled(" field │ ", Style::default().fg(text_dim())),
            Span::styled("Enter", Style::default().fg(accent())),
            Span::styled(" change │ ", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" save", Style::default().fg(text_dim())),
        ]),
    ])
    .block(
        Block::default()
            .title(Span::styled(" Preferences ", Style::default().fg(accent())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent())),
    );

    f.render_widget(prefs, popup_area);
}

fn draw_commands(f: &mut Frame, app: &App) {
    let popup_area = centered_rect(40, 40, f.area());

    f.render_widget(Clear, popup_area);

    let mut lines = vec![Line::from("")];
    for (i, command) in Command::ALL.iter().enumerate() {
        let active = i == app.command_cursor;
        let style = if active {
            Style::default().fg(accent()).bg(bg_selected()).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(text())
        };
        lines.push(Line::from(vec![
            Span::styled(if active { " ▸ " } else { "   " }, Style::default().fg(accent())),
            Span::styled(command.label(), style),
        ]));
    }
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   ↑↓", Style::default().fg(accent())),
        Span::styled(" move │ ", Style::default().fg(text_dim())),
        Span::styled("Enter", Style::default().fg(accent())),
        Span::styled(" run │ ", Style::default().fg(text_dim())),
        Span::styled("Esc", Style::default().fg(accent())),
        Span::styled(" close", Style::default().fg(text_dim())),
    ]));

    let palette = Paragraph::new(lines).block(
        Block::default()
            .title(Span::styled(" 󰘳 Commands ", Style::default().fg(accent())))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(accent())),
    );

    f.render_widget(palette, popup_area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 40 { 95 } else { 80 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let help_text = vec![
        Line::from(Span::styled("═══ Navigation ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  Tab       ", Style::default().fg(accent())),
            Span::raw("Switch sections (Sidebar → Files → Ask AI)"),
        ]),
        Line::from(vec![
            Span::styled("  ↑/↓ j/k   ", Style::default().fg(accent())),
            Span::raw("Move up/down in lists"),
        ]),
        Line::from(vec![
            Span::styled("  Ctrl+k    ", Style::default().fg(accent())),
            Span::raw("Open the command palette"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ File Table ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  1-5       ", Style::default().fg(accent())),
            Span::raw("Sort by column (again: descending, again: off)"),
        ]),
        Line::from(vec![
            Span::styled("  Space     ", Style::default().fg(accent())),
            Span::raw("Select/deselect the highlighted row"),
        ]),
        Line::from(vec![
            Span::styled("  a         ", Style::default().fg(accent())),
            Span::raw("Select all / clear selection"),
        ]),
        Line::from(vec![
            Span::styled("  d         ", Style::default().fg(accent())),
            Span::raw("Delete the highlighted file"),
        ]),
        Line::from(vec![
            Span::styled("  D         ", Style::default().fg(accent())),
            Span::raw("Delete all selected files"),
        ]),
        Line::from(vec![
            Span::styled("  p/Enter   ", Style::default().fg(accent())),
            Span::raw("Preview parsed CSV/JSON data"),
        ]),
        Line::from(vec![
            Span::styled("  f         ", Style::default().fg(accent())),
            Span::raw("Cycle filter tab (all → documents → PDFs)"),
        ]),
        Line::from(vec![
            Span::styled("  /         ", Style::default().fg(accent())),
            Span::raw("Search by title"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ Upload ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  u         ", Style::default().fg(accent())),
            Span::raw("Browse for a CSV or JSON file to import"),
        ]),
        Line::from(vec![
            Span::raw("            Category 'Auto' classifies from the title"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ Ask AI ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  Enter     ", Style::default().fg(accent())),
            Span::raw("Send question (on empty input: pick a suggestion)"),
        ]),
        Line::from(vec![
            Span::raw("            Needs OPENAI_API_KEY in the environment"),
        ]),
        Line::from(""),
        Line::from(Span::styled("═══ Quick Start ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        Line::from(vec![
            Span::styled("  filedeck                     ", Style::default().fg(accent())),
            Span::raw("Launch this TUI"),
        ]),
        Line::from(vec![
            Span::styled("  filedeck --import data.csv   ", Style::default().fg(accent())),
            Span::raw("Import from the command line"),
        ]),
        Line::from(vec![
            Span::styled("  filedeck --stats             ", Style::default().fg(accent())),
            Span::raw("Get JSON library stats for scripts"),
        ]),
        Line::from(vec![
            Span::styled("  filedeck --ask \"question\"    ", Style::default().fg(accent())),
            Span::raw("One-shot question about the library"),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("h", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("?", Style::default().fg(accent())),
            Span::styled("/", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" 󰋖 filedeck Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}
