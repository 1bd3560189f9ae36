//! TUI module - terminal training journal with ratatui
//!
//! Three tabs (schedule, editor, summary) and four dialogs. All UI state
//! lives in [`App`]; each tab mounts its data when shown and drops it when
//! hidden, which also releases the schedule's live subscription.

use anyhow::Result;
use chrono::Utc;
use crossterm::{
    ExecutableCommand,
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, List, ListItem, Paragraph, Row, Table, Tabs, Wrap},
};
use std::io::{Stdout, stdout};
use tracing::error;

use crate::achievements::Achievement;
use crate::auth::Identity;
use crate::editor::{DraftField, LOAD_FAILURE, WorkoutEditor, save_confirmed};
use crate::store::WorkoutStore;
use crate::summary::{SUMMARY_FAILURE, Summary};
use crate::viewer::{EMPTY_MESSAGE, ViewState, WorkoutViewer};
use crate::workout::{Weekday, WorkoutRecord};

type Tui = Terminal<CrosstermBackend<Stdout>>;

const TOGGLE_FAILURE: &str = "Falha ao atualizar o status do treino.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    View,
    Register,
    Report,
}

impl Tab {
    pub fn all() -> &'static [Tab] {
        &[Tab::View, Tab::Register, Tab::Report]
    }

    pub fn title(&self) -> &'static str {
        match self {
            Tab::View => "Jornada de Treino",
            Tab::Register => "Forjar Treino",
            Tab::Report => "Resumo do Cavaleiro",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }

    fn next(&self) -> Tab {
        Tab::all()[(self.index() + 1) % Tab::all().len()]
    }

    fn prev(&self) -> Tab {
        Tab::all()[(self.index() + Tab::all().len() - 1) % Tab::all().len()]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modal {
    ConfirmSave(WorkoutRecord),
    SaveResult { message: String, kind: Notice },
    WorkoutDetail(WorkoutRecord),
    AchievementDetail {
        achievement: &'static Achievement,
        unlocked: bool,
    },
}

impl Modal {
    fn error(message: &str) -> Self {
        Modal::SaveResult {
            message: message.to_string(),
            kind: Notice::Error,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum ReportState {
    Ready(Summary),
    Failed(String),
}

/// Focused cell in the editor grid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EditorCursor {
    row: usize,
    field: DraftField,
    editing: bool,
}

impl Default for EditorCursor {
    fn default() -> Self {
        Self {
            row: 0,
            field: DraftField::Name,
            editing: false,
        }
    }
}

/// App state for TUI
pub struct App {
    store: WorkoutStore,
    identity: Identity,
    tab: Tab,
    modal: Option<Modal>,
    viewer: Option<WorkoutViewer>,
    editor: WorkoutEditor,
    cursor: EditorCursor,
    report: Option<ReportState>,
    achievement_selected: usize,
    should_quit: bool,
}

impl App {
    pub fn new(store: WorkoutStore, identity: Identity) -> Self {
        let mut app = Self {
            store,
            identity,
            tab: Tab::View,
            modal: None,
            viewer: None,
            editor: WorkoutEditor::new(),
            cursor: EditorCursor::default(),
            report: None,
            achievement_selected: 0,
            should_quit: false,
        };
        app.mount(Tab::View);
        app
    }

    /// Run the TUI application
    pub fn run(&mut self) -> Result<()> {
        let mut terminal = init_terminal()?;

        let result = self.event_loop(&mut terminal);

        restore_terminal()?;
        result
    }

    fn event_loop(&mut self, terminal: &mut Tui) -> Result<()> {
        while !self.should_quit {
            self.tick();
            terminal.draw(|frame| self.render(frame))?;
            self.handle_events()?;
        }
        Ok(())
    }

    /// Drain live updates into the mounted schedule
    pub fn tick(&mut self) {
        if let Some(viewer) = &mut self.viewer {
            viewer.poll(&self.store);
        }
    }

    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn modal(&self) -> Option<&Modal> {
        self.modal.as_ref()
    }

    pub fn editor(&self) -> &WorkoutEditor {
        &self.editor
    }

    pub fn viewer(&self) -> Option<&WorkoutViewer> {
        self.viewer.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn switch_tab(&mut self, tab: Tab) {
        if tab == self.tab {
            return;
        }
        self.unmount();
        self.tab = tab;
        self.mount(tab);
    }

    fn mount(&mut self, tab: Tab) {
        match tab {
            Tab::View => self.viewer = Some(WorkoutViewer::mount(&self.store)),
            Tab::Register => {}
            Tab::Report => self.load_report(),
        }
    }

    fn unmount(&mut self) {
        self.viewer = None;
        self.report = None;
        self.editor = WorkoutEditor::new();
        self.cursor = EditorCursor::default();
    }

    fn load_report(&mut self) {
        self.achievement_selected = 0;
        self.report = Some(match Summary::load(&self.store) {
            Ok(summary) => ReportState::Ready(summary),
            Err(e) => {
                error!("Failed to load summary: {}", e);
                ReportState::Failed(SUMMARY_FAILURE.to_string())
            }
        });
    }

    fn handle_events(&mut self) -> Result<()> {
        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key);
                }
            }
        }
        Ok(())
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.modal.is_some() {
            self.handle_modal_key(key.code);
            return;
        }
        if self.tab == Tab::Register && self.cursor.editing {
            self.handle_edit_key(key.code);
            return;
        }

        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Char('1') => self.switch_tab(Tab::View),
            KeyCode::Char('2') => self.switch_tab(Tab::Register),
            KeyCode::Char('3') => self.switch_tab(Tab::Report),
            KeyCode::Tab => self.switch_tab(self.tab.next()),
            KeyCode::BackTab => self.switch_tab(self.tab.prev()),
            code => match self.tab {
                Tab::View => self.handle_view_key(code),
                Tab::Register => self.handle_register_key(code),
                Tab::Report => self.handle_report_key(code),
            },
        }
    }

    fn handle_modal_key(&mut self, code: KeyCode) {
        let Some(modal) = self.modal.take() else {
            return;
        };

        self.modal = match (modal, code) {
            (Modal::ConfirmSave(record), KeyCode::Enter | KeyCode::Char('s') | KeyCode::Char('y')) => {
                let outcome = save_confirmed(&self.store, &record);
                let kind = if outcome.is_success() {
                    Notice::Success
                } else {
                    Notice::Error
                };
                Some(Modal::SaveResult {
                    message: outcome.message().to_string(),
                    kind,
                })
            }
            // Cancelling discards the pending record, drafts stay in the editor
            (Modal::ConfirmSave(_), KeyCode::Esc | KeyCode::Char('n') | KeyCode::Char('q')) => None,
            (Modal::ConfirmSave(record), _) => Some(Modal::ConfirmSave(record)),
            (_, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) => None,
            (modal, _) => Some(modal),
        };
    }

    fn handle_view_key(&mut self, code: KeyCode) {
        let Some(viewer) = &mut self.viewer else {
            return;
        };

        match code {
            KeyCode::Down | KeyCode::Char('j') => viewer.select_next(),
            KeyCode::Up | KeyCode::Char('k') => viewer.select_prev(),
            KeyCode::Enter => {
                if let Some(record) = viewer.selected() {
                    self.modal = Some(Modal::WorkoutDetail(record.clone()));
                }
            }
            KeyCode::Char(' ') | KeyCode::Char('c') => {
                let Some(day) = viewer.selected().map(|r| r.day) else {
                    return;
                };
                if viewer.toggle_completion(&self.store, day).is_err() {
                    self.modal = Some(Modal::error(TOGGLE_FAILURE));
                }
                self.tick();
            }
            _ => {}
        }
    }

    fn choose_day(&mut self, day: Weekday) {
        self.cursor = EditorCursor::default();
        if self.editor.select_day(&self.store, day).is_err() {
            self.modal = Some(Modal::error(LOAD_FAILURE));
        }
    }

    fn handle_register_key(&mut self, code: KeyCode) {
        let rows = self.editor.drafts().len();

        match code {
            KeyCode::Char(']') => {
                let day = self.editor.day().map_or(Weekday::Monday, |d| d.next());
                self.choose_day(day);
            }
            KeyCode::Char('[') => {
                let day = self.editor.day().map_or(Weekday::Sunday, |d| d.prev());
                self.choose_day(day);
            }
            KeyCode::Down if rows > 0 => self.cursor.row = (self.cursor.row + 1) % rows,
            KeyCode::Up if rows > 0 => self.cursor.row = (self.cursor.row + rows - 1) % rows,
            KeyCode::Right => self.cursor.field = self.cursor.field.next(),
            KeyCode::Left => self.cursor.field = self.cursor.field.prev(),
            KeyCode::Enter if rows > 0 => self.cursor.editing = true,
            KeyCode::Char('a') if self.editor.day().is_some() => {
                self.editor.add_exercise();
                self.cursor = EditorCursor {
                    row: self.editor.drafts().len() - 1,
                    field: DraftField::Name,
                    editing: true,
                };
            }
            KeyCode::Char('x') | KeyCode::Delete if rows > 0 => {
                self.editor.remove_exercise(self.cursor.row);
                self.cursor.row = self.cursor.row.min(rows.saturating_sub(2));
            }
            KeyCode::Char('s') => {
                self.modal = Some(match self.editor.prepare(Utc::now()) {
                    Ok(record) => Modal::ConfirmSave(record),
                    Err(e) => Modal::error(&e.to_string()),
                });
            }
            _ => {}
        }
    }

    fn handle_edit_key(&mut self, code: KeyCode) {
        let EditorCursor { row, field, .. } = self.cursor;
        let Some(draft) = self.editor.draft_mut(row) else {
            self.cursor.editing = false;
            return;
        };

        match code {
            KeyCode::Char(c) => draft.field_mut(field).push(c),
            KeyCode::Backspace => {
                draft.field_mut(field).pop();
            }
            KeyCode::Tab => self.cursor.field = field.next(),
            KeyCode::BackTab => self.cursor.field = field.prev(),
            KeyCode::Enter | KeyCode::Esc => self.cursor.editing = false,
            _ => {}
        }
    }

    fn handle_report_key(&mut self, code: KeyCode) {
        let Some(ReportState::Ready(summary)) = &self.report else {
            if code == KeyCode::Char('r') {
                self.load_report();
            }
            return;
        };

        let achievements = summary.achievements();
        let count = achievements.len();
        match code {
            KeyCode::Down | KeyCode::Char('j') => {
                self.achievement_selected = (self.achievement_selected + 1) % count;
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.achievement_selected = (self.achievement_selected + count - 1) % count;
            }
            KeyCode::Enter => {
                if let Some(&(achievement, unlocked)) = achievements.get(self.achievement_selected) {
                    self.modal = Some(Modal::AchievementDetail {
                        achievement,
                        unlocked,
                    });
                }
            }
            KeyCode::Char('r') => self.load_report(),
            _ => {}
        }
    }

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(3),
            ])
            .split(area);

        // Header
        let tabs = Tabs::new(Tab::all().iter().map(|t| t.title()))
            .select(self.tab.index())
            .style(Style::default().fg(Color::Gray))
            .highlight_style(Style::default().fg(Color::Cyan).bold())
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Diário de Treino do Cavaleiro "),
            );
        frame.render_widget(tabs, chunks[0]);

        match self.tab {
            Tab::View => self.render_view(frame, chunks[1]),
            Tab::Register => self.render_register(frame, chunks[1]),
            Tab::Report => self.render_report(frame, chunks[1]),
        }

        // Footer
        let hints = match self.tab {
            Tab::View => "↑↓: escolher | Enter: detalhes | espaço: concluir",
            Tab::Register if self.cursor.editing => "digite | Tab: próximo campo | Enter: ok",
            Tab::Register => "[ ]: dia | a: adicionar | x: remover | ←→↑↓ Enter: editar | s: salvar",
            Tab::Report => "↑↓: conquista | Enter: detalhes | r: atualizar",
        };
        let footer = Paragraph::new(format!(
            "{} | 1-3/Tab: abas | q: sair    ID do Usuário: {}",
            hints, self.identity.user_id
        ))
        .style(Style::default().fg(Color::DarkGray))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, chunks[2]);

        if let Some(modal) = &self.modal {
            render_modal(frame, area, modal);
        }
    }

    fn render_view(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Jornada de Treino ");

        let Some(viewer) = &self.viewer else {
            return;
        };

        let records = match viewer.state() {
            ViewState::Loading => {
                let text = Paragraph::new("Carregando seus treinos...").block(block);
                frame.render_widget(text, area);
                return;
            }
            ViewState::Failed(message) => {
                let text = Paragraph::new(message.as_str())
                    .style(Style::default().fg(Color::Red))
                    .block(block);
                frame.render_widget(text, area);
                return;
            }
            ViewState::Ready(records) if records.is_empty() => {
                let text = Paragraph::new(EMPTY_MESSAGE)
                    .wrap(Wrap { trim: true })
                    .block(block);
                frame.render_widget(text, area);
                return;
            }
            ViewState::Ready(records) => records,
        };

        let rows: Vec<Row> = records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                let today = viewer.is_today(r);
                let day = if today {
                    format!("{} (Hoje)", r.day)
                } else {
                    r.day.to_string()
                };
                let exercises = if r.exercises.is_empty() {
                    "Nenhum exercício registrado para este dia.".to_string()
                } else {
                    format!("{} exercícios registrados.", r.exercises.len())
                };
                let status = if r.completed {
                    "Treino Concluído!"
                } else {
                    "Marcar como Concluído"
                };

                let mut style = if today {
                    Style::default().fg(Color::Cyan).bold()
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                if i == viewer.selected_index() {
                    style = style.add_modifier(Modifier::REVERSED);
                }

                Row::new(vec![
                    Cell::from(day),
                    Cell::from(exercises),
                    Cell::from(status).style(if r.completed {
                        Style::default().fg(Color::Green)
                    } else {
                        Style::default()
                    }),
                ])
                .style(style)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Length(22),
                Constraint::Min(30),
                Constraint::Length(24),
            ],
        )
        .header(Row::new(vec!["Dia", "Exercícios", "Status"]).style(Style::default().bold()))
        .block(block);

        frame.render_widget(table, area);
    }

    fn render_register(&self, frame: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(5)])
            .split(area);

        let day_text = match self.editor.day() {
            Some(day) => format!("◀ {} ▶", day),
            None => "Escolha um dia... (use [ e ])".to_string(),
        };
        let selector = Paragraph::new(day_text)
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().borders(Borders::ALL).title(" Dia da Semana "));
        frame.render_widget(selector, chunks[0]);

        if self.editor.day().is_none() {
            return;
        }

        let rows: Vec<Row> = self
            .editor
            .drafts()
            .iter()
            .enumerate()
            .map(|(i, draft)| {
                let cells: Vec<Cell> = DraftField::all()
                    .iter()
                    .map(|field| {
                        let focused = i == self.cursor.row && *field == self.cursor.field;
                        let mut text = draft.field(*field).to_string();
                        if focused && self.cursor.editing {
                            text.push('_');
                        }
                        let style = if focused {
                            Style::default().add_modifier(Modifier::REVERSED)
                        } else {
                            Style::default()
                        };
                        Cell::from(text).style(style)
                    })
                    .collect();
                Row::new(cells)
            })
            .collect();

        let table = Table::new(
            rows,
            [
                Constraint::Min(24),
                Constraint::Length(10),
                Constraint::Length(12),
                Constraint::Length(12),
            ],
        )
        .header(
            Row::new(DraftField::all().iter().map(|f| f.label())).style(Style::default().bold()),
        )
        .block(Block::default().borders(Borders::ALL).title(" Exercícios "));

        frame.render_widget(table, chunks[1]);
    }

    fn render_report(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Resumo do Cavaleiro ");

        let summary = match &self.report {
            None => {
                frame.render_widget(Paragraph::new("Analisando os registros do Cavaleiro...").block(block), area);
                return;
            }
            Some(ReportState::Failed(message)) => {
                let text = Paragraph::new(message.as_str())
                    .style(Style::default().fg(Color::Red))
                    .block(block);
                frame.render_widget(text, area);
                return;
            }
            Some(ReportState::Ready(summary)) => summary,
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(6), Constraint::Min(5)])
            .split(area);
        let stats = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(chunks[0]);

        // Sunday-first weekly strip
        let mut strip: Vec<Span> = vec![Span::raw("Semana: ")];
        for day in std::iter::once(Weekday::Sunday).chain(Weekday::all()[..6].iter().copied()) {
            let label: String = day.name().chars().take(3).collect();
            let span = if summary.trained_on(day) {
                Span::styled(format!("{} ●  ", label), Style::default().fg(Color::Red).bold())
            } else {
                Span::styled(format!("{} ○  ", label), Style::default().fg(Color::DarkGray))
            };
            strip.push(span);
        }

        let frequency = Paragraph::new(vec![
            Line::from(format!("Dias treinados (total): {}", summary.trained_days_count)),
            Line::from(format!("Último dia treinado: {}", summary.last_trained_label())),
            Line::from(strip),
        ])
        .block(Block::default().borders(Borders::ALL).title(" Frequência de Treinos "));
        frame.render_widget(frequency, stats[0]);

        let volume = Paragraph::new(vec![
            Line::from(format!(
                "Volume Total Levantado (kg): {}",
                summary.total_volume_label()
            )),
            Line::from(format!(
                "Duração Média por Treino (min): {}",
                summary.average_duration_minutes()
            )),
        ])
        .block(Block::default().borders(Borders::ALL).title(" Progresso e Volume "));
        frame.render_widget(volume, stats[1]);

        let items: Vec<ListItem> = summary
            .achievements()
            .into_iter()
            .enumerate()
            .map(|(i, (achievement, unlocked))| {
                let mut style = if unlocked {
                    Style::default().fg(Color::Green)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                if i == self.achievement_selected {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                let mark = if unlocked { "★" } else { "☆" };
                ListItem::new(format!("{} {}", mark, achievement.name)).style(style)
            })
            .collect();

        let list = List::new(items).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Conquistas do Cavaleiro "),
        );
        frame.render_widget(list, chunks[1]);
    }
}

fn render_modal(frame: &mut Frame, area: Rect, modal: &Modal) {
    let popup = centered_rect(60, 50, area);

    let (title, lines, color) = match modal {
        Modal::ConfirmSave(record) => (
            "Confirmar Salvamento?".to_string(),
            vec![
                format!(
                    "Tem certeza que deseja salvar este treino para {}? Ele substituirá qualquer treino existente para este dia.",
                    record.day
                ),
                String::new(),
                "[s] Sim, Salvar    [n] Cancelar".to_string(),
            ],
            Color::Cyan,
        ),
        Modal::SaveResult { message, kind } => {
            let (title, color) = match kind {
                Notice::Success => ("Sucesso!", Color::Green),
                Notice::Error => ("Erro!", Color::Red),
            };
            (
                title.to_string(),
                vec![message.clone(), String::new(), "[Enter] Fechar".to_string()],
                color,
            )
        }
        Modal::WorkoutDetail(record) => {
            let mut lines = record.detail_lines();
            lines.push(String::new());
            lines.push("[Esc] Fechar".to_string());
            (record.day.to_string(), lines, Color::Cyan)
        }
        Modal::AchievementDetail {
            achievement,
            unlocked,
        } => (
            achievement.name.to_string(),
            vec![
                achievement.description.to_string(),
                String::new(),
                if *unlocked {
                    "Conquista desbloqueada!".to_string()
                } else {
                    "Ainda não desbloqueada.".to_string()
                },
                String::new(),
                "[Esc] Fechar".to_string(),
            ],
            Color::Yellow,
        ),
    };

    let text: Vec<Line> = lines.into_iter().map(Line::from).collect();
    let dialog = Paragraph::new(text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color))
                .title(format!(" {} ", title)),
        );

    frame.render_widget(Clear, popup);
    frame.render_widget(dialog, popup);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}

fn init_terminal() -> Result<Tui> {
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    Ok(terminal)
}

fn restore_terminal() -> Result<()> {
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;
    Ok(())
}
