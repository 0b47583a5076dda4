use std::cell::Cell;
use std::collections::HashMap;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::animator::{AnimationConfig, Animator};
use crate::fetcher::CommentSource;
use crate::params::{self, ViewParams};
use crate::poller::{PollOptions, PollUpdate, Poller};
use crate::ranking::{CommentId, RankedComment, Ranking};
use crate::target::Resolver;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COLOR_AMBER: Color = Color::Rgb(249, 226, 175);
const COLOR_GOLD: Color = Color::Rgb(250, 204, 21);
const COLOR_SILVER: Color = Color::Rgb(203, 213, 225);
const COLOR_BRONZE: Color = Color::Rgb(180, 83, 9);

const SPINNER_FRAMES: [&str; 10] = [
    "⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏",
];
const IDLE_TICK: Duration = Duration::from_millis(120);
const FRAME_TICK: Duration = Duration::from_millis(16);
const URL_PLACEHOLDER: &str = "https://www.sooplive.co.kr/station/*****/post/*****";

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= IDLE_TICK {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Input,
    Ranking,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputField {
    Url,
    Cutoff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Row {
    Comment(usize),
    Separator,
}

/// Lays out ranked comments one per line, with a separator after the cutoff rank.
fn build_rows(ranking: &Ranking, cutoff: Option<u32>) -> Vec<Row> {
    let cutoff_rank = cutoff.and_then(|c| ranking.cutoff_rank(c));
    let mut rows = Vec::with_capacity(ranking.len() + 1);
    let mut separated = false;
    for (index, (rank, _)) in ranking.iter().enumerate() {
        if let Some(limit) = cutoff_rank {
            if !separated && rank > limit {
                rows.push(Row::Separator);
                separated = true;
            }
        }
        rows.push(Row::Comment(index));
    }
    rows
}

fn row_positions(ranking: &Ranking, rows: &[Row]) -> HashMap<CommentId, f64> {
    rows.iter()
        .enumerate()
        .filter_map(|(line, row)| match row {
            Row::Comment(index) => ranking
                .comments
                .get(*index)
                .map(|comment| (comment.comment_id, line as f64)),
            Row::Separator => None,
        })
        .collect()
}

/// `19301` → `19,301`.
fn format_count(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if value < 0 {
        out.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

fn rank_badge_style(position: usize) -> Style {
    match position {
        0 => Style::default().fg(COLOR_BG).bg(COLOR_GOLD),
        1 => Style::default().fg(COLOR_BG).bg(COLOR_SILVER),
        2 => Style::default().fg(COLOR_AMBER).bg(COLOR_BRONZE),
        _ => Style::default().fg(COLOR_TEXT_PRIMARY).bg(COLOR_BORDER_IDLE),
    }
    .add_modifier(Modifier::BOLD)
}

pub struct Options {
    pub source: Arc<dyn CommentSource>,
    pub poll: PollOptions,
    pub animation: AnimationConfig,
    pub resolver: Resolver,
    pub params: ViewParams,
}

pub struct Model {
    screen: Screen,
    focus: InputField,
    url_input: String,
    cutoff_input: String,
    params: ViewParams,
    resolver: Resolver,
    poll_interval: Duration,
    poller: Poller,
    updates: Receiver<PollUpdate>,
    update: PollUpdate,
    rows: Vec<Row>,
    positions: HashMap<CommentId, f64>,
    animator: Animator,
    scroll: f64,
    selected: usize,
    list_height: Cell<u16>,
    spinner: Spinner,
    status_message: String,
    needs_redraw: bool,
}

impl Model {
    pub fn new(opts: Options) -> Self {
        let (tx, updates) = unbounded();
        let poller = Poller::spawn(opts.source, opts.poll, move |update| {
            let _ = tx.send(update);
        });
        let mut animator = Animator::new(opts.animation);
        animator.set_highlight(opts.params.highlight);

        let mut model = Self {
            screen: Screen::Input,
            focus: InputField::Url,
            url_input: String::new(),
            cutoff_input: opts
                .params
                .cutoff
                .map(|c| c.to_string())
                .unwrap_or_default(),
            params: opts.params.clone(),
            resolver: opts.resolver,
            poll_interval: opts.poll.interval,
            poller,
            updates,
            update: PollUpdate::default(),
            rows: Vec::new(),
            positions: HashMap::new(),
            animator,
            scroll: 0.0,
            selected: 0,
            list_height: Cell::new(0),
            spinner: Spinner::new(),
            status_message: String::new(),
            needs_redraw: true,
        };

        if let Some(target) = opts.params.target {
            model.url_input = target.post_url();
            model.start(target);
        }
        model
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn start(&mut self, target: crate::target::Target) {
        self.animator.reset();
        self.rows.clear();
        self.positions.clear();
        self.scroll = 0.0;
        self.selected = 0;
        self.params.target = Some(target.clone());
        if let Err(err) = self.poller.set_target(Some(target)) {
            self.status_message = format!("Error: {err}");
        }
        self.screen = Screen::Ranking;
        self.mark_dirty();
    }

    fn open_settings(&mut self) {
        if let Some(target) = &self.params.target {
            self.url_input = target.post_url();
        }
        self.params.target = None;
        if let Err(err) = self.poller.set_target(None) {
            self.status_message = format!("Error: {err}");
        }
        self.animator.reset();
        self.screen = Screen::Input;
        self.focus = InputField::Url;
        self.mark_dirty();
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        self.poller.stop();

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();

        loop {
            if self.poll_updates() {
                self.mark_dirty();
            }
            if self.advance_animations(Instant::now()) {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let tick_rate = if self.animator.is_animating(Instant::now()) {
                FRAME_TICK
            } else {
                IDLE_TICK
            };
            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or(Duration::ZERO);

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        if self.handle_key(key.code) {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {
                        self.animator.rebaseline();
                        self.mark_dirty();
                    }
                    _ => {}
                }
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.update.is_fetching() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn poll_updates(&mut self) -> bool {
        let mut changed = false;
        while let Ok(update) = self.updates.try_recv() {
            self.apply_update(update, Instant::now());
            changed = true;
        }
        changed
    }

    fn apply_update(&mut self, update: PollUpdate, now: Instant) {
        if update.target != self.params.target {
            return;
        }
        let fresh = match (&self.update.ranking, &update.ranking) {
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            (None, Some(_)) => true,
            _ => false,
        };
        if let Some(err) = &update.error {
            self.status_message = format!("Refresh failed: {err}");
        } else if fresh {
            self.status_message.clear();
        }
        self.update = update;
        if fresh {
            self.relayout(now);
        }
    }

    fn relayout(&mut self, now: Instant) {
        let Some(ranking) = self.update.ranking.clone() else {
            return;
        };
        self.rows = build_rows(&ranking, self.params.cutoff);
        self.positions = row_positions(&ranking, &self.rows);
        self.animator.apply(&ranking, &self.positions, now);
        self.selected = self.selected.min(ranking.len().saturating_sub(1));
        self.clamp_scroll();
    }

    fn advance_animations(&mut self, now: Instant) -> bool {
        let mut changed = self.animator.is_animating(now);
        let viewport = f64::from(self.list_height.get());
        if viewport > 0.0 {
            let next = self
                .animator
                .follow_scroll(now, self.scroll, &self.positions, 1.0, viewport);
            if (next - self.scroll).abs() > f64::EPSILON {
                self.scroll = next;
                self.clamp_scroll();
                changed = true;
            }
        }
        self.animator.prune(now);
        changed
    }

    fn max_scroll(&self) -> f64 {
        let height = usize::from(self.list_height.get());
        self.rows.len().saturating_sub(height) as f64
    }

    fn clamp_scroll(&mut self) {
        self.scroll = self.scroll.clamp(0.0, self.max_scroll());
    }

    fn selected_row(&self) -> Option<usize> {
        self.rows
            .iter()
            .position(|row| *row == Row::Comment(self.selected))
    }

    fn ensure_selected_visible(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let height = f64::from(self.list_height.get().max(1));
        let row = row as f64;
        if row < self.scroll {
            self.scroll = row;
        } else if row >= self.scroll + height {
            self.scroll = row - height + 1.0;
        }
        self.clamp_scroll();
        self.animator.rebaseline();
    }

    /// Returns `true` when the app should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        self.mark_dirty();
        match self.screen {
            Screen::Input => self.handle_input_key(code),
            Screen::Ranking => self.handle_ranking_key(code),
        }
    }

    fn handle_input_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    InputField::Url => InputField::Cutoff,
                    InputField::Cutoff => InputField::Url,
                };
            }
            KeyCode::Backspace => {
                self.focused_input().pop();
            }
            KeyCode::Char(ch) => {
                if self.focus == InputField::Cutoff && !ch.is_ascii_digit() {
                    return false;
                }
                self.focused_input().push(ch);
            }
            KeyCode::Enter => self.submit(),
            _ => {}
        }
        false
    }

    fn focused_input(&mut self) -> &mut String {
        match self.focus {
            InputField::Url => &mut self.url_input,
            InputField::Cutoff => &mut self.cutoff_input,
        }
    }

    fn cutoff_state(&self) -> Result<Option<u32>, params::InputError> {
        if self.cutoff_input.trim().is_empty() {
            return Ok(None);
        }
        params::parse_cutoff(&self.cutoff_input).map(Some)
    }

    fn submit(&mut self) {
        let Some(target) = self.resolver.resolve(&self.url_input) else {
            return;
        };
        let Ok(cutoff) = self.cutoff_state() else {
            return;
        };
        self.params.cutoff = cutoff;
        self.url_input = target.post_url();
        self.start(target);
    }

    fn handle_ranking_key(&mut self, code: KeyCode) -> bool {
        let len = self
            .update
            .ranking
            .as_ref()
            .map(|ranking| ranking.len())
            .unwrap_or(0);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('s') => self.open_settings(),
            KeyCode::Char('o') => {
                if let Some(target) = &self.params.target {
                    let url = target.post_url();
                    self.status_message = match webbrowser::open(&url) {
                        Ok(_) => format!("Opened {url}"),
                        Err(err) => format!("Could not open browser: {err}"),
                    };
                }
            }
            KeyCode::Char('j') | KeyCode::Down => {
                if self.selected + 1 < len {
                    self.selected += 1;
                }
                self.ensure_selected_visible();
            }
            KeyCode::Char('k') | KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
                self.ensure_selected_visible();
            }
            KeyCode::Char('g') | KeyCode::Home => {
                self.selected = 0;
                self.ensure_selected_visible();
            }
            KeyCode::Char('G') | KeyCode::End => {
                self.selected = len.saturating_sub(1);
                self.ensure_selected_visible();
            }
            KeyCode::Char('h') => self.toggle_highlight(),
            _ => {}
        }
        false
    }

    fn toggle_highlight(&mut self) {
        let Some(ranking) = self.update.ranking.clone() else {
            return;
        };
        let Some(comment) = ranking.comments.get(self.selected) else {
            return;
        };
        let id = comment.comment_id;
        if self.params.highlight == Some(id) {
            self.params.highlight = None;
            self.status_message = "Highlight cleared.".to_string();
        } else {
            self.params.highlight = Some(id);
            self.status_message = format!("Following {}.", comment.display_name);
        }
        self.animator.set_highlight(self.params.highlight);
    }

    fn draw(&self, frame: &mut Frame) {
        let area = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), area);
        match self.screen {
            Screen::Input => self.draw_input(frame, area),
            Screen::Ranking => self.draw_ranking(frame, area),
        }
    }

    fn field_block(&self, title: &'static str, field: InputField) -> Block<'static> {
        let border = if self.focus == field {
            COLOR_BORDER_FOCUSED
        } else {
            COLOR_BORDER_IDLE
        };
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .border_style(Style::default().fg(border))
            .style(Style::default().bg(COLOR_PANEL_BG).fg(COLOR_TEXT_PRIMARY))
    }

    fn draw_input(&self, frame: &mut Frame, area: Rect) {
        let width = area.width.min(90);
        let panel = Rect {
            x: area.x + (area.width - width) / 2,
            y: area.y + area.height.saturating_sub(12) / 2,
            width,
            height: area.height.min(12),
        };
        frame.render_widget(Clear, panel);
        let outer = Block::default()
            .borders(Borders::ALL)
            .title(" SOOP comment like ranking ")
            .border_style(Style::default().fg(COLOR_ACCENT))
            .padding(Padding::horizontal(1))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = outer.inner(panel);
        frame.render_widget(outer, panel);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(inner);

        let url_line = if self.url_input.is_empty() {
            Line::from(Span::styled(
                URL_PLACEHOLDER,
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ))
        } else {
            Line::from(self.url_input.as_str())
        };
        frame.render_widget(
            Paragraph::new(url_line).block(self.field_block(" Post URL ", InputField::Url)),
            chunks[0],
        );
        frame.render_widget(
            Paragraph::new(self.cutoff_input.as_str())
                .block(self.field_block(" Cutoff (optional) ", InputField::Cutoff)),
            chunks[1],
        );

        let url_valid = self.resolver.resolve(&self.url_input).is_some();
        let validation = if !self.url_input.trim().is_empty() && !url_valid {
            Span::styled(
                "URL format is not valid.",
                Style::default().fg(COLOR_ERROR),
            )
        } else if let Err(err) = self.cutoff_state() {
            Span::styled(err.to_string(), Style::default().fg(COLOR_ERROR))
        } else if url_valid {
            Span::styled("Press Enter to load.", Style::default().fg(COLOR_SUCCESS))
        } else {
            Span::raw("")
        };
        frame.render_widget(Paragraph::new(Line::from(validation)), chunks[2]);

        frame.render_widget(
            Paragraph::new("Tab switch field · Enter load · Esc quit")
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .alignment(Alignment::Right),
            chunks[3],
        );
    }

    fn header_lines(&self) -> Vec<Line<'static>> {
        let secondary = Style::default().fg(COLOR_TEXT_SECONDARY);
        let refresh = if self.update.is_fetching() {
            self.spinner.frame()
        } else {
            "↻"
        };
        let mut first = vec![
            Span::styled(
                format!("{refresh} auto-refresh every {}s", self.poll_interval.as_secs()),
                secondary,
            ),
            Span::raw("  "),
        ];
        if let Some(target) = &self.params.target {
            first.push(Span::styled(
                format!("{} (o to open)", target.post_url()),
                Style::default().fg(COLOR_ACCENT),
            ));
        }
        if let Some(at) = self.update.last_success {
            first.push(Span::styled(
                format!("  updated {}", at.format("%H:%M:%S")),
                secondary,
            ));
        }

        let mut lines = vec![Line::from(first)];
        if let Some(ranking) = &self.update.ranking {
            let mut second = vec![
                Span::styled(
                    format!(" 🏆 {} comments ranked ", format_count(ranking.total_count as i64)),
                    Style::default().fg(COLOR_AMBER).add_modifier(Modifier::BOLD),
                ),
                Span::styled(
                    format!("  pages: {}", ranking.last_observed_page_count),
                    secondary,
                ),
            ];
            if let Some(cutoff) = self.params.cutoff {
                let rank = ranking
                    .cutoff_rank(cutoff)
                    .map(|r| format!("rank {r}"))
                    .unwrap_or_else(|| "no rank".to_string());
                second.push(Span::styled(
                    format!("  cutoff {cutoff} → {rank}"),
                    secondary,
                ));
            }
            lines.push(Line::from(second));
        }
        lines
    }

    fn draw_ranking(&self, frame: &mut Frame, area: Rect) {
        let banner_height = if self.update.error.is_some() { 3 } else { 0 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Length(banner_height),
                Constraint::Min(1),
                Constraint::Length(1),
            ])
            .split(area);

        frame.render_widget(
            Paragraph::new(self.header_lines()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_BORDER_IDLE))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            ),
            chunks[0],
        );

        if let Some(err) = &self.update.error {
            frame.render_widget(
                Paragraph::new(format!(
                    "Could not load comments. Check the URL or network. ({err})"
                ))
                .wrap(Wrap { trim: true })
                .style(Style::default().fg(COLOR_ERROR))
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .border_style(Style::default().fg(COLOR_ERROR)),
                ),
                chunks[1],
            );
        }

        let list_block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_BORDER_FOCUSED))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let list_area = list_block.inner(chunks[2]);
        frame.render_widget(list_block, chunks[2]);
        self.list_height.set(list_area.height);

        if self.update.is_loading() {
            frame.render_widget(
                Paragraph::new("Loading comments…")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
                centered_line(list_area),
            );
        } else if let Some(ranking) = &self.update.ranking {
            self.draw_rows(frame, list_area, ranking);
        }

        let footer = if self.status_message.is_empty() {
            "j/k move · h follow selected · o open post · s settings · q quit".to_string()
        } else {
            self.status_message.clone()
        };
        frame.render_widget(
            Paragraph::new(footer).style(Style::default().fg(COLOR_TEXT_SECONDARY)),
            chunks[3],
        );
    }

    fn draw_rows(&self, frame: &mut Frame, area: Rect, ranking: &Ranking) {
        if ranking.is_empty() {
            frame.render_widget(
                Paragraph::new("No comments yet.")
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(COLOR_TEXT_SECONDARY)),
                centered_line(area),
            );
            return;
        }

        let now = Instant::now();
        let scroll = self.scroll;
        let height = f64::from(area.height);
        let mut moving: Vec<(Rect, Line<'static>, Style)> = Vec::new();

        for (line, row) in self.rows.iter().enumerate() {
            let (offset, content, style) = match row {
                Row::Separator => (
                    0.0,
                    Line::from(Span::styled(
                        "─".repeat(usize::from(area.width)),
                        Style::default().fg(COLOR_ERROR),
                    )),
                    Style::default(),
                ),
                Row::Comment(index) => {
                    let Some(comment) = ranking.comments.get(*index) else {
                        continue;
                    };
                    let rank = ranking.ranks.get(*index).copied().unwrap_or(0);
                    let likes = self
                        .animator
                        .display_value(comment.comment_id, now)
                        .unwrap_or(comment.like_count as i64);
                    let offset = self.animator.offset(comment.comment_id, now);
                    let row_style = if *index == self.selected {
                        Style::default().bg(COLOR_PANEL_SELECTED_BG)
                    } else if self.params.highlight == Some(comment.comment_id) {
                        Style::default().bg(COLOR_BORDER_IDLE)
                    } else {
                        Style::default()
                    };
                    (
                        offset,
                        comment_line(*index, rank, comment, likes, area.width),
                        row_style,
                    )
                }
            };

            let y = (line as f64 + offset - scroll).round();
            if y < 0.0 || y >= height {
                continue;
            }
            let rect = Rect {
                x: area.x,
                y: area.y + y as u16,
                width: area.width,
                height: 1,
            };
            if offset.abs() >= 0.5 {
                moving.push((rect, content, style));
            } else {
                frame.render_widget(Paragraph::new(content).style(style), rect);
            }
        }

        // Rows in motion paint over the rows they pass.
        for (rect, content, style) in moving {
            frame.render_widget(Clear, rect);
            frame.render_widget(
                Paragraph::new(content).style(Style::default().bg(COLOR_PANEL_BG).patch(style)),
                rect,
            );
        }
    }
}

const BEST_TAG: &str = " BEST ";

/// One ranking row: rank badge, nickname, best-comment tag and like count.
fn comment_line(
    position: usize,
    rank: u32,
    comment: &RankedComment,
    likes: i64,
    width: u16,
) -> Line<'static> {
    let badge = format!(" #{rank:<3}");
    let likes_text = format!(" 👍 {} ", format_count(likes));
    let tag_width = if comment.best_top { BEST_TAG.width() + 1 } else { 0 };
    let fixed = badge.width() + likes_text.width() + tag_width + 2;
    let name_width = usize::from(width).saturating_sub(fixed);
    let name = truncate_to_width(&comment.display_name, name_width);
    let padding = name_width.saturating_sub(name.width());

    let mut spans = vec![
        Span::styled(badge, rank_badge_style(position)),
        Span::raw(" "),
        Span::styled(name, Style::default().fg(COLOR_TEXT_PRIMARY)),
    ];
    if comment.best_top {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            BEST_TAG,
            Style::default()
                .fg(COLOR_BG)
                .bg(COLOR_AMBER)
                .add_modifier(Modifier::BOLD),
        ));
    }
    spans.push(Span::raw(" ".repeat(padding + 1)));
    spans.push(Span::styled(
        likes_text,
        Style::default().fg(COLOR_ACCENT).add_modifier(Modifier::BOLD),
    ));
    Line::from(spans)
}

fn centered_line(area: Rect) -> Rect {
    Rect {
        x: area.x,
        y: area.y + area.height / 2,
        width: area.width,
        height: area.height.min(1),
    }
}
