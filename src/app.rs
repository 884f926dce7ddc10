use crate::input::{handle_key, Action};
use crate::models::snapshot::Snapshot;
use crate::ui::dashboard;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind, MouseEventKind};
use ratatui::widgets::TableState;
use std::sync::mpsc::{self, TryRecvError};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

const POLL_TIMEOUT: Duration = Duration::from_millis(150);

/// Dashboard state: the latest published snapshot plus scroll position.
/// Snapshots are only ever replaced, never edited.
pub struct App {
    rx:          mpsc::Receiver<Arc<Snapshot>>,
    snapshot:    Option<Arc<Snapshot>>,
    table_state: TableState,
    pub should_quit: bool,
}

impl App {
    pub fn new(rx: mpsc::Receiver<Arc<Snapshot>>) -> Self {
        Self {
            rx,
            snapshot:    None,
            table_state: TableState::default(),
            should_quit: false,
        }
    }

    // ── Main event loop ───────────────────────────────────────────────

    pub fn run<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut ratatui::Terminal<B>,
    ) -> Result<()> {
        loop {
            self.consume_snapshots();

            let snapshot = self.snapshot.clone();
            terminal.draw(|f| dashboard::render(f, snapshot.as_deref(), &mut self.table_state))?;

            if event::poll(POLL_TIMEOUT)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        self.handle_action(handle_key(key));
                    }
                    Event::Mouse(me) => match me.kind {
                        MouseEventKind::ScrollDown => self.handle_action(Action::SelectDown),
                        MouseEventKind::ScrollUp   => self.handle_action(Action::SelectUp),
                        _ => {}
                    },
                    _ => {}
                }
            }

            if self.should_quit { break; }
        }
        Ok(())
    }

    /// Keep only the newest snapshot waiting in the channel.
    fn consume_snapshots(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(s) => {
                    self.snapshot = Some(s);
                    self.clamp_selection();
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if !self.should_quit {
                        warn!("refresh loop ended, leaving dashboard");
                    }
                    self.should_quit = true;
                    break;
                }
            }
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit       => self.should_quit = true,
            Action::SelectUp   => self.select_delta(-1),
            Action::SelectDown => self.select_delta(1),
            Action::JumpTop    => self.table_state.select(Some(0)),
            Action::JumpBottom => {
                let n = self.lines();
                self.table_state.select(n.checked_sub(1));
            }
            Action::None       => {}
        }
    }

    fn lines(&self) -> usize {
        self.snapshot.as_deref().map(dashboard::line_count).unwrap_or(0)
    }

    fn select_delta(&mut self, delta: i32) {
        let n = self.lines();
        if n == 0 { return; }
        let cur = self.table_state.selected().unwrap_or(0) as i32;
        let next = (cur + delta).clamp(0, n as i32 - 1);
        self.table_state.select(Some(next as usize));
    }

    fn clamp_selection(&mut self) {
        let n = self.lines();
        if let Some(sel) = self.table_state.selected() {
            self.table_state.select(if n == 0 { None } else { Some(sel.min(n - 1)) });
        }
    }
}
