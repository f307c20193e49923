// SPDX-License-Identifier: GPL-3.0-only

//! Terminal runtime for the camera screen
//!
//! Owns the terminal and the UI loop: drains camera channels and the message
//! queue, fires delayed messages, draws, and turns keyboard and mouse input
//! into messages. Blocking work from [`Task::perform`] runs on a tokio
//! blocking pool and comes back through the message queue.

use crate::app::{AppModel, Message, MessageReceiver, MessageSender, Task, message_channel, view};
use crate::app::gallery::GalleryDirection;
use crate::backends::camera::CameraBackendManager;
use crate::config::Config;
use crate::constants::{PINCH_SCALE_STEP, UI_POLL_INTERVAL};
use crate::pipelines::photo::CaptureExecutor;
use crate::storage;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::collections::VecDeque;
use std::io::{self, stdout};
use std::time::Instant;
use tracing::{debug, error, info};

/// Run the camera screen until the user quits
pub fn run(config: Config, backend: CameraBackendManager) -> Result<(), Box<dyn std::error::Error>> {
    let output_directory = storage::get_output_directory(&config.app_name);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;
    let executor = CaptureExecutor::new()?;
    let (messages, receiver) = message_channel();
    let mut model = AppModel::new(config, backend, output_directory, executor, messages.clone());

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let mut ui = UiLoop {
        runtime,
        messages,
        receiver,
        delayed: Vec::new(),
        exit: false,
    };
    let result = ui.run(&mut terminal, &mut model);
    if let Err(e) = &result {
        error!(error = %e, "UI loop failed");
    }

    model.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

struct UiLoop {
    runtime: tokio::runtime::Runtime,
    messages: MessageSender,
    receiver: MessageReceiver,
    /// Messages waiting for their deadline
    delayed: Vec<(Instant, Message)>,
    exit: bool,
}

impl UiLoop {
    fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        model: &mut AppModel,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let size = terminal.size()?;
        let task = model.init(size.width, size.height);
        self.run_task(model, task);

        while !self.exit {
            for message in model.poll_camera() {
                self.dispatch(model, message);
            }
            while let Ok(message) = self.receiver.try_recv() {
                self.dispatch(model, message);
            }
            for message in self.take_due(Instant::now()) {
                self.dispatch(model, message);
            }
            if self.exit {
                break;
            }

            terminal.draw(|f| view::view(model, f))?;

            // Handle input with timeout for frame updates
            if event::poll(UI_POLL_INTERVAL)? {
                let message = match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        key_message(key, model.gallery.is_some())
                    }
                    Event::Mouse(mouse) => mouse_message(mouse),
                    Event::Resize(columns, rows) => Some(Message::Resize { columns, rows }),
                    _ => None,
                };
                if let Some(message) = message {
                    self.dispatch(model, message);
                }
            }
        }
        info!("UI loop finished");
        Ok(())
    }

    /// Update the model with a message and everything it immediately leads to
    fn dispatch(&mut self, model: &mut AppModel, message: Message) {
        let mut queue = VecDeque::from([message]);
        while let Some(message) = queue.pop_front() {
            let task = model.update(message);
            for task in task.into_vec() {
                match task {
                    Task::Done(message) => queue.push_back(message),
                    other => self.run_task(model, other),
                }
            }
        }
    }

    fn run_task(&mut self, model: &mut AppModel, task: Task) {
        for task in task.into_vec() {
            match task {
                Task::None | Task::Batch(_) => {}
                Task::Done(message) => self.dispatch(model, message),
                Task::Delay(duration, message) => {
                    self.delayed.push((Instant::now() + duration, message));
                }
                Task::Perform(work) => {
                    let messages = self.messages.clone();
                    self.runtime.spawn_blocking(move || {
                        let message = work();
                        if messages.unbounded_send(message).is_err() {
                            debug!("UI queue closed before background task finished");
                        }
                    });
                }
                Task::Exit => self.exit = true,
            }
        }
    }

    /// Remove and return delayed messages whose deadline has passed, earliest first
    fn take_due(&mut self, now: Instant) -> Vec<Message> {
        let mut due = Vec::new();
        let mut waiting = Vec::with_capacity(self.delayed.len());
        for (deadline, message) in self.delayed.drain(..) {
            if deadline <= now {
                due.push((deadline, message));
            } else {
                waiting.push((deadline, message));
            }
        }
        self.delayed = waiting;
        due.sort_by_key(|(deadline, _)| *deadline);
        due.into_iter().map(|(_, message)| message).collect()
    }
}

/// Map a key press to a message
pub fn key_message(key: KeyEvent, gallery_open: bool) -> Option<Message> {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Some(Message::Quit);
    }
    if gallery_open {
        let direction = match key.code {
            KeyCode::Left => Some(GalleryDirection::Left),
            KeyCode::Right => Some(GalleryDirection::Right),
            KeyCode::Up => Some(GalleryDirection::Up),
            KeyCode::Down => Some(GalleryDirection::Down),
            _ => None,
        };
        if let Some(direction) = direction {
            return Some(Message::GalleryMove(direction));
        }
        if key.code == KeyCode::Enter {
            return Some(Message::OpenSelectedPhoto);
        }
    }
    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter if !gallery_open => Some(Message::Capture),
        KeyCode::Char('f') => Some(Message::ToggleTorch),
        KeyCode::Char('v') => Some(Message::ShowSessionPhotos),
        KeyCode::Char('a') => Some(Message::ShowAllPhotos),
        KeyCode::Char('+') | KeyCode::Char('=') => Some(Message::Pinch(PINCH_SCALE_STEP)),
        KeyCode::Char('-') => Some(Message::Pinch(1.0 / PINCH_SCALE_STEP)),
        KeyCode::Esc | KeyCode::Backspace => Some(Message::Back),
        KeyCode::Char('q') => Some(Message::Quit),
        _ => None,
    }
}

/// Map a mouse event to a message; the wheel acts as a pinch
pub fn mouse_message(mouse: MouseEvent) -> Option<Message> {
    let (column, row) = (mouse.column, mouse.row);
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => Some(Message::MouseDown { column, row }),
        MouseEventKind::Up(MouseButton::Left) => Some(Message::MouseUp { column, row }),
        MouseEventKind::ScrollUp => Some(Message::Pinch(PINCH_SCALE_STEP)),
        MouseEventKind::ScrollDown => Some(Message::Pinch(1.0 / PINCH_SCALE_STEP)),
        _ => None,
    }
}
