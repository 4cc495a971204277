use crossterm::event::{
    Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use flipview_core::{Command, PointerButton, ViewMode};

#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Command(Command),
    Resize { columns: u16, rows: u16 },
    Quit,
    None,
}

/// Pixel size of one terminal cell, used to turn cell coordinates into pointer
/// positions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl Default for CellSize {
    fn default() -> Self {
        Self {
            width: 8.0,
            height: 16.0,
        }
    }
}

/// Translates terminal input into viewer commands. Digits edit the page field
/// until it is submitted, cancelled, or another command is issued.
#[derive(Debug, Default)]
pub struct EventMapper {
    page_input: String,
    editing: bool,
    cell: CellSize,
}

impl EventMapper {
    pub const SCROLL_STEP: f32 = 48.0;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_cell_size(&mut self, cell: CellSize) {
        self.cell = cell;
    }

    pub fn cell_size(&self) -> CellSize {
        self.cell
    }

    pub fn is_editing_page(&self) -> bool {
        self.editing
    }

    /// Stops editing after the viewer accepted the submitted page.
    pub fn end_page_input(&mut self) {
        self.editing = false;
        self.page_input.clear();
    }

    pub fn pending_input(&self) -> Option<String> {
        self.editing.then(|| format!("go to: {}", self.page_input))
    }

    pub fn map_event(&mut self, event: Event) -> UiEvent {
        match event {
            Event::Key(key) if key.kind != KeyEventKind::Release => self.map_key(key),
            Event::Mouse(mouse) => self.map_mouse(mouse),
            Event::Resize(columns, rows) => UiEvent::Resize { columns, rows },
            _ => UiEvent::None,
        }
    }

    fn map_key(&mut self, KeyEvent { code, modifiers, .. }: KeyEvent) -> UiEvent {
        match (code, modifiers) {
            (KeyCode::Char(c), KeyModifiers::NONE) if c.is_ascii_digit() => {
                if !self.editing {
                    self.editing = true;
                    self.page_input.clear();
                }
                self.page_input.push(c);
                self.set_page_input()
            }
            (KeyCode::Backspace, _) if self.editing => {
                self.page_input.pop();
                self.set_page_input()
            }
            (KeyCode::Enter, _) if self.editing => UiEvent::Command(Command::SubmitPageInput),
            (KeyCode::Esc, _) if self.editing => {
                self.end_page_input();
                UiEvent::Command(Command::ResetPageInput)
            }
            (KeyCode::Left, m) if m.contains(KeyModifiers::CONTROL) => {
                self.scroll(-Self::SCROLL_STEP, 0.0)
            }
            (KeyCode::Right, m) if m.contains(KeyModifiers::CONTROL) => {
                self.scroll(Self::SCROLL_STEP, 0.0)
            }
            (KeyCode::Up, m) if m.contains(KeyModifiers::CONTROL) => {
                self.scroll(0.0, -Self::SCROLL_STEP)
            }
            (KeyCode::Down, m) if m.contains(KeyModifiers::CONTROL) => {
                self.scroll(0.0, Self::SCROLL_STEP)
            }
            (KeyCode::Char('j'), KeyModifiers::NONE)
            | (KeyCode::Right, KeyModifiers::NONE)
            | (KeyCode::PageDown, _) => self.command(Command::NextPage),
            (KeyCode::Char('k'), KeyModifiers::NONE)
            | (KeyCode::Left, KeyModifiers::NONE)
            | (KeyCode::PageUp, _) => self.command(Command::PrevPage),
            (KeyCode::Char('g'), KeyModifiers::NONE) | (KeyCode::Home, _) => {
                self.command(Command::FirstPage)
            }
            (KeyCode::Char('G'), _) | (KeyCode::End, _) => self.command(Command::LastPage),
            (KeyCode::Char('s'), KeyModifiers::NONE) => self.command(Command::SetMode {
                mode: ViewMode::Single,
            }),
            (KeyCode::Char('c'), KeyModifiers::NONE) => self.command(Command::SetMode {
                mode: ViewMode::Scroll,
            }),
            (KeyCode::Char('b'), KeyModifiers::NONE) => self.command(Command::SetMode {
                mode: ViewMode::Book,
            }),
            (KeyCode::Char('+'), _) | (KeyCode::Char('='), _) => self.command(Command::ZoomIn),
            (KeyCode::Char('-'), _) => self.command(Command::ZoomOut),
            (KeyCode::Char('d'), KeyModifiers::NONE) => self.command(Command::ToggleTheme),
            (KeyCode::Char('q'), _) => {
                self.end_page_input();
                UiEvent::Quit
            }
            (KeyCode::Char('c'), m) if m.contains(KeyModifiers::CONTROL) => {
                self.end_page_input();
                UiEvent::Quit
            }
            _ => UiEvent::None,
        }
    }

    fn map_mouse(&mut self, mouse: MouseEvent) -> UiEvent {
        let x = f32::from(mouse.column) * self.cell.width;
        let y = f32::from(mouse.row) * self.cell.height;
        let command = match mouse.kind {
            MouseEventKind::Down(button) => Command::PointerDown {
                button: pointer_button(button),
                x,
                y,
            },
            MouseEventKind::Drag(_) | MouseEventKind::Moved => Command::PointerMove { x, y },
            MouseEventKind::Up(_) => Command::PointerUp,
            MouseEventKind::ScrollDown => Command::ScrollBy {
                delta_x: 0.0,
                delta_y: Self::SCROLL_STEP,
            },
            MouseEventKind::ScrollUp => Command::ScrollBy {
                delta_x: 0.0,
                delta_y: -Self::SCROLL_STEP,
            },
            _ => return UiEvent::None,
        };
        UiEvent::Command(command)
    }

    fn set_page_input(&self) -> UiEvent {
        UiEvent::Command(Command::SetPageInput {
            text: self.page_input.clone(),
        })
    }

    fn command(&mut self, command: Command) -> UiEvent {
        self.end_page_input();
        UiEvent::Command(command)
    }

    fn scroll(&mut self, delta_x: f32, delta_y: f32) -> UiEvent {
        self.command(Command::ScrollBy { delta_x, delta_y })
    }
}

fn pointer_button(button: MouseButton) -> PointerButton {
    match button {
        MouseButton::Left => PointerButton::Primary,
        MouseButton::Middle => PointerButton::Auxiliary,
        MouseButton::Right => PointerButton::Secondary,
    }
}
