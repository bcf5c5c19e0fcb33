use std::collections::HashMap;
use std::io::{self, stdout, Stdout, Write};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{Receiver, TryRecvError},
    Arc,
};
use std::time::Duration;

use crossterm::event::{poll, read, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{ClearType, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute, queue, style, terminal};
use log::{debug, info, warn};

use crate::error::TermError;
use crate::port::{PortRequest, VisualKind};
use crate::registry::EntityId;
use crate::vector::{Direction, Vec2i};

pub type TermInt = u16;
pub type Coords = (TermInt, TermInt);

const SNAKE_BODY_CHAR: char = '█';
const FOOD_CHAR: char = 'O';
const DEAD_SNAKE_CHAR: char = 'X';

// Top border, bottom border and the score line
const RESERVED_ROWS: TermInt = 3;
const RESERVED_COLS: TermInt = 2;
const MIN_WIDTH: TermInt = 30;
const MIN_HEIGHT: TermInt = 10;

// W, A, S, D
const INPUT_PRIORITY: [Direction; 4] = [Direction::Up, Direction::Left, Direction::Down, Direction::Right];

/// Low level drawing on the alternate screen, with a back buffer so message
/// boxes can be removed without redrawing the whole field.
pub struct TermManager<W: Write = Stdout> {
    width: TermInt,
    height: TermInt,
    out: W,
    screen: Vec<char>,
    current_msg: Option<Message>,
}

struct Message {
    top_left: Coords,
    width: TermInt,
    height: TermInt,
    lines: Vec<String>,
}

impl TermManager {
    pub fn new() -> io::Result<Self> {
        let (width, height) = terminal::size()?;
        Ok(TermManager::with_writer(width, height, stdout()))
    }
}

impl<W: Write> TermManager<W> {
    pub fn with_writer(width: TermInt, height: TermInt, out: W) -> Self {
        let screen = vec![' '; width as usize * height as usize];
        TermManager { width, height, out, screen, current_msg: None }
    }

    pub fn setup(&mut self) -> io::Result<()> {
        execute!(self.out, EnterAlternateScreen)?;
        terminal::enable_raw_mode()?;
        execute!(self.out, cursor::Hide, cursor::DisableBlinking)
    }

    pub fn restore(&mut self) -> io::Result<()> {
        terminal::disable_raw_mode()?;
        execute!(self.out, cursor::Show, cursor::EnableBlinking, LeaveAlternateScreen)
    }

    pub fn get_terminal_size(&self) -> Coords {
        (self.width, self.height)
    }

    pub fn resize(&mut self, width: TermInt, height: TermInt) {
        self.width = width;
        self.height = height;
        self.current_msg = None;
        self.screen = vec![' '; width as usize * height as usize];
    }

    pub fn draw_borders(&mut self, bottom: TermInt) -> io::Result<()> {
        let width = self.width;
        if width < 2 || bottom == 0 {
            return Ok(());
        }

        for x in 0..width {
            let ch = if x == 0 || x == width - 1 { '+' } else { '-' };
            self.print_at((x, 0), ch)?;
            self.print_at((x, bottom), ch)?;
        }

        for y in 1..bottom {
            self.print_at((0, y), '|')?;
            self.print_at((width - 1, y), '|')?;
        }

        Ok(())
    }

    pub fn print_line(&mut self, y: TermInt, text: &str) -> io::Result<()> {
        let padded = format!("{: <width$}", text, width = self.width as usize);
        for (x, ch) in padded.chars().take(self.width as usize).enumerate() {
            self.print_at((x as TermInt, y), ch)?;
        }
        Ok(())
    }

    pub fn show_message(&mut self, lines: &[&str]) -> io::Result<()> {
        if self.has_message() {
            self.hide_message()?;
        }

        let msg_height = (lines.len() + 2) as TermInt;
        let msg_width = (lines.iter().map(|x| x.chars().count()).max().unwrap_or(0) + 2) as TermInt;
        let center = (self.width / 2, self.height / 2);
        let top_left = (center.0.saturating_sub(msg_width / 2), center.1.saturating_sub(msg_height / 2));

        // Top and bottom padding lines
        for y in [top_left.1, top_left.1 + msg_height - 1] {
            for x_diff in 0..msg_width {
                self.print_at_no_save((top_left.0 + x_diff, y), ' ')?;
            }
        }

        for (i, line) in lines.iter().enumerate() {
            let padded_line = format!("{line: ^width$}", line = line, width = msg_width as usize);
            let y = top_left.1 + i as TermInt + 1;
            for (x_diff, ch) in padded_line.chars().enumerate() {
                self.print_at_no_save((top_left.0 + x_diff as TermInt, y), ch)?;
            }
        }

        let lines = lines.iter().map(|line| line.to_string()).collect();
        self.current_msg = Some(Message { width: msg_width, height: msg_height, top_left, lines });
        self.flush()
    }

    pub fn hide_message(&mut self) -> io::Result<()> {
        let msg = match self.current_msg.take() {
            Some(msg) => msg,
            None => return Ok(()),
        };

        // Put back what the box was covering
        for y_diff in 0..msg.height {
            for x_diff in 0..msg.width {
                let pos = (msg.top_left.0 + x_diff, msg.top_left.1 + y_diff);
                if let Some(ch) = self.screen_at(pos) {
                    self.print_at_no_save(pos, ch)?;
                }
            }
        }

        self.flush()
    }

    /// Draws a character and records it in the back buffer. Cells under an
    /// open message box only reach the buffer.
    pub fn print_at(&mut self, pos: Coords, ch: char) -> io::Result<()> {
        if pos.0 >= self.width || pos.1 >= self.height {
            return Ok(());
        }

        self.screen[self.width as usize * pos.1 as usize + pos.0 as usize] = ch;
        if self.current_msg.as_ref().map_or(false, |msg| msg.contains(pos)) {
            return Ok(());
        }
        self.print_at_no_save(pos, ch)
    }

    pub fn clear(&mut self) -> io::Result<()> {
        execute!(self.out, terminal::Clear(ClearType::All))?;
        self.current_msg = None;
        self.screen = vec![' '; self.width as usize * self.height as usize];
        Ok(())
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn has_message(&self) -> bool {
        self.current_msg.is_some()
    }

    pub fn message_lines(&self) -> Option<Vec<String>> {
        self.current_msg.as_ref().map(|msg| msg.lines.clone())
    }

    ///////////////////////////////////////////////////////////////////////////

    fn screen_at(&self, pos: Coords) -> Option<char> {
        if pos.0 >= self.width || pos.1 >= self.height {
            return None;
        }
        self.screen.get(self.width as usize * pos.1 as usize + pos.0 as usize).copied()
    }

    fn print_at_no_save(&mut self, pos: Coords, ch: char) -> io::Result<()> {
        // Used for messages, so the buffer keeps what to restore afterwards
        queue!(self.out, cursor::MoveTo(pos.0, pos.1), style::Print(ch))
    }
}

impl Message {
    fn contains(&self, pos: Coords) -> bool {
        pos.0 >= self.top_left.0
            && pos.0 < self.top_left.0 + self.width
            && pos.1 >= self.top_left.1
            && pos.1 < self.top_left.1 + self.height
    }
}

#[derive(Copy, Clone, Debug)]
struct Visual {
    position: Vec2i,
    kind: VisualKind,
}

/// Serves `PortRequest`s on the thread that owns the terminal.
pub struct TerminalPresenter<W: Write = Stdout> {
    term: TermManager<W>,
    cell_size: i32,
    visuals: HashMap<EntityId, Visual>,
    score: u32,
    // No field drawing while the game-over screen is up
    frozen: bool,
    quit: Arc<AtomicBool>,
}

impl TerminalPresenter {
    pub fn new(cell_size: i32, quit: Arc<AtomicBool>) -> Result<Self, TermError> {
        let term = TermManager::new()?;
        let (width, height) = term.get_terminal_size();
        if width < MIN_WIDTH || height < MIN_HEIGHT {
            return Err(TermError::TooSmall { width, height });
        }

        Ok(TerminalPresenter::with_term(term, cell_size, quit))
    }
}

impl<W: Write> TerminalPresenter<W> {
    fn with_term(term: TermManager<W>, cell_size: i32, quit: Arc<AtomicBool>) -> Self {
        TerminalPresenter { term, cell_size, visuals: HashMap::new(), score: 0, frozen: false, quit }
    }

    /// Takes over the terminal until a `Shutdown` arrives or the engine side
    /// hangs up, then gives it back.
    pub fn serve(mut self, requests: Receiver<PortRequest>) -> Result<(), TermError> {
        let served = match self.term.setup() {
            Ok(()) => self.serve_requests(&requests),
            Err(e) => Err(e.into()),
        };
        let restored = self.term.restore();

        served?;
        restored?;
        Ok(())
    }

    fn serve_requests(&mut self, requests: &Receiver<PortRequest>) -> Result<(), TermError> {
        loop {
            let request = match requests.try_recv() {
                Ok(request) => request,
                Err(TryRecvError::Empty) => {
                    // Idle: show what has been queued so far
                    self.term.flush()?;
                    match requests.recv() {
                        Ok(request) => request,
                        Err(_) => break,
                    }
                }
                Err(TryRecvError::Disconnected) => break,
            };

            if !self.handle(request)? {
                break;
            }
        }

        info!("Presentation thread done");
        Ok(())
    }

    fn handle(&mut self, request: PortRequest) -> Result<bool, TermError> {
        match request {
            PortRequest::ReadInput { reply } => {
                let dir = self.poll_direction()?;
                let _ = reply.send(dir);
            }
            PortRequest::SurfaceSize { reply } => {
                let _ = reply.send(self.surface_size());
            }
            PortRequest::Spawn { id, position, size: _, kind } => {
                self.visuals.insert(id, Visual { position, kind });
                self.draw_visual(position, kind)?;
            }
            PortRequest::Remove { id } => match self.visuals.remove(&id) {
                Some(visual) => self.erase(visual.position)?,
                None => warn!("Asked to remove unknown visual {}", id),
            },
            PortRequest::Move { id, position } => {
                let old = match self.visuals.get_mut(&id) {
                    Some(visual) => std::mem::replace(&mut visual.position, position),
                    None => {
                        warn!("Asked to move unknown visual {}", id);
                        return Ok(true);
                    }
                };
                let kind = self.visuals[&id].kind;
                self.erase(old)?;
                self.draw_visual(position, kind)?;
            }
            PortRequest::Score(score) => {
                self.score = score;
                self.draw_score()?;
            }
            PortRequest::GameOver { score, done } => {
                self.show_game_over(score)?;
                let _ = done.send(());
            }
            PortRequest::Intro { reply } => {
                let go_on = self.show_intro()?;
                if go_on {
                    self.reset_field()?;
                }
                let _ = reply.send(go_on);
            }
            PortRequest::AwaitRetry { reply } => {
                let again = !is_ctrl_c(&self.read_key_blocking()?);
                if again {
                    self.reset_field()?;
                }
                let _ = reply.send(again);
            }
            PortRequest::Shutdown => return Ok(false),
        }

        Ok(true)
    }

    fn show_intro(&mut self) -> Result<bool, TermError> {
        let lines = &[
            "Arrow keys or WASD to move",
            "CTRL+C to quit",
            "",
            "Press any key to begin",
        ];

        self.term.show_message(lines)?;
        let key = self.read_key_blocking()?;
        self.term.hide_message()?;

        Ok(!is_ctrl_c(&key))
    }

    fn show_game_over(&mut self, score: u32) -> Result<(), TermError> {
        let dead: Vec<Vec2i> = self
            .visuals
            .values()
            .filter(|visual| visual.kind == VisualKind::Snake)
            .map(|visual| visual.position)
            .collect();
        for position in dead {
            if let Some(pos) = self.cell_of(position) {
                self.term.print_at(pos, DEAD_SNAKE_CHAR)?;
            }
        }

        self.frozen = true;
        self.term.show_message(&[
            "Game over!",
            &*format!("Score: {}", score),
            "",
            "Press any key to play again,",
            "or CTRL+C to quit.",
        ])?;
        Ok(())
    }

    /// Fresh, empty field for the next session.
    fn reset_field(&mut self) -> io::Result<()> {
        self.visuals.clear();
        self.score = 0;
        self.frozen = false;
        self.redraw()
    }

    fn redraw(&mut self) -> io::Result<()> {
        self.term.clear()?;
        let (_, height) = self.term.get_terminal_size();
        self.term.draw_borders(height.saturating_sub(2))?;

        let visuals: Vec<Visual> = self.visuals.values().copied().collect();
        for visual in visuals {
            self.draw_visual(visual.position, visual.kind)?;
        }
        self.draw_score()?;
        self.term.flush()
    }

    fn relayout(&mut self, width: TermInt, height: TermInt) -> io::Result<()> {
        debug!("Terminal resized to {}x{}", width, height);
        let message = self.term.message_lines();
        self.term.resize(width, height);
        self.redraw()?;

        // A box waiting for a key stays up, centered on the new size
        match message {
            Some(lines) => {
                let lines: Vec<&str> = lines.iter().map(String::as_str).collect();
                self.term.show_message(&lines)
            }
            None => Ok(()),
        }
    }

    fn draw_score(&mut self) -> io::Result<()> {
        let (_, height) = self.term.get_terminal_size();
        let text = format!(" Score: {}", self.score);
        self.term.print_line(height.saturating_sub(1), &text)
    }

    fn draw_visual(&mut self, position: Vec2i, kind: VisualKind) -> io::Result<()> {
        if self.frozen {
            return Ok(());
        }
        match self.cell_of(position) {
            Some(pos) => self.term.print_at(pos, glyph(kind)),
            None => {
                warn!("Visual at {:?} is outside the drawable field", position);
                Ok(())
            }
        }
    }

    // Blanks a cell unless another visual still sits there
    fn erase(&mut self, position: Vec2i) -> io::Result<()> {
        if self.frozen {
            return Ok(());
        }
        let pos = match self.cell_of(position) {
            Some(pos) => pos,
            None => return Ok(()),
        };

        let covering = covering_glyph(self.visuals.values(), position, self.cell_size);
        self.term.print_at(pos, covering.unwrap_or(' '))
    }

    fn cell_of(&self, position: Vec2i) -> Option<Coords> {
        cell_for(position, self.cell_size, self.play_field())
    }

    fn play_field(&self) -> Coords {
        let (width, height) = self.term.get_terminal_size();
        (width.saturating_sub(RESERVED_COLS), height.saturating_sub(RESERVED_ROWS))
    }

    fn surface_size(&self) -> (i32, i32) {
        surface_for(self.play_field(), self.cell_size)
    }

    fn poll_direction(&mut self) -> io::Result<Option<Direction>> {
        let mut pressed = vec![];

        while poll(Duration::ZERO)? {
            match read()? {
                Event::Key(ev) if ev.kind != KeyEventKind::Release => {
                    if is_ctrl_c(&ev) {
                        info!("Quit requested");
                        self.quit.store(true, Ordering::Relaxed);
                    } else if let Some(dir) = direction_for(ev.code) {
                        pressed.push(dir);
                    }
                }
                Event::Resize(width, height) => self.relayout(width, height)?,
                _ => {}
            }
        }

        Ok(resolve_direction(&pressed))
    }

    fn read_key_blocking(&mut self) -> io::Result<KeyEvent> {
        loop {
            match read()? {
                Event::Key(ev) if ev.kind == KeyEventKind::Press => return Ok(ev),
                Event::Resize(width, height) => self.relayout(width, height)?,
                _ => {}
            }
        }
    }
}

fn glyph(kind: VisualKind) -> char {
    match kind {
        VisualKind::Snake => SNAKE_BODY_CHAR,
        VisualKind::Food => FOOD_CHAR,
    }
}

/// Glyph of whatever still occupies the cell of `position`. The snake wins
/// over food so the result does not depend on iteration order.
fn covering_glyph<'a>(visuals: impl Iterator<Item = &'a Visual>, position: Vec2i, cell_size: i32) -> Option<char> {
    visuals
        .filter(|visual| same_cell(visual.position, position, cell_size))
        .map(|visual| visual.kind)
        .min_by_key(|kind| match kind {
            VisualKind::Snake => 0,
            VisualKind::Food => 1,
        })
        .map(glyph)
}

fn same_cell(a: Vec2i, b: Vec2i, cell_size: i32) -> bool {
    a.x.div_euclid(cell_size) == b.x.div_euclid(cell_size) && a.y.div_euclid(cell_size) == b.y.div_euclid(cell_size)
}

/// Terminal cell for a grid position, inside the border. `None` when the
/// position falls outside a field of `field` columns and rows.
fn cell_for(position: Vec2i, cell_size: i32, field: Coords) -> Option<Coords> {
    let col = position.x.div_euclid(cell_size);
    let row = position.y.div_euclid(cell_size);

    if col < 0 || row < 0 || col >= field.0 as i32 || row >= field.1 as i32 {
        return None;
    }
    Some((col as TermInt + 1, row as TermInt + 1))
}

/// Surface size to report so that every cell the wrap rule can reach is
/// drawable. The vertical extent gets one extra cell from the bounds formula.
fn surface_for(field: Coords, cell_size: i32) -> (i32, i32) {
    let width = field.0 as i32 * cell_size;
    let height = (field.1 as i32 - 1).max(0) * cell_size;
    (width, height)
}

fn direction_for(code: KeyCode) -> Option<Direction> {
    match code {
        KeyCode::Char('w') | KeyCode::Char('W') | KeyCode::Up => Some(Direction::Up),
        KeyCode::Char('a') | KeyCode::Char('A') | KeyCode::Left => Some(Direction::Left),
        KeyCode::Char('s') | KeyCode::Char('S') | KeyCode::Down => Some(Direction::Down),
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Right => Some(Direction::Right),
        _ => None,
    }
}

fn resolve_direction(pressed: &[Direction]) -> Option<Direction> {
    INPUT_PRIORITY.iter().copied().find(|dir| pressed.contains(dir))
}

fn is_ctrl_c(ev: &KeyEvent) -> bool {
    matches!(ev, KeyEvent { code: KeyCode::Char('c'), modifiers: KeyModifiers::CONTROL, .. })
}
