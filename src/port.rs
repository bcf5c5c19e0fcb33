use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{channel, Receiver, Sender},
    Arc,
};

use crate::error::PortError;
use crate::grid::GridBounds;
use crate::registry::EntityId;
use crate::vector::{Direction, Vec2i};

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VisualKind {
    Snake,
    Food,
}

/// Everything the engine needs from the rendering and input side.
///
/// Calls returning data block until the presentation side answers; visual and
/// score updates do not wait.
pub trait PresentationPort {
    /// Direction requested since the last call, if any.
    fn read_direction_input(&mut self) -> Result<Option<Direction>, PortError>;

    fn query_grid_bounds(&mut self, segment_size: i32) -> Result<GridBounds, PortError>;

    fn spawn_visual(&mut self, id: EntityId, position: Vec2i, size: i32, kind: VisualKind) -> Result<(), PortError>;

    fn remove_visual(&mut self, id: EntityId) -> Result<(), PortError>;

    fn move_visual(&mut self, id: EntityId, position: Vec2i) -> Result<(), PortError>;

    fn set_score_display(&mut self, score: u32) -> Result<(), PortError>;

    fn show_game_over(&mut self, final_score: u32) -> Result<(), PortError>;

    /// Whether the player asked to leave the game altogether.
    fn quit_requested(&self) -> bool {
        false
    }
}

/// Messages marshaled onto the presentation thread.
#[derive(Debug)]
pub enum PortRequest {
    ReadInput { reply: Sender<Option<Direction>> },
    SurfaceSize { reply: Sender<(i32, i32)> },
    Spawn { id: EntityId, position: Vec2i, size: i32, kind: VisualKind },
    Remove { id: EntityId },
    Move { id: EntityId, position: Vec2i },
    Score(u32),
    GameOver { score: u32, done: Sender<()> },
    Intro { reply: Sender<bool> },
    AwaitRetry { reply: Sender<bool> },
    Shutdown,
}

/// Engine-side handle to the presentation thread.
pub struct PortClient {
    requests: Sender<PortRequest>,
    quit: Arc<AtomicBool>,
}

impl PortClient {
    /// Creates a client, the receiving end for the presentation thread, and the
    /// quit flag that thread raises.
    pub fn new() -> (Self, Receiver<PortRequest>, Arc<AtomicBool>) {
        let (requests, rx) = channel();
        let quit = Arc::new(AtomicBool::new(false));
        (PortClient { requests, quit: quit.clone() }, rx, quit)
    }

    /// Shows the key help. Returns false if the player quit from there.
    pub fn show_intro(&mut self) -> Result<bool, PortError> {
        self.ask(|reply| PortRequest::Intro { reply })
    }

    /// Waits for the retry-or-quit decision after a session.
    pub fn await_retry(&mut self) -> Result<bool, PortError> {
        self.ask(|reply| PortRequest::AwaitRetry { reply })
    }

    pub fn shutdown(&mut self) -> Result<(), PortError> {
        self.send(PortRequest::Shutdown)
    }

    fn send(&self, request: PortRequest) -> Result<(), PortError> {
        self.requests.send(request).map_err(|_| PortError::Disconnected)
    }

    fn ask<T>(&self, request: impl FnOnce(Sender<T>) -> PortRequest) -> Result<T, PortError> {
        let (reply, answer) = channel();
        self.send(request(reply))?;
        answer.recv().map_err(|_| PortError::Disconnected)
    }
}

impl PresentationPort for PortClient {
    fn read_direction_input(&mut self) -> Result<Option<Direction>, PortError> {
        self.ask(|reply| PortRequest::ReadInput { reply })
    }

    fn query_grid_bounds(&mut self, segment_size: i32) -> Result<GridBounds, PortError> {
        let (width, height) = self.ask(|reply| PortRequest::SurfaceSize { reply })?;
        Ok(GridBounds::from_surface(width, height, segment_size))
    }

    fn spawn_visual(&mut self, id: EntityId, position: Vec2i, size: i32, kind: VisualKind) -> Result<(), PortError> {
        self.send(PortRequest::Spawn { id, position, size, kind })
    }

    fn remove_visual(&mut self, id: EntityId) -> Result<(), PortError> {
        self.send(PortRequest::Remove { id })
    }

    fn move_visual(&mut self, id: EntityId, position: Vec2i) -> Result<(), PortError> {
        self.send(PortRequest::Move { id, position })
    }

    fn set_score_display(&mut self, score: u32) -> Result<(), PortError> {
        self.send(PortRequest::Score(score))
    }

    fn show_game_over(&mut self, final_score: u32) -> Result<(), PortError> {
        self.ask(|done| PortRequest::GameOver { score: final_score, done })
    }

    fn quit_requested(&self) -> bool {
        self.quit.load(Ordering::Relaxed)
    }
}


#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    #[test]
    fn blocking_calls_round_trip_through_the_channel() {
        let (mut client, rx, quit) = PortClient::new();

        let presenter = thread::spawn(move || {
            let mut updates = vec![];
            for request in rx {
                match request {
                    PortRequest::SurfaceSize { reply } => reply.send((500, 380)).unwrap(),
                    PortRequest::ReadInput { reply } => {
                        quit.store(true, Ordering::Relaxed);
                        reply.send(Some(Direction::Left)).unwrap()
                    }
                    PortRequest::Shutdown => break,
                    other => updates.push(format!("{:?}", other)),
                }
            }
            updates
        });

        client.set_score_display(15).unwrap();
        assert_eq!(client.query_grid_bounds(20).unwrap(), GridBounds { max_x: 500, max_y: 400 });
        assert_eq!(client.read_direction_input().unwrap(), Some(Direction::Left));
        assert!(client.quit_requested());
        client.shutdown().unwrap();

        let updates = presenter.join().unwrap();
        assert_eq!(updates, vec!["Score(15)".to_string()]);
    }

    #[test]
    fn dead_presenter_is_reported() {
        let (mut client, rx, _quit) = PortClient::new();
        drop(rx);

        assert!(matches!(client.read_direction_input(), Err(PortError::Disconnected)));
        assert!(matches!(client.move_visual(1, Vec2i::new(1, 1)), Err(PortError::Disconnected)));
    }
}
