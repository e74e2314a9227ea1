//! Marshals work from other threads onto the thread that owns the GPU.
//!
//! A [`SessionHandle`] can be cloned and sent anywhere; commands queue up
//! until the session drains them at the start of its next frame.

use crossbeam_channel::{unbounded, Receiver, Sender};
use fractal::UniformValue;

use crate::input::InputEvent;

#[derive(Clone, Debug, PartialEq)]
pub enum SessionCommand {
    Input(InputEvent),
    SetParameter { name: String, value: UniformValue },
    HotSwap { vertex: String, fragment: String },
    Quit,
}

#[derive(Clone, Debug)]
pub struct SessionHandle {
    tx: Sender<SessionCommand>,
}

impl SessionHandle {
    /// Queues a command. Returns `false` once the session is gone.
    pub fn send(&self, command: SessionCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn input(&self, event: InputEvent) -> bool {
        self.send(SessionCommand::Input(event))
    }

    pub fn set_parameter(&self, name: impl Into<String>, value: UniformValue) -> bool {
        self.send(SessionCommand::SetParameter {
            name: name.into(),
            value,
        })
    }

    pub fn hot_swap(&self, vertex: impl Into<String>, fragment: impl Into<String>) -> bool {
        self.send(SessionCommand::HotSwap {
            vertex: vertex.into(),
            fragment: fragment.into(),
        })
    }

    pub fn quit(&self) -> bool {
        self.send(SessionCommand::Quit)
    }
}

pub(crate) fn channel() -> (SessionHandle, Receiver<SessionCommand>) {
    let (tx, rx) = unbounded();
    (SessionHandle { tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commands_cross_threads_in_order() {
        let (handle, rx) = channel();
        let remote = handle.clone();
        std::thread::spawn(move || {
            remote.set_parameter("power", UniformValue::Float(3.0));
            remote.quit();
        })
        .join()
        .unwrap();

        let received: Vec<_> = rx.try_iter().collect();
        assert_eq!(received.len(), 2);
        assert_eq!(received[1], SessionCommand::Quit);
    }

    #[test]
    fn send_fails_once_receiver_is_dropped() {
        let (handle, rx) = channel();
        drop(rx);
        assert!(!handle.quit());
    }
}
