//! Recording [`Transport`] double for tests.
//!
//! Every command is appended to `calls`; events are pushed into the
//! controller with [`MockTransport::emit`] while attached.

use std::sync::mpsc;

use crate::api::AudioLocator;

use super::transport::{Transport, TransportError, TransportEvent};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Attach(String),
    Detach,
    Play,
    Pause,
    Seek(f64),
    Volume(f32),
}

#[derive(Default)]
pub struct MockTransport {
    pub calls: Vec<Call>,
    /// `play()` fails with `NoDevice`.
    pub reject_play: bool,
    pub sender: Option<mpsc::Sender<TransportEvent>>,
}

impl MockTransport {
    pub fn emit(&self, event: TransportEvent) {
        if let Some(tx) = &self.sender {
            let _ = tx.send(event);
        }
    }

    pub fn is_attached(&self) -> bool {
        self.sender.is_some()
    }

    pub fn last_volume(&self) -> Option<f32> {
        self.calls.iter().rev().find_map(|c| match c {
            Call::Volume(v) => Some(*v),
            _ => None,
        })
    }
}

impl Transport for MockTransport {
    fn attach(&mut self, locator: &AudioLocator, events: mpsc::Sender<TransportEvent>) {
        self.calls.push(Call::Attach(locator.as_str().to_string()));
        self.sender = Some(events);
    }

    fn detach(&mut self) {
        self.calls.push(Call::Detach);
        self.sender = None;
    }

    fn play(&mut self) -> Result<(), TransportError> {
        self.calls.push(Call::Play);
        if self.reject_play {
            Err(TransportError::NoDevice)
        } else {
            Ok(())
        }
    }

    fn pause(&mut self) {
        self.calls.push(Call::Pause);
    }

    fn seek(&mut self, position_secs: f64) {
        self.calls.push(Call::Seek(position_secs));
    }

    fn set_volume(&mut self, volume: f32) {
        self.calls.push(Call::Volume(volume));
    }
}
