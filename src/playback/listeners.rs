use super::state::PlaybackAnalytics;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

/// The closed set of notifications a playback engine emits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "camelCase")]
pub enum PlaybackEventKind {
    RecordingLoaded,
    Play,
    Pause,
    Stop,
    Seek,
    SpeedChange,
    TimeUpdate,
    PlaybackComplete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackNotice {
    RecordingLoaded {
        recording_id: String,
        duration_ms: u64,
        total_keystrokes: usize,
    },
    Play {
        current_time: f64,
    },
    Pause {
        current_time: f64,
    },
    Stop,
    Seek {
        from: f64,
        to: f64,
    },
    SpeedChange {
        speed: f64,
    },
    TimeUpdate {
        current_time: f64,
        progress: f64,
    },
    PlaybackComplete {
        analytics: PlaybackAnalytics,
    },
}

impl PlaybackNotice {
    pub fn kind(&self) -> PlaybackEventKind {
        match self {
            Self::RecordingLoaded { .. } => PlaybackEventKind::RecordingLoaded,
            Self::Play { .. } => PlaybackEventKind::Play,
            Self::Pause { .. } => PlaybackEventKind::Pause,
            Self::Stop => PlaybackEventKind::Stop,
            Self::Seek { .. } => PlaybackEventKind::Seek,
            Self::SpeedChange { .. } => PlaybackEventKind::SpeedChange,
            Self::TimeUpdate { .. } => PlaybackEventKind::TimeUpdate,
            Self::PlaybackComplete { .. } => PlaybackEventKind::PlaybackComplete,
        }
    }
}

pub type Listener = Box<dyn FnMut(&PlaybackNotice)>;

/// Handle returned by registration, used to unregister
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: HashMap<PlaybackEventKind, Vec<(ListenerId, Listener)>>,
}

impl ListenerRegistry {
    pub fn on(&mut self, kind: PlaybackEventKind, listener: Listener) -> ListenerId {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.entry(kind).or_default().push((id, listener));
        id
    }

    /// Returns whether a listener was removed
    pub fn off(&mut self, kind: PlaybackEventKind, id: ListenerId) -> bool {
        let Some(list) = self.listeners.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(lid, _)| *lid != id);
        before != list.len()
    }

    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.listeners.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `notice` to every listener of its kind in registration order.
    /// A panicking listener is logged and skipped.
    pub fn emit(&mut self, notice: &PlaybackNotice) {
        let kind = notice.kind();
        let Some(list) = self.listeners.get_mut(&kind) else {
            return;
        };
        for (id, listener) in list.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| listener(notice)));
            if let Err(payload) = outcome {
                log::error!(
                    "{} listener {:?} panicked: {}",
                    kind,
                    id,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn delivers_only_matching_kind() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ListenerRegistry::default();
        let log = seen.clone();
        registry.on(
            PlaybackEventKind::Seek,
            Box::new(move |n| log.borrow_mut().push(n.clone())),
        );

        registry.emit(&PlaybackNotice::Stop);
        registry.emit(&PlaybackNotice::Seek { from: 0.0, to: 5.0 });

        assert_eq!(
            *seen.borrow(),
            vec![PlaybackNotice::Seek { from: 0.0, to: 5.0 }]
        );
    }

    #[test]
    fn off_removes_listener() {
        let count = Rc::new(RefCell::new(0));
        let mut registry = ListenerRegistry::default();
        let c = count.clone();
        let id = registry.on(PlaybackEventKind::Stop, Box::new(move |_| *c.borrow_mut() += 1));

        registry.emit(&PlaybackNotice::Stop);
        assert!(registry.off(PlaybackEventKind::Stop, id));
        assert!(!registry.off(PlaybackEventKind::Stop, id));
        assert!(!registry.off(PlaybackEventKind::Play, id));
        registry.emit(&PlaybackNotice::Stop);

        assert_eq!(*count.borrow(), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn panicking_listener_does_not_stop_others() {
        let count = Rc::new(RefCell::new(0));
        let mut registry = ListenerRegistry::default();
        registry.on(PlaybackEventKind::Stop, Box::new(|_| panic!("listener bug")));
        let c = count.clone();
        registry.on(PlaybackEventKind::Stop, Box::new(move |_| *c.borrow_mut() += 1));

        registry.emit(&PlaybackNotice::Stop);
        registry.emit(&PlaybackNotice::Stop);

        assert_eq!(*count.borrow(), 2);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn kind_names_are_camel_case() {
        assert_eq!(PlaybackEventKind::RecordingLoaded.to_string(), "recordingLoaded");
        assert_eq!(PlaybackEventKind::PlaybackComplete.to_string(), "playbackComplete");
    }
}
