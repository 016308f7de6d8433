/// Callback enregistré auprès du détecteur.
///
/// `FnMut + Send` : le détecteur reste déplaçable vers un thread d'analyse dédié.
pub type Listener<E> = Box<dyn FnMut(&E) + Send>;

/// Type d'événement rythmique, une liste de listeners par type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EventKind {
    Beat,
    Kick,
    Snare,
    Hihat,
}

/// Instrument ayant déclenché un [`OnsetEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Instrument {
    Kick,
    Snare,
    Hihat,
}

impl Instrument {
    #[must_use]
    pub const fn kind(self) -> EventKind {
        match self {
            Instrument::Kick => EventKind::Kick,
            Instrument::Snare => EventKind::Snare,
            Instrument::Hihat => EventKind::Hihat,
        }
    }
}

/// Payload passed to beat listeners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BeatEvent {
    /// Timestamp of the beat (ms), also recorded in the beat history.
    pub time_ms: f64,
    /// Energy that triggered the beat.
    pub energy: f32,
    /// Tempo estimate right after this beat (0 until four beats are known).
    pub bpm: u32,
    pub confidence: f32,
}

/// Payload passed to kick / snare / hi-hat listeners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OnsetEvent {
    pub instrument: Instrument,
    pub time_ms: f64,
    /// Band energy compared against the instrument threshold.
    pub energy: f32,
}

/// Handle returned by the `on_*_detected` methods; pass it back to
/// `RhythmDetector::unsubscribe` to remove that specific callback.
#[must_use = "dropping the handle makes the listener impossible to remove"]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Subscription {
    kind: EventKind,
    id: u64,
}

impl Subscription {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        self.kind
    }
}

/// Liste ordonnée de listeners pour un seul type d'événement.
///
/// Émission synchrone, dans l'ordre d'enregistrement, sans file d'attente.
///
/// # Example
/// ```
/// use pb_audio::events::{EventKind, Listeners};
/// use std::sync::{Arc, Mutex};
///
/// let seen = Arc::new(Mutex::new(Vec::new()));
/// let mut listeners: Listeners<u32> = Listeners::new(EventKind::Beat);
/// let sink = Arc::clone(&seen);
/// let sub = listeners.add(Box::new(move |v| sink.lock().unwrap().push(*v)));
/// listeners.emit(&7);
/// assert!(listeners.remove(sub));
/// listeners.emit(&8);
/// assert_eq!(*seen.lock().unwrap(), vec![7]);
/// ```
pub struct Listeners<E> {
    kind: EventKind,
    entries: Vec<(u64, Listener<E>)>,
    next_id: u64,
}

impl<E> Listeners<E> {
    #[must_use]
    pub fn new(kind: EventKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Append a listener; it runs after every previously added one.
    pub fn add(&mut self, listener: Listener<E>) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, listener));
        Subscription {
            kind: self.kind,
            id,
        }
    }

    /// Remove the listener behind `sub`. Handles of another kind never match.
    pub fn remove(&mut self, sub: Subscription) -> bool {
        if sub.kind != self.kind {
            return false;
        }
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != sub.id);
        self.entries.len() != before
    }

    /// Call every listener in registration order.
    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.entries {
            listener(event);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
