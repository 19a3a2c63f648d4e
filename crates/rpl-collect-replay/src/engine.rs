use rpl_collect_abstract::{HostSignal, ReplayTrace, SerialEvent, SimTime, SimulationHost};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::debug;

#[derive(Debug)]
struct QueuedEvent {
    event: SerialEvent,
    id: u64, // Preserves print order of lines sharing a timestamp
}

// Custom Ord for Min-Heap (smallest time pops first)
impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.event.time == other.event.time && self.id == other.id
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .event
            .time
            .cmp(&self.event.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Replays recorded serial output in timestamp order, standing in for a live
/// simulation. Simulated time jumps straight to each event; once the next
/// event would land at or after the timeout, the host reports the timeout.
pub struct ReplayHost {
    time: SimTime,
    timeout: SimTime,
    queue: BinaryHeap<QueuedEvent>,
    event_id_counter: u64,
    delivered: u64,
    yields: u64,
}

impl ReplayHost {
    pub fn new(timeout: SimTime) -> Self {
        Self {
            time: 0,
            timeout,
            queue: BinaryHeap::new(),
            event_id_counter: 0,
            delivered: 0,
            yields: 0,
        }
    }

    pub fn from_trace(trace: &ReplayTrace, timeout: SimTime) -> Self {
        let mut host = Self::new(timeout);
        for event in &trace.events {
            host.schedule(event.into());
        }
        host
    }

    pub fn schedule(&mut self, event: SerialEvent) {
        self.queue.push(QueuedEvent {
            event,
            id: self.event_id_counter,
        });
        self.event_id_counter += 1;
    }

    pub fn remaining_events(&self) -> usize {
        self.queue.len()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }

    pub fn yields(&self) -> u64 {
        self.yields
    }
}

impl SimulationHost for ReplayHost {
    fn next_signal(&mut self) -> HostSignal {
        match self.queue.peek() {
            Some(next) if next.event.time < self.timeout => {}
            _ => {
                self.time = self.time.max(self.timeout);
                return HostSignal::Timeout;
            }
        }
        let Some(QueuedEvent { event, .. }) = self.queue.pop() else {
            return HostSignal::Timeout;
        };
        self.time = event.time;
        self.delivered += 1;
        debug!("Replaying event at {} from mote {}", event.time, event.mote_id);
        HostSignal::Event(event)
    }

    fn yield_now(&mut self) {
        self.yields += 1;
    }

    fn now(&self) -> SimTime {
        self.time
    }
}
