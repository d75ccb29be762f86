use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use uuid::Builder;

pub const DEFAULT_SESSION_CAPACITY: usize = 512;
pub const DEFAULT_SESSION_TTL_SECS: i64 = 1_800;

const NEW_SESSION_PROBABILITY: f64 = 0.3;

#[derive(Clone, Debug, PartialEq, Eq)]
struct Session {
    id: String,
    last_seen: DateTime<Utc>,
}

/// Shopper sessions reused across interactions.
///
/// Bounded two ways: an entry expires `ttl` after its last use, and minting
/// into a full pool evicts the least recently used entry.
#[derive(Clone, Debug)]
pub struct SessionPool {
    capacity: usize,
    ttl: Duration,
    sessions: Vec<Session>,
}

impl Default for SessionPool {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_CAPACITY, Duration::seconds(DEFAULT_SESSION_TTL_SECS))
    }
}

impl SessionPool {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity: capacity.max(1), ttl, sessions: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.sessions.iter().any(|session| session.id == id)
    }

    /// Session id for the next interaction: a fresh one 30% of the time or
    /// when no live session exists, otherwise a uniformly chosen live one.
    pub fn resolve<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> String {
        self.expire(now);
        if self.sessions.is_empty() || rng.gen_bool(NEW_SESSION_PROBABILITY) {
            return self.mint(now, rng);
        }

        let index = rng.gen_range(0..self.sessions.len());
        let session = &mut self.sessions[index];
        session.last_seen = now;
        session.id.clone()
    }

    pub fn expire(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.sessions.len();
        let ttl = self.ttl;
        self.sessions.retain(|session| now - session.last_seen < ttl);
        before - self.sessions.len()
    }

    fn mint<R: Rng + ?Sized>(&mut self, now: DateTime<Utc>, rng: &mut R) -> String {
        if self.sessions.len() >= self.capacity {
            if let Some(oldest) = self
                .sessions
                .iter()
                .enumerate()
                .min_by_key(|(_, session)| session.last_seen)
                .map(|(index, _)| index)
            {
                self.sessions.swap_remove(oldest);
            }
        }

        let id = Builder::from_random_bytes(rng.gen()).into_uuid().to_string();
        self.sessions.push(Session { id: id.clone(), last_seen: now });
        id
    }
}
