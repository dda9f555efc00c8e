//! User-agent pool with injectable random selection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt;
use std::sync::Mutex;

use super::ScholarError;

/// Browser user agents used when no pool is configured
pub const DEFAULT_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4_1) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36 Edg/124.0.2478.80",
];

/// Source of uniformly distributed indices
///
/// Injected into [`UserAgentPool`] so tests can substitute a deterministic
/// sequence for the thread RNG.
pub trait RandomSource: Send + fmt::Debug {
    /// Return an index in `0..upper`; `upper` is always at least 1
    fn below(&mut self, upper: usize) -> usize;
}

/// Thread-local RNG; the production default
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn below(&mut self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Reproducible RNG seeded from a fixed value
#[derive(Debug)]
pub struct SeededRandom(StdRng);

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl RandomSource for SeededRandom {
    fn below(&mut self, upper: usize) -> usize {
        self.0.gen_range(0..upper)
    }
}

/// Replays a fixed list of values, cycling when exhausted
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<usize>,
    pos: usize,
}

impl ScriptedRandom {
    pub fn new(values: impl Into<Vec<usize>>) -> Self {
        Self {
            values: values.into(),
            pos: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn below(&mut self, upper: usize) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.pos % self.values.len()];
        self.pos += 1;
        value % upper
    }
}

#[derive(Debug)]
struct PoolState {
    random: Box<dyn RandomSource>,
    last: Option<usize>,
}

/// Pool of plausible browser user agents
///
/// Each call to [`pick`](Self::pick) draws a fresh agent. When the pool holds
/// more than one distinct agent, the agent returned by the previous call is
/// excluded from the draw.
#[derive(Debug)]
pub struct UserAgentPool {
    agents: Vec<String>,
    state: Mutex<PoolState>,
}

impl UserAgentPool {
    /// Create a pool; blank and duplicate entries are dropped
    pub fn new<I, S>(agents: I, random: Box<dyn RandomSource>) -> Result<Self, ScholarError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for agent in agents {
            let agent = agent.into().trim().to_string();
            if !agent.is_empty() && !unique.contains(&agent) {
                unique.push(agent);
            }
        }

        if unique.is_empty() {
            return Err(ScholarError::Config("user-agent pool is empty".to_string()));
        }

        Ok(Self {
            agents: unique,
            state: Mutex::new(PoolState { random, last: None }),
        })
    }

    /// Pool of [`DEFAULT_USER_AGENTS`] driven by the thread RNG
    pub fn with_defaults() -> Self {
        Self {
            agents: DEFAULT_USER_AGENTS.iter().map(|s| s.to_string()).collect(),
            state: Mutex::new(PoolState {
                random: Box::new(ThreadRandom),
                last: None,
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn contains(&self, agent: &str) -> bool {
        self.agents.iter().any(|a| a == agent)
    }

    /// Draw the next user agent
    pub fn pick(&self) -> &str {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let n = self.agents.len();

        let index = match state.last {
            _ if n == 1 => 0,
            Some(last) => {
                // Draw among the other n-1 agents, skipping over `last`
                let i = state.random.below(n - 1).min(n - 2);
                if i >= last {
                    i + 1
                } else {
                    i
                }
            }
            None => state.random.below(n).min(n - 1),
        };

        state.last = Some(index);
        &self.agents[index]
    }
}
