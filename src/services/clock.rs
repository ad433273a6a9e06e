use chrono::{DateTime, Utc};

/// Source of "now" for anything date-gated.
#[derive(Debug, Clone, Copy)]
pub enum Clock {
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::System
    }
}
