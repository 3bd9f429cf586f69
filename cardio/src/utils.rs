// SPDX-License-Identifier: MIT

/// Outcome of a bounded retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retried<T> {
    Done { value: T, attempts: usize },
    Exhausted { attempts: usize },
}

impl<T> Retried<T> {
    #[inline]
    pub fn is_done(&self) -> bool {
        matches!(self, Retried::Done { .. })
    }

    #[inline]
    pub fn attempts(&self) -> usize {
        match self {
            Retried::Done { attempts, .. } | Retried::Exhausted { attempts } => *attempts,
        }
    }

    #[inline]
    pub fn ok(self) -> Option<T> {
        match self {
            Retried::Done { value, .. } => Some(value),
            Retried::Exhausted { .. } => None,
        }
    }
}

/// Runs `op` at most `attempts` times.
///
/// `op` receives the 1-based attempt number and returns `Ok(Some(v))` when
/// done, `Ok(None)` to try again, or `Err` to abort immediately.
pub fn retry<T, E, F>(attempts: usize, mut op: F) -> Result<Retried<T>, E>
where
    F: FnMut(usize) -> Result<Option<T>, E>,
{
    for attempt in 1..=attempts {
        if let Some(value) = op(attempt)? {
            return Ok(Retried::Done {
                value,
                attempts: attempt,
            });
        }
    }
    Ok(Retried::Exhausted { attempts })
}
