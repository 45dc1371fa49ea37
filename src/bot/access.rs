//! Allow-list check run before every handler.

use tracing::warn;

use crate::flow::Partners;

/// Admits only configured operators.
#[derive(Debug, Clone)]
pub struct AccessGuard {
    allowed: Vec<i64>,
}

impl AccessGuard {
    #[must_use]
    pub fn new(partners: &Partners) -> Self {
        Self {
            allowed: partners.admins.clone(),
        }
    }

    /// Whether `user_id` may use the bot. Rejections are logged.
    #[must_use]
    pub fn admits(&self, user_id: i64) -> bool {
        let allowed = self.allowed.contains(&user_id);
        if !allowed {
            warn!("Access denied for user_id={}", user_id);
        }
        allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admits_only_admins() {
        let guard = AccessGuard::new(&Partners {
            business: 1,
            team: 2,
            admins: vec![1, 2, 3],
        });
        assert!(guard.admits(3));
        assert!(!guard.admits(4));
    }
}
