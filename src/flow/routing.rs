//! Who hears about what.

use crate::config::AccessConfig;

/// The two fixed partners and the administrator pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partners {
    pub business: i64,
    pub team: i64,
    pub admins: Vec<i64>,
}

impl Partners {
    #[must_use]
    pub fn from_config(access: &AccessConfig) -> Self {
        Self {
            business: access.business_partner_id,
            team: access.team_partner_id,
            admins: access.admin_ids.clone(),
        }
    }

    /// Recipients of a notification caused by `actor`.
    ///
    /// A partner notifies the other partner; anyone else notifies every
    /// administrator except themselves.
    #[must_use]
    pub fn counterparts(&self, actor: i64) -> Vec<i64> {
        if actor == self.business {
            vec![self.team]
        } else if actor == self.team {
            vec![self.business]
        } else {
            self.admins.iter().copied().filter(|id| *id != actor).collect()
        }
    }

    /// Both partners, business first.
    #[must_use]
    pub const fn both(&self) -> [i64; 2] {
        [self.business, self.team]
    }
}
