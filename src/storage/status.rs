//! Project status labels.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle status of a project, persisted by its Russian label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    New,
    DraftingProposal,
    SourcingDevelopers,
    SelectingDevelopers,
    SendingSpecToClient,
    CreatingGroup,
    InDevelopment,
    Done,
    Cancelled,
}

impl ProjectStatus {
    /// All statuses in menu order.
    pub const ALL: [Self; 9] = [
        Self::New,
        Self::DraftingProposal,
        Self::SourcingDevelopers,
        Self::SelectingDevelopers,
        Self::SendingSpecToClient,
        Self::CreatingGroup,
        Self::InDevelopment,
        Self::Done,
        Self::Cancelled,
    ];

    /// Status every project starts in.
    pub const INITIAL: Self = Self::New;

    /// Label shown to operators and stored in the database.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::New => "новый",
            Self::DraftingProposal => "составляется тз/кп",
            Self::SourcingDevelopers => "ищем разработчиков",
            Self::SelectingDevelopers => "выбираем разработчиков",
            Self::SendingSpecToClient => "высылаем тз заказчику",
            Self::CreatingGroup => "создаём группу",
            Self::InDevelopment => "в разработке",
            Self::Done => "готово",
            Self::Cancelled => "отменён",
        }
    }

    /// Short ASCII key used inside callback payloads.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::New => "new",
            Self::DraftingProposal => "drafting_tz_kp",
            Self::SourcingDevelopers => "sourcing_devs",
            Self::SelectingDevelopers => "selecting_devs",
            Self::SendingSpecToClient => "send_tz_to_client",
            Self::CreatingGroup => "create_group",
            Self::InDevelopment => "in_dev",
            Self::Done => "done",
            Self::Cancelled => "cancelled",
        }
    }

    /// Looks a status up by its stored label.
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        let label = label.trim();
        Self::ALL.into_iter().find(|s| s.label() == label)
    }

    /// Looks a status up by its callback key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.key() == key)
    }
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
