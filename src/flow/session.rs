//! Draft buffers and the per-conversation session store.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;

use super::FlowError;

/// Brief used when nothing was collected.
pub const EMPTY_BRIEF: &str = "(пусто)";

/// Where a conversation is in the draft cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftState {
    /// Accumulating brief fragments.
    #[default]
    Collecting,
    /// A generated post awaits approve / regenerate / cancel.
    Reviewing,
}

/// One piece of collected input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Message text or caption.
    Text(String),
    /// Human-readable descriptor of a file (never the file itself).
    Attachment(String),
}

/// Generated result waiting for the operator's decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPost {
    pub task_id: i64,
    pub title: String,
    pub body: String,
}

/// Collected brief plus the pending generation result.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Draft {
    pub texts: Vec<String>,
    pub attachments: Vec<String>,
    pub pending: Option<PendingPost>,
}

impl Draft {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.attachments.is_empty()
    }

    /// The brief sent to the generative service.
    #[must_use]
    pub fn brief(&self) -> String {
        compose_brief(&self.texts, &self.attachments)
    }
}

/// Joins collected texts and attachment descriptors into one brief.
#[must_use]
pub fn compose_brief(texts: &[String], attachments: &[String]) -> String {
    let mut parts = Vec::with_capacity(2);
    if !texts.is_empty() {
        parts.push(format!("Текстовые сообщения:\n{}", texts.join("\n\n")));
    }
    if !attachments.is_empty() {
        parts.push(format!("Вложения:\n- {}", attachments.join("\n- ")));
    }

    let brief = parts.join("\n\n");
    let brief = brief.trim();
    if brief.is_empty() {
        EMPTY_BRIEF.to_owned()
    } else {
        brief.to_owned()
    }
}

/// State of one conversation.
///
/// Transitions:
/// - content / clear: only while `Collecting`
/// - `begin_review`: `Collecting` → `Reviewing`
/// - `replace_pending`: stays in `Reviewing`
/// - `finish_review`: `Reviewing` → `Collecting`, buffer emptied
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub state: DraftState,
    pub draft: Draft,
}

impl Session {
    /// Appends fragments in arrival order.
    pub fn push(&mut self, fragments: impl IntoIterator<Item = Fragment>) -> Result<(), FlowError> {
        if self.state == DraftState::Reviewing {
            return Err(FlowError::UnderReview);
        }
        for fragment in fragments {
            match fragment {
                Fragment::Text(text) => self.draft.texts.push(text),
                Fragment::Attachment(label) => self.draft.attachments.push(label),
            }
        }
        Ok(())
    }

    /// Empties the buffer without leaving `Collecting`.
    pub fn clear(&mut self) -> Result<(), FlowError> {
        if self.state == DraftState::Reviewing {
            return Err(FlowError::UnderReview);
        }
        self.draft = Draft::default();
        Ok(())
    }

    /// Records a generated post and moves to `Reviewing`.
    pub fn begin_review(&mut self, post: PendingPost) -> Result<(), FlowError> {
        if self.state == DraftState::Reviewing {
            return Err(FlowError::UnderReview);
        }
        self.draft.pending = Some(post);
        self.state = DraftState::Reviewing;
        Ok(())
    }

    /// The post under review.
    pub fn pending(&self) -> Result<&PendingPost, FlowError> {
        match (self.state, &self.draft.pending) {
            (DraftState::Reviewing, Some(post)) => Ok(post),
            _ => Err(FlowError::NotReviewing),
        }
    }

    /// Swaps in a regenerated title and body, keeping the buffer.
    pub fn replace_pending(&mut self, title: String, body: String) -> Result<(), FlowError> {
        if self.state != DraftState::Reviewing {
            return Err(FlowError::NotReviewing);
        }
        let post = self.draft.pending.as_mut().ok_or(FlowError::NotReviewing)?;
        post.title = title;
        post.body = body;
        Ok(())
    }

    /// Leaves `Reviewing` with an empty buffer, returning what was pending.
    ///
    /// Used for both approve and cancel.
    pub fn finish_review(&mut self) -> Result<PendingPost, FlowError> {
        let post = self.pending()?.clone();
        self.reset();
        Ok(post)
    }

    /// Back to an empty `Collecting` session.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Session state of every conversation, keyed by chat id.
///
/// A missing entry reads as a fresh `Collecting` session.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<i64, Session>>,
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a conversation's session.
    pub async fn get(&self, chat_id: i64) -> Session {
        self.sessions
            .read()
            .await
            .get(&chat_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Replaces a conversation's session.
    pub async fn set(&self, chat_id: i64, session: Session) {
        debug!(
            "Session {} -> {:?} (texts={}, attachments={})",
            chat_id,
            session.state,
            session.draft.texts.len(),
            session.draft.attachments.len()
        );
        self.sessions.write().await.insert(chat_id, session);
    }

    /// Forgets a conversation's session.
    pub async fn clear(&self, chat_id: i64) {
        self.sessions.write().await.remove(&chat_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn post(task_id: i64) -> PendingPost {
        PendingPost {
            task_id,
            title: "Бот".to_owned(),
            body: "Пост".to_owned(),
        }
    }

    #[test]
    fn test_fragments_accumulate_in_order() {
        let mut session = Session::default();
        session
            .push([Fragment::Text("один".to_owned()), Fragment::Attachment("Фото".to_owned())])
            .unwrap();
        session
            .push([
                Fragment::Text("два".to_owned()),
                Fragment::Attachment("Документ: tz.pdf".to_owned()),
            ])
            .unwrap();

        assert_eq!(session.draft.texts, ["один", "два"]);
        assert_eq!(session.draft.attachments, ["Фото", "Документ: tz.pdf"]);
        assert_eq!(session.state, DraftState::Collecting);
    }

    #[test]
    fn test_buffer_frozen_while_reviewing() {
        let mut session = Session::default();
        session.push([Fragment::Text("бриф".to_owned())]).unwrap();
        session.begin_review(post(1)).unwrap();
        let before = session.draft.clone();

        assert_eq!(
            session.push([Fragment::Text("ещё".to_owned())]),
            Err(FlowError::UnderReview)
        );
        assert_eq!(session.clear(), Err(FlowError::UnderReview));
        assert_eq!(session.begin_review(post(2)), Err(FlowError::UnderReview));
        assert_eq!(session.draft, before);
    }

    #[test]
    fn test_regenerate_keeps_buffer() {
        let mut session = Session::default();
        session.push([Fragment::Text("бриф".to_owned())]).unwrap();
        session.begin_review(post(7)).unwrap();

        session
            .replace_pending("Новый".to_owned(), "Текст".to_owned())
            .unwrap();

        assert_eq!(session.state, DraftState::Reviewing);
        assert_eq!(session.draft.texts, ["бриф"]);
        let pending = session.pending().unwrap();
        assert_eq!(pending.task_id, 7);
        assert_eq!(pending.title, "Новый");
    }

    #[test]
    fn test_finish_review_clears_everything() {
        for texts in [vec![], vec!["a".to_owned(), "b".to_owned()]] {
            let mut session = Session::default();
            session.push(texts.into_iter().map(Fragment::Text)).unwrap();
            session.begin_review(post(3)).unwrap();

            let finished = session.finish_review().unwrap();
            assert_eq!(finished.task_id, 3);
            assert_eq!(session, Session::default());
        }
    }

    #[test]
    fn test_review_actions_need_review_state() {
        let mut session = Session::default();
        assert_eq!(session.pending(), Err(FlowError::NotReviewing));
        assert_eq!(session.finish_review(), Err(FlowError::NotReviewing));
        assert_eq!(
            session.replace_pending(String::new(), String::new()),
            Err(FlowError::NotReviewing)
        );
    }

    #[test]
    fn test_clear_keeps_collecting() {
        let mut session = Session::default();
        session.push([Fragment::Text("x".to_owned())]).unwrap();
        session.clear().unwrap();
        assert!(session.draft.is_empty());
        assert_eq!(session.state, DraftState::Collecting);
    }

    #[test]
    fn test_compose_brief() {
        let texts = vec!["Нужен бот".to_owned(), "Срок месяц".to_owned()];
        let files = vec!["Фото".to_owned(), "Голосовое".to_owned()];

        assert_eq!(
            compose_brief(&texts, &files),
            "Текстовые сообщения:\nНужен бот\n\nСрок месяц\n\nВложения:\n- Фото\n- Голосовое"
        );
        assert_eq!(compose_brief(&[], &files), "Вложения:\n- Фото\n- Голосовое");
        assert_eq!(compose_brief(&[], &[]), EMPTY_BRIEF);
        assert_eq!(Draft::default().brief(), "(пусто)");
    }

    #[tokio::test]
    async fn test_store_get_set_clear() {
        let store = SessionStore::new();
        assert_eq!(store.get(1).await, Session::default());

        let mut session = store.get(1).await;
        session.push([Fragment::Text("x".to_owned())]).unwrap();
        store.set(1, session.clone()).await;

        assert_eq!(store.get(1).await, session);
        assert_eq!(store.get(2).await, Session::default());

        store.clear(1).await;
        assert_eq!(store.get(1).await, Session::default());
    }
}
