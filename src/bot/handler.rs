//! Update handler implementation.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use super::access::AccessGuard;
use super::command::{BotCommand, CallbackAction};
use super::content::fragments;
use super::{HandlerError, keyboards, texts};
use crate::config::MESSAGE_CHUNK_LIMIT;
use crate::document::ProposalBuilder;
use crate::flow::{DraftState, Partners, PendingPost, Session, SessionStore, StatusEffect, transition};
use crate::llm::{LlmClient, generate_post};
use crate::reminders::ReminderHandle;
use crate::storage::{Database, NewTask, NewUser, ProjectStatus, Task, wrap_position};
use crate::telegram::{
    CallbackQuery, InlineKeyboardMarkup, Message, MessageRef, Messenger, ReplyMarkup, TelegramError,
    TextFormat, Update, User, escape_markdown_v2, split_message,
};

/// Where a project card is shown.
#[derive(Debug, Clone, Copy)]
enum Place {
    /// As a new message in a chat.
    New(i64),
    /// In place of an existing message.
    Replace(MessageRef),
}

/// Routes updates to the draft flow and project browsing.
pub struct UpdateHandler {
    messenger: Arc<dyn Messenger>,
    llm: Arc<dyn LlmClient>,
    db: Arc<Database>,
    sessions: SessionStore,
    reminders: ReminderHandle,
    partners: Partners,
    guard: AccessGuard,
    proposals: Option<ProposalBuilder>,
}

impl UpdateHandler {
    /// Creates a handler without proposal generation.
    #[must_use]
    pub fn new(
        messenger: Arc<dyn Messenger>,
        llm: Arc<dyn LlmClient>,
        db: Arc<Database>,
        reminders: ReminderHandle,
        partners: Partners,
    ) -> Self {
        Self {
            messenger,
            llm,
            db,
            sessions: SessionStore::new(),
            reminders,
            guard: AccessGuard::new(&partners),
            partners,
            proposals: None,
        }
    }

    /// Builds and distributes a commercial proposal on every approval.
    #[must_use]
    pub fn with_proposals(mut self, builder: ProposalBuilder) -> Self {
        self.proposals = Some(builder);
        self
    }

    /// Handles one update to completion. Failures are logged, never raised.
    pub async fn handle(&self, update: Update) {
        if let Some(query) = update.callback_query {
            let user_id = query.from.id;
            if let Err(e) = self.on_callback(&query).await {
                error!("Callback {:?} from user_id={} failed: {}", query.data, user_id, e);
            }
        } else if let Some(message) = update.message {
            let chat_id = message.chat.id;
            if let Err(e) = self.on_message(&message).await {
                error!("Message in chat {} failed: {}", chat_id, e);
            }
        }
    }

    async fn on_message(&self, message: &Message) -> Result<(), HandlerError> {
        let Some(user) = &message.from else {
            debug!("Ignoring message without sender in chat {}", message.chat.id);
            return Ok(());
        };
        let chat_id = message.chat.id;

        if !self.guard.admits(user.id) {
            self.messenger
                .send_text(chat_id, texts::DENIED, TextFormat::Plain, None)
                .await?;
            return Ok(());
        }

        if let Some(command) = message.text.as_deref().and_then(BotCommand::parse) {
            info!("Command {} by user_id={}", command, user.id);
            return self.on_command(command, chat_id, user).await;
        }

        if message.has_content() {
            self.on_content(message, chat_id).await?;
        }
        Ok(())
    }

    async fn on_command(&self, command: BotCommand, chat_id: i64, user: &User) -> Result<(), HandlerError> {
        match command {
            BotCommand::Start => {
                let new_user = NewUser {
                    id: user.id,
                    username: user.username.clone(),
                    full_name: Some(user.full_name()),
                };
                let created = Database::call(&self.db, move |db| db.register_user(&new_user)).await?;
                if !created {
                    debug!("User already exists id={}", user.id);
                }
                self.sessions.set(chat_id, Session::default()).await;
                self.messenger
                    .send_text(
                        chat_id,
                        texts::WELCOME,
                        TextFormat::Plain,
                        Some(keyboards::projects_reply_keyboard().into()),
                    )
                    .await?;
            }
            BotCommand::New => {
                self.sessions.set(chat_id, Session::default()).await;
                self.messenger
                    .send_text(
                        chat_id,
                        texts::NEW_DRAFT,
                        TextFormat::Plain,
                        Some(keyboards::draft_actions().into()),
                    )
                    .await?;
            }
            BotCommand::Projects => self.show_project(Place::New(chat_id), 0).await?,
            BotCommand::Help => {
                self.messenger
                    .send_text(chat_id, texts::HELP, TextFormat::Plain, None)
                    .await?;
            }
        }
        Ok(())
    }

    async fn on_content(&self, message: &Message, chat_id: i64) -> Result<(), TelegramError> {
        let mut session = self.sessions.get(chat_id).await;

        if let Err(e) = session.push(fragments(message)) {
            debug!("Content in chat {} rejected: {}", chat_id, e);
            self.messenger
                .send_text(
                    chat_id,
                    texts::UNDER_REVIEW,
                    TextFormat::Plain,
                    Some(keyboards::review_actions().into()),
                )
                .await?;
            return Ok(());
        }

        debug!(
            "Draft updated in chat {}: texts={}, attachments={}",
            chat_id,
            session.draft.texts.len(),
            session.draft.attachments.len()
        );
        self.sessions.set(chat_id, session).await;
        self.messenger
            .send_text(
                chat_id,
                texts::ADDED,
                TextFormat::Plain,
                Some(keyboards::draft_actions().into()),
            )
            .await?;
        Ok(())
    }

    async fn on_callback(&self, query: &CallbackQuery) -> Result<(), HandlerError> {
        let user_id = query.from.id;
        if !self.guard.admits(user_id) {
            self.answer(query, Some(texts::DENIED), true).await;
            return Ok(());
        }

        let Some(action) = query.data.as_deref().and_then(CallbackAction::parse) else {
            warn!("Unknown callback data {:?} from user_id={}", query.data, user_id);
            self.answer(query, Some("Неизвестное действие"), false).await;
            return Ok(());
        };
        let Some(target) = query.message.as_ref().map(|m| MessageRef {
            chat_id: m.chat.id,
            message_id: m.message_id,
        }) else {
            self.answer(query, Some("Сообщение устарело"), false).await;
            return Ok(());
        };

        debug!("Callback {} from user_id={}", action, user_id);
        match action {
            CallbackAction::SendProject => self.on_submit(query, target).await,
            CallbackAction::ClearDraft => self.on_clear(query, target).await,
            CallbackAction::ApprovePost => self.on_approve(query, target).await,
            CallbackAction::RegeneratePost => self.on_regenerate(query, target).await,
            CallbackAction::CancelReview => self.on_cancel(query, target).await,
            CallbackAction::Previous(index) => self.on_navigate(query, target, index.saturating_sub(1)).await,
            CallbackAction::Next(index) => self.on_navigate(query, target, index.saturating_add(1)).await,
            CallbackAction::Back(index) => self.on_navigate(query, target, index).await,
            CallbackAction::Noop => {
                self.answer(query, None, false).await;
                Ok(())
            }
            CallbackAction::StatusMenu { task_id, index } => {
                self.edit_markup(target, keyboards::status_choice(task_id, index))
                    .await?;
                self.answer(query, Some("Выберите новый статус"), false).await;
                Ok(())
            }
            CallbackAction::SetStatus {
                task_id,
                index,
                key,
            } => self.on_set_status(query, target, task_id, index, &key).await,
            CallbackAction::Open(task_id) => self.on_open(query, target.chat_id, task_id).await,
        }
    }

    async fn on_submit(&self, query: &CallbackQuery, target: MessageRef) -> Result<(), HandlerError> {
        let actor = query.from.id;
        let chat_id = target.chat_id;
        let mut session = self.sessions.get(chat_id).await;
        if session.state == DraftState::Reviewing {
            self.answer(query, Some(texts::UNDER_REVIEW), true).await;
            return Ok(());
        }
        self.answer(query, None, false).await;

        let brief = session.draft.brief();
        info!("Generation requested by {} brief_len={}", actor, brief.len());
        self.edit(target, texts::GENERATING, TextFormat::Plain, None)
            .await?;

        let post = match generate_post(self.llm.as_ref(), &brief).await {
            Ok(post) => post,
            Err(e) => {
                warn!("Generation failed for {}: {}", actor, e);
                let text = texts::generation_failed(&e);
                self.edit(target, &text, TextFormat::Plain, Some(keyboards::draft_actions()))
                    .await?;
                return Ok(());
            }
        };

        let new_task = NewTask {
            title: post.title.clone(),
            creator_id: Some(actor),
            brief: Some(brief),
        };
        let created = Database::call(&self.db, move |db| db.create_task(&new_task)).await;
        let task = match created {
            Ok(task) => task,
            Err(e) => {
                let text = format!("Не удалось сохранить проект: {e}");
                self.edit(target, &text, TextFormat::Plain, Some(keyboards::draft_actions()))
                    .await?;
                return Err(e.into());
            }
        };
        info!(
            "Project {} saved title='{}' status='{}' by {}",
            task.id, task.title, task.status, actor
        );
        self.reminders.arm(task.id).await;

        session.begin_review(PendingPost {
            task_id: task.id,
            title: post.title.clone(),
            body: post.body.clone(),
        })?;
        self.sessions.set(chat_id, session).await;

        self.edit(
            target,
            &texts::preview(&post.title, &post.body),
            TextFormat::MarkdownV2,
            Some(keyboards::review_actions()),
        )
        .await?;
        Ok(())
    }

    async fn on_regenerate(&self, query: &CallbackQuery, target: MessageRef) -> Result<(), HandlerError> {
        let actor = query.from.id;
        let chat_id = target.chat_id;
        let mut session = self.sessions.get(chat_id).await;
        let Ok(task_id) = session.pending().map(|p| p.task_id) else {
            self.answer(query, Some(texts::NOT_REVIEWING), true).await;
            return Ok(());
        };
        self.answer(query, None, false).await;

        let brief = session.draft.brief();
        info!("Regeneration requested by {} for task {}", actor, task_id);
        self.edit(target, texts::REGENERATING, TextFormat::Plain, None)
            .await?;

        let post = match generate_post(self.llm.as_ref(), &brief).await {
            Ok(post) => post,
            Err(e) => {
                warn!("Regeneration failed for task {}: {}", task_id, e);
                let text = texts::generation_failed(&e);
                self.edit(target, &text, TextFormat::Plain, Some(keyboards::review_actions()))
                    .await?;
                return Ok(());
            }
        };

        let title = post.title.clone();
        if let Err(e) = Database::call(&self.db, move |db| db.update_title(task_id, &title, None)).await {
            let text = format!("Не удалось сохранить название: {e}");
            self.edit(target, &text, TextFormat::Plain, Some(keyboards::review_actions()))
                .await?;
            return Err(e.into());
        }
        debug!("Task {} retitled to '{}'", task_id, post.title);

        session.replace_pending(post.title.clone(), post.body.clone())?;
        self.sessions.set(chat_id, session).await;

        self.edit(
            target,
            &texts::regenerated(&post.title, &post.body),
            TextFormat::MarkdownV2,
            Some(keyboards::review_actions()),
        )
        .await?;
        Ok(())
    }

    async fn on_approve(&self, query: &CallbackQuery, target: MessageRef) -> Result<(), HandlerError> {
        let actor = &query.from;
        let chat_id = target.chat_id;
        let mut session = self.sessions.get(chat_id).await;
        let brief = session.draft.brief();
        let Ok(post) = session.finish_review() else {
            self.answer(query, Some(texts::NOT_REVIEWING), true).await;
            return Ok(());
        };

        let (task_id, title, stamped) = (post.task_id, post.title.clone(), brief.clone());
        let task = Database::call(&self.db, move |db| {
            db.update_title(task_id, &title, Some(stamped.as_str()))
        })
        .await?;
        self.sessions.set(chat_id, session).await;
        self.answer(query, Some("Одобрено"), false).await;
        info!("Post approved by {} task={} title='{}'", actor.id, task.id, task.title);

        if let Err(e) = self
            .edit(
                target,
                &texts::approved(&post.title, &post.body),
                TextFormat::MarkdownV2,
                None,
            )
            .await
        {
            warn!("Failed to show approval in chat {}: {}", chat_id, e);
        }

        self.fan_out(actor, &task, &brief, &post.body).await;

        if let Some(builder) = &self.proposals {
            self.deliver_proposal(builder, chat_id, actor.id, &task, &brief)
                .await;
        }
        Ok(())
    }

    async fn on_cancel(&self, query: &CallbackQuery, target: MessageRef) -> Result<(), HandlerError> {
        let chat_id = target.chat_id;
        let mut session = self.sessions.get(chat_id).await;
        let Ok(post) = session.finish_review() else {
            self.answer(query, Some(texts::NOT_REVIEWING), true).await;
            return Ok(());
        };

        // The review stays open and the reminder armed until the status is stored.
        let task_id = post.task_id;
        let task = Database::call(&self.db, move |db| {
            db.update_status(task_id, ProjectStatus::Cancelled)
        })
        .await?;
        self.reminders.cancel(task.id).await;
        self.sessions.set(chat_id, session).await;
        self.answer(query, None, false).await;
        info!("Review cancelled by {}, task {} is '{}'", query.from.id, task.id, task.status);

        self.edit(target, texts::CANCELLED, TextFormat::Plain, None)
            .await?;
        Ok(())
    }

    async fn on_clear(&self, query: &CallbackQuery, target: MessageRef) -> Result<(), HandlerError> {
        let chat_id = target.chat_id;
        let mut session = self.sessions.get(chat_id).await;
        if session.clear().is_err() {
            self.answer(query, Some(texts::UNDER_REVIEW), true).await;
            return Ok(());
        }
        self.sessions.set(chat_id, session).await;
        self.answer(query, Some("Черновик очищен"), false).await;
        debug!("Draft cleared by {}", query.from.id);

        self.edit(target, texts::CLEARED, TextFormat::Plain, Some(keyboards::draft_actions()))
            .await?;
        Ok(())
    }

    async fn on_navigate(&self, query: &CallbackQuery, target: MessageRef, index: i64) -> Result<(), HandlerError> {
        self.answer(query, None, false).await;
        self.show_project(Place::Replace(target), index).await
    }

    async fn on_open(&self, query: &CallbackQuery, chat_id: i64, task_id: i64) -> Result<(), HandlerError> {
        let Some(position) = Database::call(&self.db, move |db| db.task_position(task_id)).await? else {
            self.answer(query, Some("Проект не найден"), true).await;
            return Ok(());
        };
        self.answer(query, None, false).await;
        let index = i64::try_from(position).unwrap_or_default();
        self.show_project(Place::New(chat_id), index).await
    }

    async fn on_set_status(
        &self,
        query: &CallbackQuery,
        target: MessageRef,
        task_id: i64,
        index: i64,
        key: &str,
    ) -> Result<(), HandlerError> {
        let Some(status) = ProjectStatus::from_key(key) else {
            self.answer(query, Some("Неизвестный статус"), true).await;
            return Ok(());
        };
        let Some(before) = Database::call(&self.db, move |db| db.get_task(task_id)).await? else {
            self.answer(query, Some("Не удалось обновить статус"), true).await;
            return Ok(());
        };

        let task = match Database::call(&self.db, move |db| db.update_status(task_id, status)).await {
            Ok(task) => task,
            Err(e) => {
                self.answer(query, Some("Не удалось обновить статус"), true).await;
                return Err(e.into());
            }
        };
        info!(
            "Task {} status changed '{}' -> '{}' by {}",
            task_id, before.status, task.status, query.from.id
        );
        self.answer(query, Some("Статус обновлён"), false).await;

        for effect in transition(before.status, status) {
            self.apply(effect, &task, query.from.id).await;
        }

        self.show_project(Place::Replace(target), index).await
    }

    async fn apply(&self, effect: StatusEffect, task: &Task, actor: i64) {
        match effect {
            StatusEffect::ArmReminder => self.reminders.arm(task.id).await,
            StatusEffect::CancelReminder => self.reminders.cancel(task.id).await,
            StatusEffect::NotifyPartners { from, to } => {
                debug!("Notifying counterparts of {} about task {}: {} -> {}", actor, task.id, from, to);
                let text = texts::status_changed(task);
                for recipient in self.partners.counterparts(actor) {
                    let markup = keyboards::open_project(task.id).into();
                    if let Err(e) = self
                        .messenger
                        .send_text(recipient, &text, TextFormat::MarkdownV2, Some(markup))
                        .await
                    {
                        warn!("Notify partner {} about task {} failed: {}", recipient, task.id, e);
                    }
                }
            }
        }
    }

    /// Sends the approved project to the actor's counterparts.
    async fn fan_out(&self, actor: &User, task: &Task, brief: &str, body: &str) {
        let text = texts::new_project(&actor.full_name(), &task.title, brief, body);
        for recipient in self.partners.counterparts(actor.id) {
            let markup = keyboards::open_project(task.id).into();
            match self.send_chunked(recipient, &text, Some(markup)).await {
                Ok(()) => info!("Project {} sent to {}", task.id, recipient),
                Err(e) => warn!("Sending project {} to {} failed: {}", task.id, recipient, e),
            }
        }
    }

    async fn deliver_proposal(
        &self,
        builder: &ProposalBuilder,
        chat_id: i64,
        actor: i64,
        task: &Task,
        brief: &str,
    ) {
        if let Err(e) = self
            .messenger
            .send_text(chat_id, texts::PREPARING_PROPOSAL, TextFormat::Plain, None)
            .await
        {
            warn!("Failed to announce proposal in chat {}: {}", chat_id, e);
        }

        let artifact = match builder.build(brief, &task.title).await {
            Ok(artifact) => artifact,
            Err(e) => {
                warn!("Proposal for task {} failed: {}", task.id, e);
                let text = format!("Не удалось подготовить КП: {e}");
                if let Err(e) = self
                    .messenger
                    .send_text(chat_id, &text, TextFormat::Plain, None)
                    .await
                {
                    warn!("Failed to report proposal error in chat {}: {}", chat_id, e);
                }
                return;
            }
        };

        let caption = format!("КП: {}", task.title);
        let mut recipients = vec![chat_id];
        recipients.extend(
            self.partners
                .counterparts(actor)
                .into_iter()
                .filter(|id| *id != chat_id),
        );
        for recipient in recipients {
            match self
                .messenger
                .send_document(recipient, &artifact.path, Some(caption.as_str()))
                .await
            {
                Ok(()) => info!("Proposal for task {} sent to {}", task.id, recipient),
                Err(e) => warn!("Sending proposal for task {} to {} failed: {}", task.id, recipient, e),
            }
        }

        artifact.cleanup().await;
    }

    async fn show_project(&self, place: Place, index: i64) -> Result<(), HandlerError> {
        let total = Database::call(&self.db, Database::count_tasks).await?;
        let Some(position) = wrap_position(index, total) else {
            let text = escape_markdown_v2(texts::EMPTY_LIST);
            match place {
                Place::New(chat_id) => {
                    self.messenger
                        .send_text(
                            chat_id,
                            &text,
                            TextFormat::MarkdownV2,
                            Some(keyboards::projects_reply_keyboard().into()),
                        )
                        .await?;
                }
                Place::Replace(target) => {
                    self.edit(target, &text, TextFormat::MarkdownV2, None).await?;
                }
            }
            return Ok(());
        };

        let (text, markup) = match Database::call(&self.db, move |db| db.nth_recent_task(position)).await? {
            Some(task) => (
                texts::project_card(&task, position, total),
                Some(keyboards::project_nav(task.id, position, total)),
            ),
            None => (escape_markdown_v2(texts::LOAD_FAILED), None),
        };

        match place {
            Place::New(chat_id) => {
                self.messenger
                    .send_text(chat_id, &text, TextFormat::MarkdownV2, markup.map(ReplyMarkup::from))
                    .await?;
            }
            Place::Replace(target) => {
                self.edit(target, &text, TextFormat::MarkdownV2, markup).await?;
            }
        }
        Ok(())
    }

    /// Splits long text; only the first chunk carries the markup.
    async fn send_chunked(
        &self,
        chat_id: i64,
        text: &str,
        mut markup: Option<ReplyMarkup>,
    ) -> Result<(), TelegramError> {
        for chunk in split_message(text, MESSAGE_CHUNK_LIMIT) {
            self.messenger
                .send_text(chat_id, &chunk, TextFormat::Plain, markup.take())
                .await?;
        }
        Ok(())
    }

    /// Edits a message, treating "not modified" as success.
    async fn edit(
        &self,
        target: MessageRef,
        text: &str,
        format: TextFormat,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<(), TelegramError> {
        match self.messenger.edit_text(target, text, format, markup).await {
            Err(e) if e.is_not_modified() => Ok(()),
            other => other,
        }
    }

    async fn edit_markup(&self, target: MessageRef, markup: InlineKeyboardMarkup) -> Result<(), TelegramError> {
        match self.messenger.edit_markup(target, markup).await {
            Err(e) if e.is_not_modified() => Ok(()),
            other => other,
        }
    }

    /// Acknowledges a button press. Failures are only logged.
    async fn answer(&self, query: &CallbackQuery, text: Option<&str>, alert: bool) {
        if let Err(e) = self.messenger.answer_callback(&query.id, text, alert).await {
            debug!("Failed to answer callback {}: {}", query.id, e);
        }
    }
}
