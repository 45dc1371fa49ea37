//! Brief Bot Library
//!
//! A Telegram bot that turns client briefs into project posts and
//! commercial proposals.
//!
//! This crate provides the core functionality for:
//! - Collecting brief fragments per conversation and driving review
//! - Generating posts and proposals through an OpenAI-compatible API
//! - Persisting projects and operators in SQLite
//! - Reminding partners about projects stuck in the initial status
//! - Rendering proposals as `.docx` documents

pub mod bot;
pub mod config;
pub mod document;
pub mod flow;
pub mod llm;
pub mod reminders;
pub mod storage;
pub mod telegram;

#[cfg(test)]
pub(crate) mod testing {
    //! Recording fakes for the network seams.

    use std::collections::{HashSet, VecDeque};
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicI64, Ordering};

    use async_trait::async_trait;

    use crate::llm::{LlmClient, LlmError};
    use crate::telegram::{
        InlineKeyboardMarkup, MessageRef, Messenger, ReplyMarkup, TelegramError, TextFormat,
    };

    /// Answers with a fixed script and records the user messages it got.
    pub struct ScriptedLlm {
        answers: Mutex<VecDeque<Result<String, LlmError>>>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedLlm {
        pub fn new(answers: Vec<Result<String, LlmError>>) -> Self {
            Self {
                answers: Mutex::new(answers.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn prompts(&self) -> Vec<String> {
            self.prompts.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedLlm {
        async fn complete(&self, _system: &str, user: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(user.to_owned());
            self.answers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyResponse))
        }
    }

    /// Everything a [`FakeMessenger`] was asked to do.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Sent {
        Text {
            chat_id: i64,
            text: String,
            format: TextFormat,
            markup: Option<ReplyMarkup>,
        },
        Edit {
            target: MessageRef,
            text: String,
            markup: Option<InlineKeyboardMarkup>,
        },
        Markup {
            target: MessageRef,
            markup: InlineKeyboardMarkup,
        },
        Answer {
            text: Option<String>,
            alert: bool,
        },
        Document {
            chat_id: i64,
            path: PathBuf,
        },
    }

    #[derive(Default)]
    pub struct FakeMessenger {
        log: Mutex<Vec<Sent>>,
        failing: Mutex<HashSet<i64>>,
        next_id: AtomicI64,
    }

    impl FakeMessenger {
        /// Makes every delivery to `chat_id` fail.
        pub fn fail_for(&self, chat_id: i64) {
            self.failing.lock().unwrap().insert(chat_id);
        }

        pub fn log(&self) -> Vec<Sent> {
            self.log.lock().unwrap().clone()
        }

        pub fn texts_to(&self, chat_id: i64) -> Vec<String> {
            self.log()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Text { chat_id: to, text, .. } if to == chat_id => Some(text),
                    _ => None,
                })
                .collect()
        }

        pub fn edits(&self) -> Vec<String> {
            self.log()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Edit { text, .. } => Some(text),
                    _ => None,
                })
                .collect()
        }

        pub fn answers(&self) -> Vec<(Option<String>, bool)> {
            self.log()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Answer { text, alert } => Some((text, alert)),
                    _ => None,
                })
                .collect()
        }

        pub fn documents_to(&self, chat_id: i64) -> Vec<PathBuf> {
            self.log()
                .into_iter()
                .filter_map(|s| match s {
                    Sent::Document { chat_id: to, path } if to == chat_id => Some(path),
                    _ => None,
                })
                .collect()
        }

        pub fn clear(&self) {
            self.log.lock().unwrap().clear();
        }

        fn deliver(&self, chat_id: i64, sent: Sent) -> Result<(), TelegramError> {
            if self.failing.lock().unwrap().contains(&chat_id) {
                return Err(TelegramError::Api {
                    code: 403,
                    description: "Forbidden: bot was blocked by the user".to_owned(),
                });
            }
            self.log.lock().unwrap().push(sent);
            Ok(())
        }
    }

    #[async_trait]
    impl Messenger for FakeMessenger {
        async fn send_text(
            &self,
            chat_id: i64,
            text: &str,
            format: TextFormat,
            markup: Option<ReplyMarkup>,
        ) -> Result<MessageRef, TelegramError> {
            self.deliver(
                chat_id,
                Sent::Text {
                    chat_id,
                    text: text.to_owned(),
                    format,
                    markup,
                },
            )?;
            Ok(MessageRef {
                chat_id,
                message_id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            })
        }

        async fn edit_text(
            &self,
            target: MessageRef,
            text: &str,
            _format: TextFormat,
            markup: Option<InlineKeyboardMarkup>,
        ) -> Result<(), TelegramError> {
            self.deliver(
                target.chat_id,
                Sent::Edit {
                    target,
                    text: text.to_owned(),
                    markup,
                },
            )
        }

        async fn edit_markup(
            &self,
            target: MessageRef,
            markup: InlineKeyboardMarkup,
        ) -> Result<(), TelegramError> {
            self.deliver(target.chat_id, Sent::Markup { target, markup })
        }

        async fn answer_callback(
            &self,
            _callback_id: &str,
            text: Option<&str>,
            alert: bool,
        ) -> Result<(), TelegramError> {
            self.log.lock().unwrap().push(Sent::Answer {
                text: text.map(str::to_owned),
                alert,
            });
            Ok(())
        }

        async fn send_document(
            &self,
            chat_id: i64,
            path: &Path,
            _caption: Option<&str>,
        ) -> Result<(), TelegramError> {
            assert!(path.exists(), "document {} must exist when sent", path.display());
            self.deliver(
                chat_id,
                Sent::Document {
                    chat_id,
                    path: path.to_path_buf(),
                },
            )
        }
    }
}
