//! Error types for the conversational core.

use jobscout_core::error::JobscoutError;

/// Errors from the chat engine.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("no active search session")]
    NoActiveSearch,
    #[error("vacancy not found: {0}")]
    VacancyNotFound(String),
    /// The listings API failed; there is no secondary vacancy source,
    /// so this surfaces to the user as a generic failure.
    #[error("search failed: {0}")]
    SearchFailed(String),
    #[error(transparent)]
    Core(#[from] JobscoutError),
}

impl ChatError {
    /// Generic localized message safe to show the end user.
    ///
    /// Internal error text never reaches the delivery surface.
    pub fn user_message(&self) -> &'static str {
        match self {
            ChatError::EmptyMessage => "Напишите, какую вакансию вы ищете.",
            ChatError::NoActiveSearch => {
                "Сессия поиска не найдена. Выполните новый поиск."
            }
            ChatError::VacancyNotFound(_) => {
                "Не удалось получить информацию о вакансии."
            }
            ChatError::SearchFailed(_) => {
                "Произошла ошибка при поиске вакансий. Попробуйте позже."
            }
            ChatError::Core(_) => "Что-то пошло не так. Попробуйте ещё раз.",
        }
    }
}
