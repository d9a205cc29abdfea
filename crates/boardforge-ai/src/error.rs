/// Errors a bot can report instead of an action.
///
/// Sessions log these and carry on; a failing bot never takes a match down.
#[derive(Debug, thiserror::Error)]
pub enum BotError {
    #[error("game {0} declares no move enumerator")]
    NoEnumerator(String),

    #[error("bot failed: {0}")]
    Failed(String),
}
