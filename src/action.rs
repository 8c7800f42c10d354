/// Abstract key surface; `event` maps crossterm keys onto it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Refresh,
    NavigateUp,
    NavigateDown,
    /// Move into the highlighted node's default session.
    AttachDefault,
    Select,
    MessagePm,
    ReviewLoop,
    RequestReview,
    MessageWorktree,
    Cleanup,
    Filter,
    Help,
    ConfirmYes,
    ConfirmNo,
    Cancel,
    MenuDigit(u8),
    InputChar(char),
    InputBackspace,
    InputLeft,
    InputRight,
    None,
}
