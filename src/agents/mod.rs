//! Agent orchestration: status classification and spawn plumbing.

mod prompt;
mod spawn;
mod status;

pub use prompt::{render_init_prompt, PromptContext};
pub use spawn::build_invocation;
pub use status::{
    classify, classify_all, classify_screen, parse_status_token, snapshot_tail, ClassifierInput,
    StatusCache, StatusFiles,
};
