pub mod nodes;

pub use nodes::*;

use routeloom::state::VersionedState;

#[allow(dead_code)]
pub fn state_with_user(text: &str) -> VersionedState {
    VersionedState::new_with_user_message(text)
}
