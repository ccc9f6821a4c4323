//! Client-side mirror of other members' typing/thinking signals and the
//! suppression state of the user's own typing signal.

pub mod mirror;
pub mod self_typing;
