//! Pure domain logic: node connection states and candidate selection.

pub mod node_state;
pub mod selection;

pub use node_state::ConnectionState;
pub use selection::select_secondary;
