//! Optimizer state I/O
//!
//! Saves and loads [`StateDict`](crate::optim::StateDict)s as JSON or YAML.

mod format;
mod load;
mod save;


pub use format::{SaveConfig, StateFormat};
pub use load::{load_state_dict, state_dict_from_str};
pub use save::{save_state_dict, state_dict_to_string};
