//! Remote library collaborators: the track model, the library API and the
//! credential store holding the bearer token.

mod api;
mod credentials;
mod model;
mod vk;

pub use api::*;
pub use credentials::*;
pub use model::*;
pub use vk::VkClient;
