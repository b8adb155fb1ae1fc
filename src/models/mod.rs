pub mod api_key;
pub mod delivery;
pub mod event;
pub mod target;
pub mod tenant;

pub use api_key::ApiKey;
pub use delivery::Delivery;
pub use event::Event;
pub use target::Target;
pub use tenant::Tenant;
