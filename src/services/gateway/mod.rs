pub mod cookies;
pub mod decision;
pub mod factory;
pub mod policy;

pub use cookies::SessionCookies;
pub use decision::{Gateway, GatewayDecision, Outcome};
pub use factory::build_gateway;
pub use policy::{Classification, PolicyError, RoutePolicy};
