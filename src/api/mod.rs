pub mod dispatcher;
pub mod handlers;
pub mod response;
pub mod routes;

pub use routes::{create_router, Route, RouteTable};
