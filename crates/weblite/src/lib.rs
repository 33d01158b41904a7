mod body;

mod decorator;
mod error;
mod exchange;
mod handler;
mod pattern;
mod query;
mod route;
mod router;

pub mod binder;
pub mod parse;
pub mod render;

pub use body::BodyHandle;
pub use decorator::AfterDecorator;
pub use decorator::AfterFn;
pub use decorator::BeforeDecorator;
pub use decorator::BeforeFn;
pub use decorator::Decorator;
pub use decorator::after_fn;
pub use decorator::before_fn;
pub use decorator::compose;
pub use error::BindingError;
pub use error::BoxError;
pub use error::DefaultErrorHandler;
pub use error::DispatchError;
pub use error::ErrorHandler;
pub use error::PatternError;
pub use exchange::Exchange;
pub use handler::FnHandler;
pub use handler::Handler;
pub use handler::HandlerFn;
pub use handler::HandlerResult;
pub use handler::handler_fn;
pub use pattern::PathPattern;
pub use query::Query;
pub use route::Route;
pub use route::RouteTable;
pub use router::RouteGroup;
pub use router::Router;
