pub mod audit;
pub mod driver;
pub mod mission;
pub mod role;
pub mod route;
pub mod session;
pub mod subcontractor;
pub mod user;

pub use audit::*;
pub use driver::*;
pub use mission::*;
pub use role::*;
pub use route::*;
pub use session::*;
pub use subcontractor::*;
pub use user::*;
