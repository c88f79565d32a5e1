pub mod busy;
pub mod dispatcher;
pub mod event;
pub mod request;
pub mod router;

pub use busy::{BusyBoard, BusyHandle};
pub use dispatcher::{DispatchOutcome, RequestDispatcher};
pub use event::Completion;
pub use request::{ActionRequest, CapturedRange, RequestId};
pub use router::{route_reply, Applied};
