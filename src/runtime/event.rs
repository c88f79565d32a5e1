use super::request::RequestId;
use crate::error::ActionResult;

/// A finished round trip, marshalled from a background unit to the control context.
#[derive(Debug)]
pub struct Completion {
    pub request_id: RequestId,
    pub result: ActionResult,
}
