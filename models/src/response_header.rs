//! Helpers for the structured error fields of [`ResponseHeader`].

use crate::ResponseHeader;

use common::codes::{STATUS_OK, STATUS_SYSTEM_ERROR, to_internal_error};
use common::{Code, Scope};

use std::error::Error as StdError;

/// A header reporting success.
pub fn new_response_header() -> ResponseHeader {
    ResponseHeader {
        code: Code::Ok.into(),
        scope: Scope::General.into(),
        status: String::from(STATUS_OK),
    }
}

/// Writes `error` into `header`, coercing foreign errors to `InternalEscape`.
pub fn set_internal_error(header: &mut ResponseHeader, error: &(dyn StdError + 'static)) {
    let internal = to_internal_error(error);
    let (scope, code) = internal.numeric();
    header.code = code;
    header.scope = scope;
    header.status = String::from(internal.status());
}

/// Writes an rpc-scoped system error into `header`.
pub fn set_rpc_error(header: &mut ResponseHeader, code: Code) {
    header.code = code.into();
    header.scope = Scope::Rpc.into();
    header.status = String::from(STATUS_SYSTEM_ERROR);
}

/// `true` when the header carries no error.
pub fn is_ok(header: &ResponseHeader) -> bool {
    header.code == i32::from(Code::Ok)
}
