use reqwest::{Response, StatusCode};

use crate::error::{Error, Result};

/// Status-code admission: a membership test over `constraint`.
///
/// An empty constraint admits every status, so only transport failures
/// can reject the response.
pub fn is_admitted(constraint: &[u16], status: StatusCode) -> bool {
    constraint.is_empty() || constraint.contains(&status.as_u16())
}

/// Pass the response through if its status is admitted, otherwise drop it and
/// return the rejection carrying the observed status.
pub(crate) fn admit(constraint: &[u16], response: Response) -> Result<Response> {
    let status = response.status();
    if is_admitted(constraint, status) {
        Ok(response)
    } else {
        Err(Error::Status(status))
    }
}
