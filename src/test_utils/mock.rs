use std::sync::Arc;
use std::time::Duration;

use mockall::Sequence;

use crate::BlockingQuery;
use crate::HttpRequest;
use crate::HttpResponse;
use crate::MockTransport;
use crate::Result;

pub(crate) fn mock_query(mock: MockTransport) -> BlockingQuery {
    BlockingQuery::new(Arc::new(mock), Duration::from_secs(10))
}

/// Expects exactly one request, after the previous scripted one, whose
/// `index` parameter equals `wait_index` (absent for zero).
pub(crate) fn expect_poll(
    mock: &mut MockTransport,
    seq: &mut Sequence,
    wait_index: u64,
    response: Result<HttpResponse>,
) {
    let mut response = Some(response);
    mock.expect_send()
        .times(1)
        .in_sequence(seq)
        .withf(move |req: &HttpRequest| match wait_index {
            0 => req.param_value("index").is_none(),
            n => req.param_value("index") == Some(n.to_string().as_str()),
        })
        .returning(move |_| {
            response
                .take()
                .unwrap_or_else(|| panic!("poll at index {wait_index} answered twice"))
        });
}
