//! SSE response body -> [`LLMStream`] adapter.

use eventsource_stream::Eventsource;
use futures_util::StreamExt;
use reqwest::Response;

use crate::protocol::openai::parse_sse_data;
use crate::provider::{LLMError, LLMStream};

/// Parse an OpenAI-compatible SSE body into a stream of deltas.
///
/// `[DONE]` and blank payloads are skipped; malformed JSON and transport failures become
/// `LLMError::Stream` items. An in-band `{"error": ...}` payload becomes an `LLMError::Api` item.
pub fn llm_stream_from_sse(response: Response) -> LLMStream {
    let stream = response
        .bytes_stream()
        .eventsource()
        .filter_map(|event| async move {
            let event = match event {
                Ok(event) => event,
                Err(e) => return Some(Err(LLMError::Stream(e.to_string()))),
            };
            match parse_sse_data(&event.data) {
                Ok(Some(chunk)) => Some(Ok(chunk)),
                Ok(None) => None,
                Err(LLMError::Json(e)) => Some(Err(LLMError::Stream(e.to_string()))),
                Err(e) => Some(Err(e)),
            }
        });

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn network_tests_disabled() -> bool {
        std::env::var_os("CODEX_SANDBOX_NETWORK_DISABLED").is_some()
    }

    async fn serve(body: &'static str) -> (MockServer, Response) {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/sse"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&mock_server)
            .await;

        let response = reqwest::Client::new()
            .get(format!("{}/sse", mock_server.uri()))
            .send()
            .await
            .expect("response");

        (mock_server, response)
    }

    #[tokio::test]
    async fn skips_done_and_yields_chunks() {
        if network_tests_disabled() {
            return;
        }

        let (_server, response) = serve(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n\n",
            "data: [DONE]\n\n",
        ))
        .await;

        let mut stream = llm_stream_from_sse(response);
        let mut text = String::new();
        while let Some(item) = stream.next().await {
            let chunk = item.expect("chunk");
            text.push_str(chunk.content().unwrap_or_default());
        }

        assert_eq!(text, "Hello");
    }

    #[tokio::test]
    async fn in_band_error_payload_becomes_api_error() {
        if network_tests_disabled() {
            return;
        }

        let (_server, response) = serve(concat!(
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n",
            "data: {\"error\":{\"message\":\"Rate limit exceeded\",\"code\":429}}\n\n",
        ))
        .await;

        let mut stream = llm_stream_from_sse(response);
        assert!(stream.next().await.expect("first item").is_ok());
        match stream.next().await {
            Some(Err(LLMError::Api(message))) => assert_eq!(message, "Rate limit exceeded"),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_becomes_stream_error() {
        if network_tests_disabled() {
            return;
        }

        let (_server, response) = serve("data: {not json}\n\n").await;

        let mut stream = llm_stream_from_sse(response);
        match stream.next().await {
            Some(Err(LLMError::Stream(message))) => assert!(!message.is_empty()),
            other => panic!("expected stream error, got {other:?}"),
        }
    }
}
